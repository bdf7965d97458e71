use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rayon::prelude::*;
use rusqlite::{Connection, params};
use tracing::{debug, info, warn};

use crate::cli::IngestArgs;
use crate::commands::inventory;
use crate::model::{
    FamilySnapshot, IngestCounts, IngestPaths, IngestRunManifest, SourceEntry,
    SourceInventoryManifest, ToolVersions, UnitFailureRecord,
};
use crate::outline::{
    DocumentFamily, NaturalKey, OutlineGrammar, ParsedUnit, assemble, deduplicate, flatten,
};
use crate::util::{
    ensure_directory, now_utc_string, read_json, utc_compact_string, utc_date_string,
    write_json_pretty,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";

mod db_setup;
mod extract;
mod persist;
mod pipeline;
mod run;

pub use run::run;
pub(crate) use run::{default_db_path, default_output_dir};

use db_setup::*;
use extract::*;
use persist::*;
use pipeline::*;
