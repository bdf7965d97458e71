use serde::{Deserialize, Serialize};

use crate::outline::{DocumentFamily, ParsedUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GeneralNote,
    Chapter,
    GeneralRules,
}

impl SourceKind {
    /// Families parsed out of one source document of this kind. A chapter
    /// document may open with the notes of the section it starts.
    pub fn families(self) -> &'static [DocumentFamily] {
        match self {
            SourceKind::GeneralNote => &[DocumentFamily::GeneralNote],
            SourceKind::Chapter => &[
                DocumentFamily::SectionNotes,
                DocumentFamily::ChapterNotes,
                DocumentFamily::AdditionalNotes,
            ],
            SourceKind::GeneralRules => &[DocumentFamily::GeneralRules],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub filename: String,
    pub kind: SourceKind,
    pub key: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub source_count: usize,
    pub sources: Vec<SourceEntry>,
}

/// Dated or latest snapshot of every unit parsed for one family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilySnapshot {
    pub family: DocumentFamily,
    pub run_id: String,
    pub generated_at: String,
    pub unit_count: usize,
    pub units: Vec<ParsedUnit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub inventory_manifest_path: String,
    pub db_path: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub source_count: usize,
    pub processed_source_count: usize,
    pub page_count: usize,
    pub units_parsed: usize,
    pub units_not_applicable: usize,
    pub duplicate_units_dropped: usize,
    pub units_persisted: usize,
    pub index_records_inserted: usize,
    pub units_total: i64,
    pub index_records_total: i64,
    pub unit_failures: usize,
}

/// One unit that could not be parsed; the run skips it and continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailureRecord {
    pub family: DocumentFamily,
    pub key: String,
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tool_versions: ToolVersions,
    pub paths: IngestPaths,
    pub families: Vec<DocumentFamily>,
    pub counts: IngestCounts,
    pub source_hashes: Vec<SourceEntry>,
    pub snapshots: Vec<String>,
    pub failures: Vec<UnitFailureRecord>,
    pub warnings: Vec<String>,
}
