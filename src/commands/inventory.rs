use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, info};

use crate::cli::InventoryArgs;
use crate::model::{SourceEntry, SourceInventoryManifest, SourceKind};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.cache_root)?;

    if args.dry_run {
        info!(
            source_count = manifest.source_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| default_manifest_path(&args.cache_root));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(source_count = manifest.source_count, "inventory completed");

    Ok(())
}

pub fn default_manifest_path(cache_root: &Path) -> PathBuf {
    cache_root.join("manifests").join("source_inventory.json")
}

pub fn sources_directory(cache_root: &Path) -> PathBuf {
    cache_root.join("sources")
}

pub fn build_manifest(cache_root: &Path) -> Result<SourceInventoryManifest> {
    let patterns = SourcePatterns::new()?;
    let source_dir = sources_directory(cache_root);

    let mut paths = discover_sources(&source_dir)?;
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let Some((kind, key)) = patterns.classify(&filename) else {
            debug!(filename = %filename, "skipping file with unrecognized name");
            continue;
        };
        let sha256 = sha256_file(&path)?;

        sources.push(SourceEntry {
            filename,
            kind,
            key,
            sha256,
        });
    }

    if sources.is_empty() {
        bail!("no source documents found in {}", source_dir.display());
    }

    sources.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then(numeric_key(a).cmp(&numeric_key(b)))
            .then(a.filename.cmp(&b.filename))
    });

    Ok(SourceInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: source_dir.display().to_string(),
        source_count: sources.len(),
        sources,
    })
}

fn numeric_key(entry: &SourceEntry) -> Option<u32> {
    entry.key.as_deref().and_then(|key| key.parse::<u32>().ok())
}

fn discover_sources(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("failed to read {}", source_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_source = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf") || ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);

        if is_source {
            sources.push(path);
        }
    }

    Ok(sources)
}

struct SourcePatterns {
    general_note: Regex,
    chapter: Regex,
    general_rules: Regex,
}

impl SourcePatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            general_note: Regex::new(r"(?i)^general_note_0*(\d{1,2})\.(?:pdf|txt)$")
                .context("failed to compile general note filename regex")?,
            chapter: Regex::new(r"(?i)^chapter_0*(\d{1,2})\.(?:pdf|txt)$")
                .context("failed to compile chapter filename regex")?,
            general_rules: Regex::new(r"(?i)^general_rules\.(?:pdf|txt)$")
                .context("failed to compile general rules filename regex")?,
        })
    }

    fn classify(&self, filename: &str) -> Option<(SourceKind, Option<String>)> {
        let numbered = |pattern: &Regex| {
            pattern
                .captures(filename)
                .and_then(|captures| captures.get(1))
                .map(|found| found.as_str().to_string())
        };

        if let Some(key) = numbered(&self.general_note) {
            return Some((SourceKind::GeneralNote, Some(key)));
        }
        if let Some(key) = numbered(&self.chapter) {
            return Some((SourceKind::Chapter, Some(key)));
        }
        if self.general_rules.is_match(filename) {
            return Some((SourceKind::GeneralRules, None));
        }
        None
    }
}
