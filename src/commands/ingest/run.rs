use super::*;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let inventory_manifest_path = args
        .inventory_manifest_path
        .clone()
        .unwrap_or_else(|| inventory::default_manifest_path(&cache_root));
    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&cache_root));
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&cache_root));
    let families = selected_families(&args.families);

    info!(
        cache_root = %cache_root.display(),
        run_id = %run_id,
        families = families.len(),
        "starting ingest"
    );

    let inventory = load_or_refresh_inventory(
        &cache_root,
        &inventory_manifest_path,
        args.refresh_inventory,
    )?;

    let tool_versions = collect_tool_versions();
    let mut warnings = Vec::new();
    if tool_versions.pdftotext.is_none() {
        warn!("pdftotext not found; only .txt sources can be extracted");
        warnings.push("pdftotext not found on PATH".to_string());
    }

    let grammar = OutlineGrammar::new()?;
    let outcomes = parse_sources(
        &grammar,
        &inventory::sources_directory(&cache_root),
        &inventory.sources,
        &families,
        args.max_pages_per_doc,
        args.threads,
    )?;
    let collected = collect_outcomes(outcomes, &families);

    let snapshots = write_snapshots(
        &output_dir,
        &run_id,
        &utc_date_string(started_ts),
        &collected.by_family,
    )?;

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let persist_stats = persist_units(&mut connection, &run_id, &collected.by_family)?;
    sync_fts_index(&connection)?;

    let units_total = count_rows(&connection, "SELECT COUNT(*) FROM units")?;
    let index_records_total = count_rows(&connection, "SELECT COUNT(*) FROM note_texts")?;
    let updated_at = now_utc_string();

    let status = if collected.failures.is_empty() {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        started_at,
        updated_at,
        command: render_ingest_command(&args),
        tool_versions,
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            inventory_manifest_path: inventory_manifest_path.display().to_string(),
            db_path: db_path.display().to_string(),
            output_dir: output_dir.display().to_string(),
        },
        families: families.clone(),
        counts: IngestCounts {
            source_count: inventory.source_count,
            processed_source_count: collected.processed_source_count,
            page_count: collected.page_count,
            units_parsed: collected.units_parsed,
            units_not_applicable: collected.units_not_applicable,
            duplicate_units_dropped: collected.duplicate_units_dropped,
            units_persisted: persist_stats.units_persisted,
            index_records_inserted: persist_stats.index_records_inserted,
            units_total,
            index_records_total,
            unit_failures: collected.failures.len(),
        },
        source_hashes: inventory.sources,
        snapshots: snapshots
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
        failures: collected.failures,
        warnings,
    };

    write_json_pretty(&ingest_manifest_path, &manifest)?;

    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");
    info!(
        units = units_total,
        index_records = index_records_total,
        failures = manifest.counts.unit_failures,
        "ingest completed"
    );

    Ok(())
}

pub(crate) fn default_db_path(cache_root: &Path) -> PathBuf {
    cache_root.join("hts_notes.sqlite")
}

pub(crate) fn default_output_dir(cache_root: &Path) -> PathBuf {
    cache_root.join("snapshots")
}

/// Requested families in canonical order without repeats; every family when
/// none was requested.
pub(super) fn selected_families(requested: &[DocumentFamily]) -> Vec<DocumentFamily> {
    DocumentFamily::ALL
        .into_iter()
        .filter(|family| requested.is_empty() || requested.contains(family))
        .collect()
}

fn load_or_refresh_inventory(
    cache_root: &Path,
    inventory_manifest_path: &Path,
    refresh_inventory: bool,
) -> Result<SourceInventoryManifest> {
    if refresh_inventory || !inventory_manifest_path.exists() {
        let manifest = inventory::build_manifest(cache_root)?;
        write_json_pretty(inventory_manifest_path, &manifest)?;
        info!(
            path = %inventory_manifest_path.display(),
            source_count = manifest.source_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let manifest: SourceInventoryManifest = read_json(inventory_manifest_path)?;

    info!(
        path = %inventory_manifest_path.display(),
        source_count = manifest.source_count,
        "loaded existing inventory manifest"
    );

    Ok(manifest)
}

pub(super) fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "htsnotes".to_string(),
        "ingest".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.inventory_manifest_path {
        command.push("--inventory-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.ingest_manifest_path {
        command.push("--ingest-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.output_dir {
        command.push("--output-dir".to_string());
        command.push(path.display().to_string());
    }
    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    for family in &args.families {
        command.push("--family".to_string());
        command.push(family.as_str().replace('_', "-"));
    }
    if let Some(max_pages) = args.max_pages_per_doc {
        command.push("--max-pages-per-doc".to_string());
        command.push(max_pages.to_string());
    }
    if let Some(threads) = args.threads {
        command.push("--threads".to_string());
        command.push(threads.to_string());
    }

    command.join(" ")
}
