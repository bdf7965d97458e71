use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::{ingest, inventory};
use crate::model::{FamilySnapshot, SourceInventoryManifest};
use crate::outline::DocumentFamily;
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let inventory_path = inventory::default_manifest_path(&args.cache_root);
    let output_dir = ingest::default_output_dir(&args.cache_root);
    let db_path = ingest::default_db_path(&args.cache_root);

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: SourceInventoryManifest = read_json(&inventory_path)?;

        info!(
            generated_at = %inventory.generated_at,
            source_count = inventory.source_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    for family in DocumentFamily::ALL {
        let latest_path = output_dir.join(format!("{family}_latest.json"));
        if !latest_path.exists() {
            warn!(family = %family, path = %latest_path.display(), "latest snapshot missing");
            continue;
        }

        let snapshot: FamilySnapshot = read_json(&latest_path)?;
        info!(
            family = %family,
            run_id = %snapshot.run_id,
            generated_at = %snapshot.generated_at,
            units = snapshot.unit_count,
            "loaded latest snapshot"
        );
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let units_count = query_count(&conn, "SELECT COUNT(*) FROM units").unwrap_or(0);
        let note_texts_count = query_count(&conn, "SELECT COUNT(*) FROM note_texts").unwrap_or(0);

        info!(
            path = %db_path.display(),
            units = units_count,
            note_texts = note_texts_count,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
