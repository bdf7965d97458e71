use super::*;

#[derive(Debug, Default)]
pub(super) struct PersistStats {
    pub(super) units_persisted: usize,
    pub(super) index_records_inserted: usize,
}

pub(super) fn snapshot_paths(
    output_dir: &Path,
    family: DocumentFamily,
    date: &str,
) -> (PathBuf, PathBuf) {
    (
        output_dir.join(format!("{family}_v{date}.json")),
        output_dir.join(format!("{family}_latest.json")),
    )
}

/// Writes a dated and a latest snapshot for every family in the run, empty
/// families included.
pub(super) fn write_snapshots(
    output_dir: &Path,
    run_id: &str,
    date: &str,
    by_family: &BTreeMap<DocumentFamily, Vec<SourcedUnit>>,
) -> Result<Vec<PathBuf>> {
    ensure_directory(output_dir)?;
    let generated_at = now_utc_string();
    let mut written = Vec::with_capacity(by_family.len() * 2);

    for (&family, units) in by_family {
        let snapshot = FamilySnapshot {
            family,
            run_id: run_id.to_string(),
            generated_at: generated_at.clone(),
            unit_count: units.len(),
            units: units.iter().map(|sourced| sourced.unit.clone()).collect(),
        };

        let (dated_path, latest_path) = snapshot_paths(output_dir, family, date);
        write_json_pretty(&dated_path, &snapshot)?;
        write_json_pretty(&latest_path, &snapshot)?;
        info!(
            family = %family,
            units = snapshot.unit_count,
            path = %dated_path.display(),
            "wrote family snapshot"
        );

        written.push(dated_path);
        written.push(latest_path);
    }

    Ok(written)
}

/// Keyless units are never deduplicated, so their ids carry the source
/// filename to stay unique when several sources yield the same family.
pub(super) fn unit_id_for(sourced: &SourcedUnit) -> String {
    let unit = &sourced.unit;
    match unit.natural_key() {
        Some(key) => format!("{}:{}", unit.family(), key),
        None => format!("{}@{}", unit.family(), sourced.source.filename),
    }
}

/// Replaces the stored units and note texts of every family in the run.
pub(super) fn persist_units(
    connection: &mut Connection,
    run_id: &str,
    by_family: &BTreeMap<DocumentFamily, Vec<SourcedUnit>>,
) -> Result<PersistStats> {
    let mut stats = PersistStats::default();
    let tx = connection.transaction()?;

    {
        let mut delete_notes = tx.prepare("DELETE FROM note_texts WHERE family = ?1")?;
        let mut delete_units = tx.prepare("DELETE FROM units WHERE family = ?1")?;
        let mut insert_unit = tx.prepare(
            "
            INSERT INTO units(
              unit_id, family, unit_key, title, source_filename, source_sha256, run_id, payload_json
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )?;
        let mut insert_note = tx.prepare(
            "
            INSERT INTO note_texts(
              record_id, unit_id, family, unit_key, owner_title, note_number, path, order_index, text
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )?;

        for (&family, units) in by_family {
            delete_notes
                .execute([family.as_str()])
                .with_context(|| format!("failed to clear note texts for {family}"))?;
            delete_units
                .execute([family.as_str()])
                .with_context(|| format!("failed to clear units for {family}"))?;

            for sourced in units {
                let unit = &sourced.unit;
                let unit_id = unit_id_for(sourced);
                let payload = serde_json::to_string(unit)
                    .with_context(|| format!("failed to serialize unit {unit_id}"))?;

                insert_unit
                    .execute(params![
                        &unit_id,
                        family.as_str(),
                        unit.natural_key(),
                        unit.title(),
                        &sourced.source.filename,
                        &sourced.source.sha256,
                        run_id,
                        payload,
                    ])
                    .with_context(|| format!("failed to insert unit {unit_id}"))?;
                stats.units_persisted += 1;

                for (order_index, record) in flatten(unit).into_iter().enumerate() {
                    insert_note
                        .execute(params![
                            format!("{unit_id}#{order_index}"),
                            &unit_id,
                            record.family.as_str(),
                            record.unit_key,
                            record.owner_title,
                            record.note_number,
                            record.path,
                            order_index as i64,
                            record.text,
                        ])
                        .with_context(|| format!("failed to insert note text for {unit_id}"))?;
                    stats.index_records_inserted += 1;
                }
            }
        }
    }

    tx.commit()?;
    Ok(stats)
}
