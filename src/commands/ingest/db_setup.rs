use super::*;

pub(super) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS units (
          unit_id TEXT PRIMARY KEY,
          family TEXT NOT NULL,
          unit_key TEXT,
          title TEXT,
          source_filename TEXT NOT NULL,
          source_sha256 TEXT NOT NULL,
          run_id TEXT NOT NULL,
          payload_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS note_texts (
          record_id TEXT PRIMARY KEY,
          unit_id TEXT NOT NULL,
          family TEXT NOT NULL,
          unit_key TEXT,
          owner_title TEXT,
          note_number TEXT NOT NULL,
          path TEXT NOT NULL,
          order_index INTEGER NOT NULL,
          text TEXT NOT NULL,
          FOREIGN KEY(unit_id) REFERENCES units(unit_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_units_family_key ON units(family, unit_key);
        CREATE INDEX IF NOT EXISTS idx_note_texts_unit_order ON note_texts(unit_id, order_index);
        CREATE INDEX IF NOT EXISTS idx_note_texts_family_key ON note_texts(family, unit_key);
        ",
        )
        .context("failed to create core tables")?;

    connection
        .execute(
            "
            CREATE VIRTUAL TABLE IF NOT EXISTS note_texts_fts
            USING fts5(record_id, family, owner_title, path, text, content='note_texts', content_rowid='rowid')
            ",
            [],
        )
        .context("failed to initialize FTS5 table note_texts_fts")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

pub(super) fn sync_fts_index(connection: &Connection) -> Result<()> {
    connection
        .execute("INSERT INTO note_texts_fts(note_texts_fts) VALUES('rebuild')", [])
        .context("failed to rebuild FTS index")?;
    Ok(())
}

pub(super) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows: {sql}"))?;
    Ok(count)
}
