use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS quotes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          year INTEGER NOT NULL,
          number TEXT NOT NULL,
          issue_date TEXT,
          client_name TEXT NOT NULL DEFAULT '',
          project_name TEXT NOT NULL DEFAULT '',
          total REAL NOT NULL DEFAULT 0,
          payload JSON NOT NULL,
          saved_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
          UNIQUE (year, number)
        );

        CREATE INDEX IF NOT EXISTS idx_quotes_year ON quotes(year);
        "#,
    )
}
