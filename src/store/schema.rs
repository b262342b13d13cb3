use rusqlite::Connection;
use tracing::info;

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id    INTEGER NOT NULL UNIQUE,
            username       TEXT,
            first_name     TEXT,
            last_name      TEXT,
            balance        TEXT NOT NULL DEFAULT '0',
            is_active      INTEGER NOT NULL DEFAULT 1,
            registered_at  TEXT NOT NULL,
            referral_code  TEXT NOT NULL UNIQUE,
            referred_by    INTEGER REFERENCES users(id)
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT NOT NULL,
            description   TEXT NOT NULL DEFAULT '',
            reward        TEXT NOT NULL,
            task_type     TEXT NOT NULL DEFAULT '',
            requirements  TEXT,
            is_active     INTEGER NOT NULL DEFAULT 1,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_tasks (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       INTEGER NOT NULL REFERENCES users(id),
            task_id       INTEGER NOT NULL REFERENCES tasks(id),
            status        TEXT NOT NULL DEFAULT 'pending',
            submitted_at  TEXT NOT NULL,
            completed_at  TEXT,
            reviewed_at   TEXT,
            review_note   TEXT,
            proof         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_user_tasks_user
            ON user_tasks(user_id, status);

        CREATE TABLE IF NOT EXISTS transactions (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL REFERENCES users(id),
            amount       TEXT NOT NULL,
            kind         TEXT NOT NULL,
            status       TEXT NOT NULL DEFAULT 'pending',
            created_at   TEXT NOT NULL,
            reference    TEXT NOT NULL UNIQUE,
            description  TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user
            ON transactions(user_id, created_at);
        ",
    )?;

    info!("ledger schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }

    #[test]
    fn transaction_reference_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (external_id, registered_at, referral_code)
             VALUES (1, '2026-01-01 00:00:00+00:00', 'ABC')",
            [],
        )
        .unwrap();
        let insert = "INSERT INTO transactions (user_id, amount, kind, created_at, reference)
                      VALUES (1, '1', 'credit', '2026-01-01 00:00:00+00:00', 'CRD-1')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
