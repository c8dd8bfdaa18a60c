use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL UNIQUE COLLATE NOCASE,
            role            TEXT NOT NULL,
            password_hash   TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            event_type  TEXT NOT NULL,
            date        TEXT NOT NULL,
            theme       TEXT,
            name        TEXT,
            description TEXT,
            start_time  TEXT,
            end_time    TEXT,
            host_house  TEXT NOT NULL,
            pairs       TEXT NOT NULL DEFAULT '[]',
            created_by  TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            UNIQUE(date, event_type)
        );

        CREATE INDEX IF NOT EXISTS idx_events_date
            ON events(date);

        CREATE TABLE IF NOT EXISTS event_requests (
            id              TEXT PRIMARY KEY,
            event_type      TEXT NOT NULL,
            date            TEXT NOT NULL,
            theme           TEXT,
            pairs           TEXT NOT NULL DEFAULT '[]',
            message         TEXT,
            from_role       TEXT NOT NULL,
            from_house      TEXT,
            to_house        TEXT NOT NULL,
            submitted_at    TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'approved', 'declined')),
            sender_id       TEXT NOT NULL REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_event_requests_to_house
            ON event_requests(to_house, submitted_at);

        CREATE TABLE IF NOT EXISTS polls (
            id              TEXT PRIMARY KEY,
            question        TEXT NOT NULL,
            options         TEXT NOT NULL,
            expires_at      TEXT NOT NULL,
            houses_allowed  TEXT NOT NULL,
            created_by      TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL
        );

        -- One vote per device per poll
        CREATE TABLE IF NOT EXISTS poll_votes (
            poll_id     TEXT NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
            device_id   TEXT NOT NULL,
            option      TEXT NOT NULL,
            voted_at    TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (poll_id, device_id)
        );

        CREATE TABLE IF NOT EXISTS groupchats (
            id          TEXT PRIMARY KEY,
            name        TEXT,
            members     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            sender      TEXT NOT NULL REFERENCES users(id),
            group_id    TEXT REFERENCES groupchats(id) ON DELETE CASCADE,
            recipients  TEXT NOT NULL DEFAULT '[]',
            thread_key  TEXT,
            text        TEXT NOT NULL,
            timestamp   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(thread_key, timestamp);

        CREATE INDEX IF NOT EXISTS idx_messages_group
            ON messages(group_id, timestamp);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
