use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};
use tracing::warn;
use uuid::Uuid;

use omn_types::models::{Event, EventRequest, GroupChat, Message, Poll, RequestStatus, User};

use crate::Database;
use crate::models::{
    EventRequestRow, EventRow, GroupChatRow, MessageRow, PollRow, UserRow, format_date,
    format_time, format_timestamp, parse_json, parse_timestamp, parse_uuid, to_json,
};

/// Result of recording a device's vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote from this device.
    Recorded,
    /// The device's vote moved from `from` to the new option.
    Moved { from: String },
    /// The device already voted for this option; nothing changed.
    Unchanged,
}

/// Result of renaming a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// Another user already has the name (ignoring case).
    NameTaken,
    NoSuchUser,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: Uuid, name: &str, role: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, role, password_hash) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), name, role, password_hash],
            )?;
            Ok(())
        })
    }

    /// Case-insensitive lookup by display name.
    pub fn get_user_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, role, password_hash, created_at FROM users WHERE name = ?1",
                [name],
                user_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, role, password_hash, created_at FROM users WHERE id = ?1",
                [id.to_string()],
                user_row,
            )
            .optional()
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, role, password_hash, created_at FROM users ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .filter_map(|row| match row.into_user() {
                    Ok(user) => Some(user),
                    Err(e) => {
                        warn!("Skipping user row: {:#}", e);
                        None
                    }
                })
                .collect())
        })
    }

    /// The name check and the update run under one lock.
    pub fn rename_user(&self, id: Uuid, name: &str) -> Result<RenameOutcome> {
        let id = id.to_string();
        self.with_conn(|conn| {
            let holder: Option<String> = conn
                .query_row("SELECT id FROM users WHERE name = ?1", [name], |row| row.get(0))
                .optional()?;
            if holder.is_some_and(|holder| holder != id) {
                return Ok(RenameOutcome::NameTaken);
            }

            let changed = conn.execute(
                "UPDATE users SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
            Ok(if changed > 0 {
                RenameOutcome::Renamed
            } else {
                RenameOutcome::NoSuchUser
            })
        })
    }

    // -- Calendar events --

    /// Inserts the event unless one of the same type already exists that day.
    /// Returns false on such a clash.
    pub fn insert_event(&self, event: &Event) -> Result<bool> {
        let pairs = to_json(&event.pairs)?;
        self.with_conn(|conn| {
            let date = format_date(event.date);
            let clash: Option<String> = conn
                .query_row(
                    "SELECT id FROM events WHERE date = ?1 AND event_type = ?2",
                    params![date, event.event_type.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if clash.is_some() {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO events (id, event_type, date, theme, name, description, start_time, end_time, host_house, pairs, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    event.id.to_string(),
                    event.event_type.as_str(),
                    date,
                    event.theme,
                    event.name,
                    event.description,
                    event.time.map(|t| format_time(t.start)),
                    event.time.map(|t| format_time(t.end)),
                    event.host_house.key(),
                    pairs,
                    event.created_by.to_string(),
                    format_timestamp(event.created_at),
                ],
            )?;
            Ok(true)
        })
    }

    /// All events, optionally restricted to one day, ordered by date.
    pub fn list_events(&self, date: Option<NaiveDate>) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let rows = match date {
                Some(date) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM events WHERE date = ?1 ORDER BY date, created_at"
                    ))?;
                    stmt.query_map([format_date(date)], event_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM events ORDER BY date, created_at"
                    ))?;
                    stmt.query_map([], event_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?
                }
            };
            Ok(keep_valid(rows, "event"))
        })
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                    [id.to_string()],
                    event_row,
                )
                .optional()?;
            row.map(Event::try_from).transpose()
        })
    }

    pub fn delete_event(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM events WHERE id = ?1", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    // -- Event requests --

    pub fn insert_event_request(&self, req: &EventRequest) -> Result<()> {
        let pairs = to_json(&req.pairs)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_requests (id, event_type, date, theme, pairs, message, from_role, from_house, to_house, submitted_at, status, sender_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    req.id.to_string(),
                    req.event_type.as_str(),
                    format_date(req.date),
                    req.theme,
                    pairs,
                    req.message,
                    req.from_role.as_str(),
                    req.from_house.map(|h| h.key()),
                    req.to_house.key(),
                    format_timestamp(req.submitted_at),
                    req.status.as_str(),
                    req.sender_id.to_string(),
                ],
            )?;
            Ok(())
        })
    }

    /// Newest first.
    pub fn list_event_requests(&self) -> Result<Vec<EventRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM event_requests ORDER BY submitted_at DESC"
            ))?;
            let rows = stmt
                .query_map([], request_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keep_valid(rows, "event request"))
        })
    }

    pub fn get_event_request(&self, id: Uuid) -> Result<Option<EventRequest>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {REQUEST_COLUMNS} FROM event_requests WHERE id = ?1"),
                    [id.to_string()],
                    request_row,
                )
                .optional()?;
            row.map(EventRequest::try_from).transpose()
        })
    }

    /// Moves a pending request to `status`. Returns false if the request is
    /// missing or no longer pending, so a decision is applied at most once.
    pub fn decide_event_request(&self, id: Uuid, status: RequestStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE event_requests SET status = ?1 WHERE id = ?2 AND status = 'pending'",
                params![status.as_str(), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Polls --

    pub fn insert_poll(&self, poll: &Poll) -> Result<()> {
        let options = to_json(&poll.options)?;
        let houses = to_json(&poll.houses_allowed)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO polls (id, question, options, expires_at, houses_allowed, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    poll.id.to_string(),
                    poll.question,
                    options,
                    format_timestamp(poll.expires_at),
                    houses,
                    poll.created_by.to_string(),
                    format_timestamp(poll.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Every poll with its tally, newest first.
    pub fn list_polls(&self) -> Result<Vec<Poll>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POLL_COLUMNS} FROM polls ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([], poll_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut tallies: HashMap<String, Vec<(String, u32)>> = HashMap::new();
            let mut stmt = conn.prepare(
                "SELECT poll_id, option, COUNT(*) FROM poll_votes GROUP BY poll_id, option",
            )?;
            let counts = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, u32>(2)?))
            })?;
            for count in counts {
                let (poll_id, option, n) = count?;
                tallies.entry(poll_id).or_default().push((option, n));
            }

            Ok(rows
                .into_iter()
                .filter_map(|row| {
                    let counts = tallies.remove(&row.id).unwrap_or_default();
                    match assemble_poll(row, counts) {
                        Ok(poll) => Some(poll),
                        Err(e) => {
                            warn!("Skipping corrupt poll row: {:#}", e);
                            None
                        }
                    }
                })
                .collect())
        })
    }

    pub fn get_poll(&self, id: Uuid) -> Result<Option<Poll>> {
        self.with_conn(|conn| query_poll(conn, &id.to_string()))
    }

    /// Deletes the poll and, by cascade, its votes.
    pub fn delete_poll(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM polls WHERE id = ?1", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    pub fn get_device_vote(&self, poll_id: Uuid, device_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| query_device_vote(conn, &poll_id.to_string(), device_id))
    }

    /// Records or moves this device's vote. The tally of a poll therefore
    /// counts devices, not people.
    pub fn record_vote(&self, poll_id: Uuid, device_id: &str, option: &str) -> Result<VoteOutcome> {
        self.with_conn(|conn| {
            let pid = poll_id.to_string();
            match query_device_vote(conn, &pid, device_id)? {
                Some(previous) if previous == option => Ok(VoteOutcome::Unchanged),
                Some(previous) => {
                    conn.execute(
                        "UPDATE poll_votes SET option = ?1, voted_at = datetime('now') WHERE poll_id = ?2 AND device_id = ?3",
                        params![option, pid, device_id],
                    )?;
                    Ok(VoteOutcome::Moved { from: previous })
                }
                None => {
                    conn.execute(
                        "INSERT INTO poll_votes (poll_id, device_id, option) VALUES (?1, ?2, ?3)",
                        params![pid, device_id, option],
                    )?;
                    Ok(VoteOutcome::Recorded)
                }
            }
        })
    }

    // -- Messages --

    /// `thread_key` is set for direct messages and `None` for group messages.
    pub fn insert_message(&self, message: &Message, thread_key: Option<&str>) -> Result<()> {
        self.with_conn(|conn| insert_message_row(conn, message, thread_key))
    }

    /// Posts `starter` unless the direct thread already has messages.
    /// Returns whether the thread was opened by this call.
    pub fn open_dm_thread(&self, thread_key: &str, starter: &Message) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE group_id IS NULL AND thread_key = ?1 LIMIT 1",
                    [thread_key],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_some() {
                return Ok(false);
            }
            insert_message_row(conn, starter, Some(thread_key))?;
            Ok(true)
        })
    }

    /// Distinct recipient sets of direct messages involving `user_id`, in
    /// order of first appearance.
    pub fn dm_recipient_sets(&self, user_id: Uuid) -> Result<Vec<Vec<Uuid>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT recipients, MIN(timestamp) AS first_seen
                 FROM messages
                 WHERE group_id IS NULL
                   AND EXISTS (SELECT 1 FROM json_each(messages.recipients) WHERE json_each.value = ?1)
                 GROUP BY recipients
                 ORDER BY first_seen",
            )?;
            let raw = stmt
                .query_map([user_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(raw
                .iter()
                .filter_map(|r| match parse_json::<Vec<Uuid>>(r) {
                    Ok(set) => Some(set),
                    Err(e) => {
                        warn!("Skipping corrupt recipients: {:#}", e);
                        None
                    }
                })
                .collect())
        })
    }

    /// Oldest first.
    pub fn dm_messages(&self, thread_key: &str) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE group_id IS NULL AND thread_key = ?1 ORDER BY timestamp"
            ))?;
            let rows = stmt
                .query_map([thread_key], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keep_valid(rows, "message"))
        })
    }

    /// Returns the number of messages removed.
    pub fn delete_dm_thread(&self, thread_key: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM messages WHERE group_id IS NULL AND thread_key = ?1",
                [thread_key],
            )?;
            Ok(deleted)
        })
    }

    /// Oldest first.
    pub fn group_messages(&self, group_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE group_id = ?1 ORDER BY timestamp"
            ))?;
            let rows = stmt
                .query_map([group_id.to_string()], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keep_valid(rows, "message"))
        })
    }

    // -- Group chats --

    pub fn insert_group_chat(&self, group: &GroupChat) -> Result<()> {
        let members = to_json(&group.members)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO groupchats (id, name, members, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    group.id.to_string(),
                    group.name,
                    members,
                    format_timestamp(group.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_group_chat(&self, id: Uuid) -> Result<Option<GroupChat>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, members, created_at FROM groupchats WHERE id = ?1",
                    [id.to_string()],
                    group_row,
                )
                .optional()?;
            row.map(GroupChat::try_from).transpose()
        })
    }

    /// Group chats `user_id` belongs to, newest first.
    pub fn list_group_chats(&self, user_id: Uuid) -> Result<Vec<GroupChat>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, members, created_at FROM groupchats
                 WHERE EXISTS (SELECT 1 FROM json_each(groupchats.members) WHERE json_each.value = ?1)
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], group_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keep_valid(rows, "group chat"))
        })
    }

    /// Deletes the group's messages, then the group, in one transaction.
    pub fn delete_group_chat(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let gid = id.to_string();
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages WHERE group_id = ?1", [&gid])?;
            let deleted = tx.execute("DELETE FROM groupchats WHERE id = ?1", [&gid])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
    }
}

const EVENT_COLUMNS: &str = "id, event_type, date, theme, name, description, start_time, end_time, host_house, pairs, created_by, created_at";

const REQUEST_COLUMNS: &str = "id, event_type, date, theme, pairs, message, from_role, from_house, to_house, submitted_at, status, sender_id";

const POLL_COLUMNS: &str = "id, question, options, expires_at, houses_allowed, created_by, created_at";

const MESSAGE_COLUMNS: &str = "id, sender, group_id, recipients, text, timestamp";

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        event_type: row.get(1)?,
        date: row.get(2)?,
        theme: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        host_house: row.get(8)?,
        pairs: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn request_row(row: &Row<'_>) -> rusqlite::Result<EventRequestRow> {
    Ok(EventRequestRow {
        id: row.get(0)?,
        event_type: row.get(1)?,
        date: row.get(2)?,
        theme: row.get(3)?,
        pairs: row.get(4)?,
        message: row.get(5)?,
        from_role: row.get(6)?,
        from_house: row.get(7)?,
        to_house: row.get(8)?,
        submitted_at: row.get(9)?,
        status: row.get(10)?,
        sender_id: row.get(11)?,
    })
}

fn poll_row(row: &Row<'_>) -> rusqlite::Result<PollRow> {
    Ok(PollRow {
        id: row.get(0)?,
        question: row.get(1)?,
        options: row.get(2)?,
        expires_at: row.get(3)?,
        houses_allowed: row.get(4)?,
        created_by: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender: row.get(1)?,
        group_id: row.get(2)?,
        recipients: row.get(3)?,
        text: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

fn group_row(row: &Row<'_>) -> rusqlite::Result<GroupChatRow> {
    Ok(GroupChatRow {
        id: row.get(0)?,
        name: row.get(1)?,
        members: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn insert_message_row(
    conn: &Connection,
    message: &Message,
    thread_key: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, sender, group_id, recipients, thread_key, text, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message.id.to_string(),
            message.sender.to_string(),
            message.group_id.map(|g| g.to_string()),
            to_json(&message.recipients)?,
            thread_key,
            message.text,
            format_timestamp(message.timestamp),
        ],
    )?;
    Ok(())
}

fn query_poll(conn: &Connection, id: &str) -> Result<Option<Poll>> {
    let row = conn
        .query_row(
            &format!("SELECT {POLL_COLUMNS} FROM polls WHERE id = ?1"),
            [id],
            poll_row,
        )
        .optional()?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT option, COUNT(*) FROM poll_votes WHERE poll_id = ?1 GROUP BY option")?;
    let counts = stmt
        .query_map([id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    assemble_poll(row, counts).map(Some)
}

fn query_device_vote(conn: &Connection, poll_id: &str, device_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT option FROM poll_votes WHERE poll_id = ?1 AND device_id = ?2",
        params![poll_id, device_id],
        |row| row.get(0),
    )
    .optional()
}

/// Every option appears in the tally, zero if unvoted.
fn assemble_poll(row: PollRow, counts: Vec<(String, u32)>) -> Result<Poll> {
    let options: Vec<String> = parse_json(&row.options)?;
    let mut votes: BTreeMap<String, u32> = options.iter().map(|o| (o.clone(), 0)).collect();
    for (option, n) in counts {
        if let Some(slot) = votes.get_mut(&option) {
            *slot += n;
        }
    }

    Ok(Poll {
        id: parse_uuid(&row.id)?,
        question: row.question,
        options,
        votes,
        expires_at: parse_timestamp(&row.expires_at)?,
        houses_allowed: parse_json(&row.houses_allowed)?,
        created_by: parse_uuid(&row.created_by)?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn keep_valid<R, T>(rows: Vec<R>, what: &str) -> Vec<T>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping corrupt {} row: {:#}", what, e);
                None
            }
        })
        .collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
