//! Database row types. These map directly to SQLite rows; conversion into
//! the omn-types domain models validates every column.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use omn_types::models::{Event, EventRequest, GroupChat, Message, TimeRange, User};
use omn_types::{House, Role};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub role: String,
    pub password_hash: String,
    pub created_at: String,
}

impl UserRow {
    pub fn user_id(&self) -> Result<Uuid> {
        self.id.parse().with_context(|| format!("corrupt user id '{}'", self.id))
    }

    pub fn into_user(self) -> Result<User> {
        let id = self.user_id()?;
        let role = Role::parse_loose(&self.role)
            .ok_or_else(|| anyhow!("user {} has unknown role '{}'", self.id, self.role))?;
        Ok(User {
            id,
            name: self.name,
            role,
        })
    }
}

pub struct EventRow {
    pub id: String,
    pub event_type: String,
    pub date: String,
    pub theme: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub host_house: String,
    pub pairs: String,
    pub created_by: String,
    pub created_at: String,
}

impl TryFrom<EventRow> for Event {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self> {
        let time = match (&row.start_time, &row.end_time) {
            (Some(start), Some(end)) => Some(TimeRange {
                start: parse_time(start)?,
                end: parse_time(end)?,
            }),
            _ => None,
        };

        Ok(Event {
            id: parse_uuid(&row.id)?,
            event_type: row.event_type.parse().map_err(|e: String| anyhow!(e))?,
            date: parse_date(&row.date)?,
            theme: row.theme,
            name: row.name,
            description: row.description,
            time,
            host_house: parse_house(&row.host_house)?,
            pairs: parse_json(&row.pairs)?,
            created_by: parse_uuid(&row.created_by)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub struct EventRequestRow {
    pub id: String,
    pub event_type: String,
    pub date: String,
    pub theme: Option<String>,
    pub pairs: String,
    pub message: Option<String>,
    pub from_role: String,
    pub from_house: Option<String>,
    pub to_house: String,
    pub submitted_at: String,
    pub status: String,
    pub sender_id: String,
}

impl TryFrom<EventRequestRow> for EventRequest {
    type Error = anyhow::Error;

    fn try_from(row: EventRequestRow) -> Result<Self> {
        Ok(EventRequest {
            id: parse_uuid(&row.id)?,
            event_type: row.event_type.parse().map_err(|e: String| anyhow!(e))?,
            date: parse_date(&row.date)?,
            theme: row.theme,
            pairs: parse_json(&row.pairs)?,
            message: row.message,
            from_role: row.from_role.parse()?,
            from_house: row.from_house.as_deref().map(parse_house).transpose()?,
            to_house: parse_house(&row.to_house)?,
            submitted_at: parse_timestamp(&row.submitted_at)?,
            status: row.status.parse().map_err(|e: String| anyhow!(e))?,
            sender_id: parse_uuid(&row.sender_id)?,
        })
    }
}

pub struct PollRow {
    pub id: String,
    pub question: String,
    pub options: String,
    pub expires_at: String,
    pub houses_allowed: String,
    pub created_by: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub group_id: Option<String>,
    pub recipients: String,
    pub text: String,
    pub timestamp: String,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: parse_uuid(&row.id)?,
            sender: parse_uuid(&row.sender)?,
            group_id: row.group_id.as_deref().map(parse_uuid).transpose()?,
            recipients: parse_json(&row.recipients)?,
            text: row.text,
            timestamp: parse_timestamp(&row.timestamp)?,
        })
    }
}

pub struct GroupChatRow {
    pub id: String,
    pub name: Option<String>,
    pub members: String,
    pub created_at: String,
}

impl TryFrom<GroupChatRow> for GroupChat {
    type Error = anyhow::Error;

    fn try_from(row: GroupChatRow) -> Result<Self> {
        Ok(GroupChat {
            id: parse_uuid(&row.id)?,
            name: row.name,
            members: parse_json(&row.members)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

// -- Column helpers --

/// Timestamps are written as RFC 3339 with a fixed precision so that string
/// order equals time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite defaults store "YYYY-MM-DD HH:MM:SS" without timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("corrupt date '{}'", raw))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").with_context(|| format!("corrupt time '{}'", raw))
}

pub fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

fn parse_house(raw: &str) -> Result<House> {
    House::from_key(raw).ok_or_else(|| anyhow!("corrupt house key '{}'", raw))
}

pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("corrupt JSON column '{}'", raw))
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
