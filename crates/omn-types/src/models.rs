use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::roles::{House, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Darty,
    #[serde(rename = "Night Party")]
    NightParty,
    Philanthropy,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Darty => "Darty",
            EventType::NightParty => "Night Party",
            EventType::Philanthropy => "Philanthropy",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Darty" => Ok(EventType::Darty),
            "Night Party" => Ok(EventType::NightParty),
            "Philanthropy" => Ok(EventType::Philanthropy),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A calendar entry hosted by one house and shared with its paired houses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub event_type: EventType,
    pub date: NaiveDate,
    pub theme: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub time: Option<TimeRange>,
    pub host_house: House,
    pub pairs: Vec<House>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Decline,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("request is already {0}")]
pub struct TransitionError(pub RequestStatus);

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
        }
    }

    /// `pending -> approved | declined`; both targets are terminal.
    pub fn apply(self, decision: Decision) -> Result<RequestStatus, TransitionError> {
        match (self, decision) {
            (RequestStatus::Pending, Decision::Approve) => Ok(RequestStatus::Approved),
            (RequestStatus::Pending, Decision::Decline) => Ok(RequestStatus::Declined),
            (done, _) => Err(TransitionError(done)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "declined" => Ok(RequestStatus::Declined),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

/// Cross-house proposal routed to the social chair of `to_house`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    pub id: Uuid,
    pub event_type: EventType,
    pub date: NaiveDate,
    pub theme: Option<String>,
    pub pairs: Vec<House>,
    pub message: Option<String>,
    pub from_role: Role,
    /// `None` when submitted by an administrator.
    pub from_house: Option<House>,
    pub to_house: House,
    pub submitted_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub sender_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    /// Option -> vote count. Options nobody voted for are present with 0.
    pub votes: BTreeMap<String, u32>,
    pub expires_at: DateTime<Utc>,
    pub houses_allowed: Vec<House>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    /// `None` for direct messages.
    pub group_id: Option<Uuid>,
    /// Both members of a direct thread; empty for group messages.
    pub recipients: Vec<Uuid>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupChat {
    pub id: Uuid,
    pub name: Option<String>,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl GroupChat {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_transitions_are_terminal() {
        assert_eq!(
            RequestStatus::Pending.apply(Decision::Approve),
            Ok(RequestStatus::Approved)
        );
        assert_eq!(
            RequestStatus::Pending.apply(Decision::Decline),
            Ok(RequestStatus::Declined)
        );
        assert_eq!(
            RequestStatus::Approved.apply(Decision::Decline),
            Err(TransitionError(RequestStatus::Approved))
        );
        assert_eq!(
            RequestStatus::Declined.apply(Decision::Approve),
            Err(TransitionError(RequestStatus::Declined))
        );
    }

    #[test]
    fn event_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&EventType::NightParty).unwrap(),
            "\"Night Party\""
        );
        for t in [EventType::Darty, EventType::NightParty, EventType::Philanthropy] {
            assert_eq!(t.as_str().parse::<EventType>(), Ok(t));
        }
    }

    #[test]
    fn poll_expiry() {
        let now = Utc::now();
        let poll = Poll {
            id: Uuid::new_v4(),
            question: "Theme?".into(),
            options: vec!["Neon".into(), "Toga".into()],
            votes: BTreeMap::new(),
            expires_at: now + chrono::Duration::hours(1),
            houses_allowed: vec![House::Kkg],
            created_by: Uuid::new_v4(),
            created_at: now,
        };
        assert!(poll.is_active(now));
        assert!(!poll.is_active(now + chrono::Duration::hours(2)));
        assert!(poll.has_option("Toga"));
        assert!(!poll.has_option("toga"));
    }
}
