use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EventRequest, EventType, Poll, TimeRange};
use crate::roles::{House, Role};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub name: String,
    /// Free text, normalized server-side.
    pub house: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    pub house: House,
    pub token: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
}

// -- Calendar --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub event_type: EventType,
    pub date: NaiveDate,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time: Option<TimeRange>,
    /// Honoured for administrators only.
    #[serde(default)]
    pub host_house: Option<House>,
    #[serde(default)]
    pub pairs: Vec<House>,
}

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    pub date: Option<NaiveDate>,
}

// -- Event requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitEventRequest {
    pub event_type: EventType,
    pub date: NaiveDate,
    #[serde(default)]
    pub theme: Option<String>,
    /// Free text, normalized server-side; must name a fraternity.
    pub to_house: String,
    #[serde(default)]
    pub pairs: Vec<House>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventRequestInbox {
    pub requests: Vec<EventRequest>,
    pub pending: usize,
    pub approved: usize,
    pub declined: usize,
}

// -- Polls --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub houses_allowed: Vec<House>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub option: String,
    /// Per-device voter key; one vote per device per poll.
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollView {
    #[serde(flatten)]
    pub poll: Poll,
    /// Option this device voted for, if a device id was supplied.
    pub voted_option: Option<String>,
}

// -- Messaging --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartDmRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmThreadResponse {
    pub members: Vec<Uuid>,
    /// The member that is not the caller.
    pub with: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub members: Vec<Uuid>,
}
