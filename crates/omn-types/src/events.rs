use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::{House, Role};

/// Realtime change feeds a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    Events,
    EventRequests,
    Polls,
    Messages,
    GroupChats,
}

/// Events sent over the WebSocket gateway. Change events are invalidation
/// signals: clients re-fetch the affected list over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String, role: Role },

    EventsChanged,

    EventRequestsChanged { to_house: House },

    PollsChanged,

    /// A direct or group message was sent or a conversation was deleted.
    MessagesChanged {
        group_id: Option<Uuid>,
        members: Vec<Uuid>,
    },

    GroupChatsChanged { members: Vec<Uuid> },
}

impl GatewayEvent {
    pub fn feed(&self) -> Option<Feed> {
        match self {
            Self::Ready { .. } => None,
            Self::EventsChanged => Some(Feed::Events),
            Self::EventRequestsChanged { .. } => Some(Feed::EventRequests),
            Self::PollsChanged => Some(Feed::Polls),
            Self::MessagesChanged { .. } => Some(Feed::Messages),
            Self::GroupChatsChanged { .. } => Some(Feed::GroupChats),
        }
    }

    /// Users the event concerns. `None` means every subscriber.
    pub fn audience(&self) -> Option<&[Uuid]> {
        match self {
            Self::MessagesChanged { members, .. } => Some(members),
            Self::GroupChatsChanged { members } => Some(members),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace the set of feeds this connection receives.
    Subscribe { feeds: Vec<Feed> },
}
