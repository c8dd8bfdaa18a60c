//! Who may see and change what. Every check derives the caller's house from
//! the role on each call; administrators bypass house checks.

use crate::directory::canonical_house_for_role;
use crate::models::{Event, EventRequest, Poll};
use crate::roles::{House, Role};

/// House the role acts for, or `None` for administrators.
fn acting_house(role: Role) -> Option<House> {
    canonical_house_for_role(role)
}

fn is_chair_of(role: Role, house: House) -> bool {
    role.is_social_chair() && acting_house(role) == Some(house)
}

// -- Calendar --

pub fn can_see_event(role: Role, event: &Event) -> bool {
    match acting_house(role) {
        None => true,
        Some(house) => event.host_house == house || event.pairs.contains(&house),
    }
}

pub fn can_create_event(role: Role) -> bool {
    role.is_administrator() || (role.is_social_chair() && role.house().is_fraternity())
}

/// Host for a new event. Social chairs always host as their own house;
/// administrators may name any fraternity and default to their own.
pub fn event_host(role: Role, requested: Option<House>) -> Option<House> {
    if role.is_administrator() {
        let host = requested.unwrap_or(role.house());
        return host.is_fraternity().then_some(host);
    }
    if can_create_event(role) {
        Some(role.house())
    } else {
        None
    }
}

pub fn can_remove_event(role: Role, event: &Event) -> bool {
    role.is_administrator() || is_chair_of(role, event.host_house)
}

// -- Event requests --

pub fn can_submit_request(role: Role) -> bool {
    role.is_administrator() || role.is_social_chair()
}

/// Whether requests addressed to `house` land in this role's inbox.
pub fn can_see_requests_to(role: Role, house: House) -> bool {
    role.is_administrator() || is_chair_of(role, house)
}

pub fn can_see_request(role: Role, request: &EventRequest) -> bool {
    can_see_requests_to(role, request.to_house)
}

/// Approve/decline right. Status is checked separately by the state machine.
pub fn can_act_on_request(role: Role, request: &EventRequest) -> bool {
    can_see_request(role, request)
}

// -- Polls --

pub fn can_create_poll(role: Role) -> bool {
    role.is_administrator() || role.is_social_chair()
}

/// Selected houses plus the creator's own, without duplicates, in selection order.
pub fn houses_allowed_for_new_poll(role: Role, selected: &[House]) -> Vec<House> {
    let mut houses: Vec<House> = Vec::with_capacity(selected.len() + 1);
    for house in selected.iter().copied().chain(std::iter::once(role.house())) {
        if !houses.contains(&house) {
            houses.push(house);
        }
    }
    houses
}

pub fn can_see_poll(role: Role, poll: &Poll) -> bool {
    match acting_house(role) {
        None => true,
        Some(house) => poll.houses_allowed.contains(&house),
    }
}

pub fn can_vote(role: Role, poll: &Poll) -> bool {
    can_see_poll(role, poll)
}

pub fn can_remove_poll(role: Role, poll: &Poll) -> bool {
    role.is_administrator()
        || (role.is_social_chair() && poll.houses_allowed.contains(&role.house()))
}
