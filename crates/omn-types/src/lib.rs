pub mod access;
pub mod api;
pub mod directory;
pub mod events;
pub mod messaging;
pub mod models;
pub mod roles;
pub mod session;

pub use roles::{House, HouseKind, Role, Tier};
