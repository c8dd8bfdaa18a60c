//! House/Role directory: normalization of free-text house and role input and
//! the membership queries built on the role table in [`crate::roles`].
//!
//! Two normalizations coexist on purpose. House keys collapse separators to a
//! single underscore (`"Psi U"` -> `PSI_U`), so they stay readable identifiers.
//! Role comparison strips separators entirely (`"KKG Social"` -> `kkgsocial`),
//! so a role stored as an identifier matches one stored as a label.

use serde::{Deserialize, Serialize};

use crate::roles::{House, Role};

/// Normalized house key. May name no house at all; see [`HouseKey::house`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseKey(String);

impl HouseKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn house(&self) -> Option<House> {
        House::from_key(&self.0)
    }
}

impl std::fmt::Display for HouseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim, uppercase, collapse each run of non-alphanumerics into one `_`, and
/// drop leading/trailing underscores. Idempotent.
pub fn normalize_house_key(input: &str) -> HouseKey {
    let mut key = String::with_capacity(input.len());
    let mut separator = false;

    for ch in input.trim().chars().flat_map(char::to_uppercase) {
        if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
            if separator && !key.is_empty() {
                key.push('_');
            }
            separator = false;
            key.push(ch);
        } else {
            separator = true;
        }
    }

    HouseKey(key)
}

/// Lowercase with every non-alphanumeric removed.
pub fn loose_role_key(input: &str) -> String {
    input
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// House of a role, or `None` for administrative roles. Callers treat `None`
/// as "visible across all houses", never as "no house".
pub fn canonical_house_for_role(role: Role) -> Option<House> {
    if role.is_administrator() {
        None
    } else {
        Some(role.house())
    }
}

/// Roles of the house named by `key`; empty when the key names no house.
pub fn roles_for_house(key: &HouseKey) -> Vec<Role> {
    key.house().map(House::roles).unwrap_or_default()
}

/// Outcome of checking a user's role against an entered house name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Member(House),
    NotMember(House),
    /// The entered text does not normalize to any known house.
    UnrecognizedHouse(HouseKey),
}

impl Membership {
    pub fn is_member(&self) -> bool {
        matches!(self, Membership::Member(_))
    }
}

pub fn house_membership(entered_house: &str, user_role: &str) -> Membership {
    let key = normalize_house_key(entered_house);
    let Some(house) = key.house() else {
        return Membership::UnrecognizedHouse(key);
    };

    let wanted = loose_role_key(user_role);
    let allowed = house
        .roles()
        .into_iter()
        .any(|role| loose_role_key(role.as_str()) == wanted);

    if allowed {
        Membership::Member(house)
    } else {
        Membership::NotMember(house)
    }
}

pub fn is_user_in_house(entered_house: &str, user_role: &str) -> bool {
    house_membership(entered_house, user_role).is_member()
}
