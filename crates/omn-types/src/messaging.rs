use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A two-member direct conversation. Not stored; inferred from the recipient
/// sets of direct messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DmThread {
    /// Sorted.
    pub members: [Uuid; 2],
}

impl DmThread {
    pub fn between(a: Uuid, b: Uuid) -> Self {
        let members = if a <= b { [a, b] } else { [b, a] };
        Self { members }
    }

    /// Stable key used to store and look up the thread's messages.
    pub fn key(&self) -> String {
        format!("{},{}", self.members[0], self.members[1])
    }

    pub fn other(&self, me: Uuid) -> Uuid {
        if self.members[0] == me {
            self.members[1]
        } else {
            self.members[0]
        }
    }
}

/// Distinct DM threads of `user_id`, in first-seen order. Recipient sets
/// that do not have exactly two distinct members including the user are skipped.
pub fn derive_dm_threads<I>(user_id: Uuid, recipient_sets: I) -> Vec<DmThread>
where
    I: IntoIterator<Item = Vec<Uuid>>,
{
    let mut seen = HashSet::new();
    let mut threads = Vec::new();

    for mut members in recipient_sets {
        members.sort();
        members.dedup();
        if members.len() != 2 || !members.contains(&user_id) {
            continue;
        }
        let thread = DmThread::between(members[0], members[1]);
        if seen.insert(thread.key()) {
            threads.push(thread);
        }
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(DmThread::between(a, b), DmThread::between(b, a));
        assert_eq!(DmThread::between(a, b).other(a), b);
    }

    #[test]
    fn derives_distinct_threads() {
        let me = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let threads = derive_dm_threads(
            me,
            vec![
                vec![me, alice],
                vec![alice, me],
                vec![bob, me],
                vec![alice, stranger],
                vec![me, alice, bob],
                vec![me, me],
            ],
        );

        assert_eq!(
            threads,
            vec![DmThread::between(me, alice), DmThread::between(me, bob)]
        );
    }
}
