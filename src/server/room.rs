//! A named, ordered set of member connections.

use crate::server::ConnId;
use indexmap::IndexMap;

/// Members are keyed by client name; the map preserves join order so member
/// listings come back in the order clients arrived.
#[derive(Debug)]
pub struct Room {
    name: String,
    members: IndexMap<String, ConnId>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Room {
        Room {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upsert: re-joining replaces the member's previous connection.
    pub fn join(&mut self, client: impl Into<String>, conn: ConnId) {
        self.members.insert(client.into(), conn);
    }

    /// Conditional remove; returns whether the client was a member.
    pub fn leave(&mut self, client: &str) -> bool {
        self.members.shift_remove(client).is_some()
    }

    /// Member names in insertion order.
    pub fn clients(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Member names with their connection ids, in insertion order.
    pub fn members(&self) -> impl Iterator<Item = (&str, ConnId)> {
        self.members.iter().map(|(name, &conn)| (name.as_str(), conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_upsert() {
        let mut room = Room::new("test_room");
        room.join("alice", ConnId::for_tests(1));
        room.join("bob", ConnId::for_tests(2));
        room.join("alice", ConnId::for_tests(3));

        assert_eq!(room.clients().collect::<Vec<_>>(), vec!["alice", "bob"]);
        assert_eq!(
            room.members().find(|(name, _)| *name == "alice"),
            Some(("alice", ConnId::for_tests(3)))
        );
    }

    #[test]
    fn leave_preserves_order_of_the_rest() {
        let mut room = Room::new("test_room");
        room.join("a", ConnId::for_tests(1));
        room.join("b", ConnId::for_tests(2));
        room.join("c", ConnId::for_tests(3));

        assert!(room.leave("b"));
        assert!(!room.leave("b"));
        assert_eq!(room.clients().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
