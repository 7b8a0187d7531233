//! Member roster for the rotation job.
//!
//! The roster document is edited out-of-band; order is authoritative and the
//! cursor is a pure function of (roster, member); nothing here is mutated
//! between runs.

use mailclerk_mail::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    pub email: String,
}

impl Member {
    pub fn new(name: &str, surname: Option<&str>, email: &str) -> Self {
        Self {
            name: name.to_string(),
            surname: surname.map(String::from),
            email: email.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        match &self.surname {
            Some(surname) => format!("{} {surname}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.full_name(), &self.email)
    }
}

/// Ordered, cyclic member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub members: Vec<Member>,
}

impl Roster {
    /// Member after `member` in roster order, wrapping to the first.
    ///
    /// A member no longer present (edited out between runs) restarts the
    /// cycle at the first member. `None` only for an empty roster.
    pub fn next_after(&self, member: &Member) -> Option<&Member> {
        let position = self.members.iter().position(|m| m.email == member.email);
        match position {
            Some(i) => self.members.get((i + 1) % self.members.len()),
            None => self.members.first(),
        }
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.members.iter().map(Member::address).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster {
            members: vec![
                Member::new("Ann", Some("Archer"), "ann@example.com"),
                Member::new("Ben", None, "ben@example.com"),
                Member::new("Cat", Some("Cole"), "cat@example.com"),
            ],
        }
    }

    #[test]
    fn advances_in_roster_order() {
        let r = roster();
        assert_eq!(r.next_after(&r.members[0]).unwrap().email, "ben@example.com");
        assert_eq!(r.next_after(&r.members[1]).unwrap().email, "cat@example.com");
    }

    #[test]
    fn wraps_from_last_to_first() {
        let r = roster();
        let last = r.members.last().unwrap();
        assert_eq!(r.next_after(last).unwrap().email, "ann@example.com");
    }

    #[test]
    fn unknown_member_restarts_at_first() {
        let r = roster();
        let gone = Member::new("Dee", None, "dee@example.com");
        assert_eq!(r.next_after(&gone).unwrap().email, "ann@example.com");
    }

    #[test]
    fn empty_roster_has_no_next() {
        let r = Roster { members: vec![] };
        assert!(r.next_after(&Member::new("Ann", None, "ann@example.com")).is_none());
    }

    #[test]
    fn full_name_handles_missing_surname() {
        assert_eq!(
            Member::new("Ann", Some("Archer"), "a@x.com").full_name(),
            "Ann Archer"
        );
        assert_eq!(Member::new("Ben", None, "b@x.com").full_name(), "Ben");
    }

    #[test]
    fn roster_document_round_trips() {
        let json = r#"{ "members": [ { "name": "Ann", "surname": "Archer", "email": "ann@example.com" }, { "name": "Ben", "email": "ben@example.com" } ] }"#;
        let r: Roster = serde_json::from_str(json).unwrap();
        assert_eq!(r.members.len(), 2);
        assert_eq!(r.members[1].surname, None);
        let back = serde_json::to_string(&r).unwrap();
        assert!(!back.contains("\"surname\":null"));
    }
}
