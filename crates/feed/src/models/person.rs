// ABOUTME: People attached to feeds and entries, with their roles.
// ABOUTME: PersonCollection selects the primary person by role rank and merges role chains.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::url::Url;

/// Role ranks. Contributors are helpers and can never be primary; roles not
/// listed rank zero and are excluded from primary selection too.
const ROLE_RANKS: &[(&str, i32)] = &[
    ("author", 3),
    ("editor", 2),
    ("webmaster", 1),
    ("contributor", -1),
];

/// The part a person played; open-ended, with well-known values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Author,
    Contributor,
    Editor,
    Webmaster,
    #[serde(untagged)]
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Author => "author",
            Role::Contributor => "contributor",
            Role::Editor => "editor",
            Role::Webmaster => "webmaster",
            Role::Other(s) => s,
        }
    }

    pub fn rank(&self) -> i32 {
        ROLE_RANKS
            .iter()
            .find(|(name, _)| *name == self.as_str())
            .map_or(0, |(_, rank)| *rank)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person with optional name, email, web page and avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: Option<String>,
    pub mail: Option<String>,
    pub url: Option<Url>,
    /// Avatar image (JSON Feed and h-card only).
    pub avatar: Option<Url>,
    pub role: Role,
}

impl Person {
    pub fn new(role: Role) -> Self {
        Self {
            name: None,
            mail: None,
            url: None,
            avatar: None,
            role,
        }
    }

    /// A person counts only when it has a name or an email address.
    pub fn is_present(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.name) || filled(&self.mail)
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.mail) {
            (Some(name), Some(mail)) => write!(f, "{} <{}>", name, mail),
            (Some(name), None) => f.write_str(name),
            (None, Some(mail)) => f.write_str(mail),
            (None, None) => Ok(()),
        }
    }
}

/// Ordered list of people; absent people are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonCollection(Vec<Person>);

impl PersonCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a person unless it has neither name nor mail.
    pub fn push(&mut self, person: Person) {
        if person.is_present() {
            self.0.push(person);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Person> {
        self.0.iter()
    }

    /// First person of the highest positively ranked role.
    pub fn primary(&self) -> Option<&Person> {
        let mut best: Option<(&Person, i32)> = None;
        for person in &self.0 {
            let rank = person.role.rank();
            if rank <= 0 {
                continue;
            }
            if best.map_or(true, |(_, r)| rank > r) {
                best = Some((person, rank));
            }
        }
        best.map(|(p, _)| p)
    }

    /// Appends the members of each collection in argument order.
    pub fn merge<'a>(&mut self, others: impl IntoIterator<Item = &'a PersonCollection>) {
        for other in others {
            self.0.extend(other.0.iter().cloned());
        }
    }

    /// People having the given role.
    pub fn filter_role(&self, role: &Role) -> PersonCollection {
        PersonCollection(self.0.iter().filter(|p| p.role == *role).cloned().collect())
    }
}

impl FromIterator<Person> for PersonCollection {
    fn from_iter<I: IntoIterator<Item = Person>>(iter: I) -> Self {
        let mut out = PersonCollection::new();
        for person in iter {
            out.push(person);
        }
        out
    }
}

impl<'a> IntoIterator for &'a PersonCollection {
    type Item = &'a Person;
    type IntoIter = std::slice::Iter<'a, Person>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for PersonCollection {
    type Item = Person;
    type IntoIter = std::vec::IntoIter<Person>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
