//! Identifier management using string interning.
//!
//! Participant, player, entity and rule codes are compared and hashed
//! constantly while commands mutate a diagram, so they are interned once
//! and passed around as the `Copy` type [`Id`].

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock")
}

/// Interned identifier.
///
/// # Examples
///
/// ```
/// use tracery_core::identifier::Id;
///
/// let alice = Id::new("Alice");
/// assert_eq!(alice, "Alice");
/// assert_eq!(alice, Id::new("Alice"));
/// assert_eq!(alice.to_string(), "Alice");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string slice, interning it on first use.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        f.write_str(value)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        interner().resolve(self.0) == Some(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id1 = Id::new("Alice");
        let id2 = Id::new("Alice");
        let id3 = Id::new("Bob");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "Alice");
    }

    #[test]
    fn test_to_string_round_trips_unicode() {
        let id = Id::new("caf\u{e9}_42");
        assert_eq!(id.to_string(), "caf\u{e9}_42");
    }

    #[test]
    fn test_from_str_ref() {
        let id: Id = "player".into();
        assert!(id == "player");
        assert!(id != "Player");
    }
}
