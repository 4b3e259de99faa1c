//! Element identifiers backed by string interning.
//!
//! Diagram element ids are compared and hashed constantly (registry lookups,
//! parent/child wiring, overlay filters), so the [`Id`] type stores an
//! interned symbol instead of an owned string. Ids are `Copy` and can be
//! compared directly against string slices.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner shared by every diagram session.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn with_interner<R>(f: impl FnOnce(&mut DefaultStringInterner) -> R) -> R {
    let mut interner = INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock");
    f(&mut interner)
}

/// Interned identifier of a graph element.
///
/// # Examples
///
/// ```
/// use planum_core::identifier::Id;
///
/// let task = Id::new("Task_1");
/// assert_eq!(task, "Task_1");
///
/// let label = task.with_suffix("_label");
/// assert_eq!(label, "Task_1_label");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string slice.
    ///
    /// # Arguments
    ///
    /// * `name` - The string representation of the identifier
    pub fn new(name: &str) -> Self {
        Self(with_interner(|interner| interner.get_or_intern(name)))
    }

    /// Creates the id `<prefix>_<index>`, the shape used for generated ids.
    ///
    /// # Examples
    ///
    /// ```
    /// use planum_core::identifier::Id;
    ///
    /// assert_eq!(Id::numbered("TextAnnotation", 3), "TextAnnotation_3");
    /// ```
    pub fn numbered(prefix: &str, index: usize) -> Self {
        Self::new(&format!("{prefix}_{index}"))
    }

    /// Creates a new id by appending `suffix` to this one.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        with_interner(|interner| {
            let base = interner
                .resolve(self.0)
                .expect("Symbol should exist in interner");
            let joined = format!("{base}{suffix}");
            Self(interner.get_or_intern(joined))
        })
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = with_interner(|interner| {
            interner
                .resolve(self.0)
                .expect("Symbol should exist in interner")
                .to_owned()
        });
        f.write_str(&value)
    }
}

impl std::str::FromStr for Id {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "Task_1"`
    fn eq(&self, other: &str) -> bool {
        with_interner(|interner| {
            interner
                .resolve(self.0)
                .is_some_and(|value| value == other)
        })
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
    fn test_new_interns_equal_strings() {
        let id1 = Id::new("StartEvent_1");
        let id2 = Id::new("StartEvent_1");
        let id3 = Id::new("EndEvent_1");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "StartEvent_1");
    }

    #[test]
    fn test_numbered() {
        assert_eq!(Id::numbered("Task", 1), "Task_1");
        assert_ne!(Id::numbered("Task", 1), Id::numbered("Task", 2));
    }

    #[test]
    fn test_with_suffix() {
        let shape = Id::new("Gateway_1");
        let label = shape.with_suffix("_label");

        assert_eq!(label, "Gateway_1_label");
        assert_eq!(shape, "Gateway_1");
    }

    #[test]
    fn test_display_trait() {
        let id = Id::new("SequenceFlow_3");
        assert_eq!(format!("{id}"), "SequenceFlow_3");
        assert_eq!(id.to_string(), "SequenceFlow_3");
    }

    #[test]
    fn test_from_trait() {
        let id1: Id = "Lane_2".into();
        let id2 = Id::new("Lane_2");

        assert_eq!(id1, id2);
    }

    #[test]
    fn test_hash_and_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Id::new("key1"), "value1");
        map.insert(Id::new("key2"), "value2");

        assert_eq!(map.get(&Id::new("key1")), Some(&"value1"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_partial_eq_str() {
        let id = Id::new("Participant_1");

        assert!(id == "Participant_1");
        assert!(id != "Participant");

        let slice: &str = "Participant_1";
        assert!(id == slice);
    }
}
