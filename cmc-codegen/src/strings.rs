//! String literal table
//!
//! The front end collects string literals while parsing and stores each
//! under a conventional name `__str<N>`. The backend only reads the finished
//! table when it writes the data section.

use std::collections::HashMap;

/// Read-only view of the front end's string literals
pub trait StringTable {
    /// Stored text for a literal name such as `__str0`
    fn lookup(&self, name: &str) -> Option<&str>;

    /// Number of distinct literals discovered
    fn count(&self) -> usize;
}

/// Conventional name of the `index`-th literal
pub fn literal_name(index: usize) -> String {
    format!("__str{index}")
}

/// Simple in-memory string table
#[derive(Debug, Clone, Default)]
pub struct StringLiterals {
    entries: HashMap<String, String>,
    next_index: usize,
}

impl StringLiterals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a literal and return the name it was stored under
    pub fn insert(&mut self, text: impl Into<String>) -> String {
        let name = literal_name(self.next_index);
        self.next_index += 1;
        self.entries.insert(name.clone(), text.into());
        name
    }
}

impl StringTable for StringLiterals {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    fn count(&self) -> usize {
        self.next_index
    }
}

impl<S: Into<String>> FromIterator<S> for StringLiterals {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = StringLiterals::new();
        for text in iter {
            table.insert(text);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_names_in_order() {
        let mut table = StringLiterals::new();
        assert_eq!(table.insert("hello"), "__str0");
        assert_eq!(table.insert("world"), "__str1");
        assert_eq!(table.count(), 2);
        assert_eq!(table.lookup("__str1"), Some("world"));
        assert_eq!(table.lookup("__str2"), None);
    }

    #[test]
    fn test_from_iterator() {
        let table: StringLiterals = ["a", "b", "c"].into_iter().collect();
        assert_eq!(table.count(), 3);
        assert_eq!(table.lookup("__str2"), Some("c"));
    }
}
