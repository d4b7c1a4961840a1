//! Ordered column names of a row set.

use std::collections::HashSet;

use crate::error::Error;

/// Column names reported by a cursor, guaranteed free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSet {
    names: Vec<String>,
}

impl ColumnSet {
    /// Build a column set, failing on the first name that repeats.
    pub fn new(names: Vec<String>) -> Result<Self, Error> {
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over column names in cursor order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Column names as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Check whether these are exactly the given names, in order.
    pub fn matches(&self, names: &[String]) -> bool {
        self.names == names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_distinct_columns() {
        let columns = ColumnSet::new(names(&["foo", "bar"])).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.iter().collect::<Vec<_>>(), vec!["foo", "bar"]);
        assert!(columns.matches(&names(&["foo", "bar"])));
        assert!(!columns.matches(&names(&["bar", "foo"])));
    }

    #[test]
    fn test_first_duplicate_reported() {
        let err = ColumnSet::new(names(&["a", "b", "b", "a"])).unwrap_err();
        assert_eq!(err.to_string(), "rows contain duplicated column 'b'");
    }

    #[test]
    fn test_case_sensitive() {
        assert!(ColumnSet::new(names(&["foo", "Foo"])).is_ok());
    }

    #[test]
    fn test_empty() {
        let columns = ColumnSet::new(Vec::new()).unwrap();
        assert!(columns.is_empty());
    }
}
