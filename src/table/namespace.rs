//! Named partitions of a shared table.
//!
//! Several logical tables can live in one storage engine by prefixing every
//! key with `<name>/`. A namespace only ever sees its own keys, and keys come
//! back out of `iter` and `scan_prefix` with the namespace prefix removed.

use crate::error::{Error, Result};
use crate::table::{check_key, Iter, Table};
use bytes::Bytes;

/// Separator between the namespace name and the caller's key.
const SEPARATOR: char = '/';

/// A [`Table`] view restricted to one namespace of an inner table.
#[derive(Debug, Clone)]
pub struct Namespaced<T> {
    inner: T,
    prefix: String,
}

impl<T: Table> Namespaced<T> {
    /// Creates a view over `inner` for the namespace `name`.
    ///
    /// Returns [`Error::InvalidConfig`] if the name is empty or contains the
    /// separator, since either would let two namespaces overlap.
    pub fn new(inner: T, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(Error::InvalidConfig(format!(
                "namespace name {name:?} must be non-empty and must not contain {SEPARATOR:?}"
            )));
        }
        Ok(Self {
            inner,
            prefix: format!("{name}{SEPARATOR}"),
        })
    }

    /// Returns the wrapped table.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn full_key(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.prefix.len() + key.len());
        full.push_str(&self.prefix);
        full.push_str(key);
        full
    }
}

impl<T: Table> Table for Namespaced<T> {
    fn insert(&self, key: &str, value: Bytes) -> Result<()> {
        check_key(key)?;
        self.inner.insert(&self.full_key(key), value)
    }

    fn get(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        self.inner.get(&self.full_key(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.inner.delete(&self.full_key(key))
    }

    fn size(&self) -> Result<usize> {
        self.inner.size_prefix(&self.prefix)
    }

    fn iter(&self) -> Result<Iter> {
        self.scan_prefix("")
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Iter> {
        let strip = self.prefix.len();
        let iter = self.inner.scan_prefix(&self.full_key(prefix))?;
        Ok(Box::new(iter.map(move |item| {
            item.map(|(mut key, value)| {
                key.drain(..strip);
                (key, value)
            })
        })))
    }

    fn size_prefix(&self, prefix: &str) -> Result<usize> {
        self.inner.size_prefix(&self.full_key(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemTable;
    use std::sync::Arc;

    #[test]
    fn test_namespaces_are_isolated() {
        let db = Arc::new(MemTable::new());
        let users = Namespaced::new(Arc::clone(&db), "users").unwrap();
        let orders = Namespaced::new(Arc::clone(&db), "orders").unwrap();

        users.insert("1", Bytes::from("ariz")).unwrap();
        orders.insert("1", Bytes::from("book")).unwrap();
        orders.insert("2", Bytes::from("pen")).unwrap();

        assert_eq!(users.get("1").unwrap(), Bytes::from("ariz"));
        assert_eq!(orders.get("1").unwrap(), Bytes::from("book"));
        assert_eq!(users.size().unwrap(), 1);
        assert_eq!(orders.size().unwrap(), 2);
        assert_eq!(db.size().unwrap(), 3);

        users.delete("1").unwrap();
        assert!(users.get("1").unwrap_err().is_not_found());
        assert_eq!(orders.get("1").unwrap(), Bytes::from("book"));
    }

    #[test]
    fn test_iter_strips_prefix() {
        let db = MemTable::new();
        let table = Namespaced::new(db, "t").unwrap();
        table.insert("a", Bytes::from("1")).unwrap();
        table.insert("b", Bytes::from("2")).unwrap();

        let keys: Vec<String> = table.iter().unwrap().map(|r| r.unwrap().0).collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rejects_bad_names_and_keys() {
        assert!(matches!(
            Namespaced::new(MemTable::new(), ""),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Namespaced::new(MemTable::new(), "a/b"),
            Err(Error::InvalidConfig(_))
        ));

        let table = Namespaced::new(MemTable::new(), "t").unwrap();
        assert!(matches!(table.insert("", Bytes::new()), Err(Error::EmptyKey)));
        assert!(matches!(table.get(""), Err(Error::EmptyKey)));
        assert!(matches!(table.delete(""), Err(Error::EmptyKey)));
    }
}
