//! API credential pooling and rotation.
//!
//! A [`CredentialPool`] is loaded once at startup and shared read-only. Each
//! chunked job takes its own [`CredentialRotator`] so concurrent requests do
//! not interleave their cycle order. Endpoints that make a single call use the
//! pool's shared atomic cursor instead, so their load still spreads.

use crate::error::{LecternError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ordered, non-empty set of API credentials.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    keys: Arc<[String]>,
    shared_cursor: Arc<AtomicUsize>,
}

impl CredentialPool {
    /// Build a pool from explicit keys. Blank entries are dropped.
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(LecternError::Config(
                "credential pool is empty; at least one API key is required".to_string(),
            ));
        }

        Ok(Self {
            keys: keys.into(),
            shared_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Parse a comma-separated list of keys.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// A fresh rotator starting at the first key.
    pub fn rotator(&self) -> CredentialRotator {
        CredentialRotator {
            keys: Arc::clone(&self.keys),
            cursor: 0,
        }
    }

    /// Next key from the process-wide cursor.
    pub fn next_shared(&self) -> &str {
        let idx = self.shared_cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[idx]
    }
}

/// Cyclic cursor over a credential pool.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    keys: Arc<[String]>,
    cursor: usize,
}

impl CredentialRotator {
    /// Build a standalone rotator. Fails with a config error when no key is usable.
    pub fn new(keys: Vec<String>) -> Result<Self> {
        Ok(CredentialPool::new(keys)?.rotator())
    }

    /// Hand out the next key, wrapping after the last one.
    pub fn next_key(&mut self) -> &str {
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.keys.len();
        &self.keys[idx]
    }

    pub fn pool_size(&self) -> usize {
        self.keys.len()
    }
}

impl Iterator for CredentialRotator {
    type Item = String;

    /// Never returns `None`.
    fn next(&mut self) -> Option<String> {
        Some(self.next_key().to_string())
    }
}

/// Last four characters of a key, for logs.
pub fn key_hint(key: &str) -> &str {
    crate::text::tail_chars(key, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_rotation_wraps() {
        let mut rotator = CredentialRotator::new(pool(&["a", "b", "c"])).unwrap();
        let seen: Vec<String> = (0..4).map(|_| rotator.next_key().to_string()).collect();
        assert_eq!(seen, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_iterator_is_endless() {
        let rotator = CredentialRotator::new(pool(&["x", "y"])).unwrap();
        let seen: Vec<String> = rotator.take(5).collect();
        assert_eq!(seen, vec!["x", "y", "x", "y", "x"]);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            CredentialRotator::new(Vec::new()),
            Err(LecternError::Config(_))
        ));
        assert!(matches!(CredentialPool::parse(""), Err(LecternError::Config(_))));
        assert!(matches!(CredentialPool::parse(" , ,"), Err(LecternError::Config(_))));
    }

    #[test]
    fn test_parse_trims_and_drops_blanks() {
        let pool = CredentialPool::parse(" k1 ,,k2, ").unwrap();
        assert_eq!(pool.keys(), &["k1".to_string(), "k2".to_string()]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_rotators_are_independent() {
        let pool = CredentialPool::parse("a,b").unwrap();
        let mut first = pool.rotator();
        let mut second = pool.rotator();
        assert_eq!(first.next_key(), "a");
        assert_eq!(first.next_key(), "b");
        assert_eq!(second.next_key(), "a");
    }

    #[test]
    fn test_shared_cursor_spans_clones() {
        let pool = CredentialPool::parse("a,b,c").unwrap();
        let clone = pool.clone();
        assert_eq!(pool.next_shared(), "a");
        assert_eq!(clone.next_shared(), "b");
        assert_eq!(pool.next_shared(), "c");
        assert_eq!(clone.next_shared(), "a");
    }

    #[test]
    fn test_key_hint() {
        assert_eq!(key_hint("AIzaSyABCD1234"), "1234");
        assert_eq!(key_hint("ab"), "ab");
    }
}
