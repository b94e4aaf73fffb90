//! Cache key construction.
//!
//! A key is a namespace followed by `name=value` pairs joined with `&`, in
//! the order the pairs were added. Unset values are written as `undefined`
//! rather than dropped, so that two queries differing only in which slot is
//! unset never share a key.

use crate::query::Direction;
use chrono::NaiveDate;
use std::fmt::Write;

/// Written in place of a value that was not provided.
pub const UNSET: &str = "undefined";

/// A value that can appear in a cache key.
pub trait KeyPart {
    fn write_key_part(&self, out: &mut String);
}

macro_rules! display_key_part {
    ($($t:ty),*) => {
        $(
            impl KeyPart for $t {
                fn write_key_part(&self, out: &mut String) {
                    let _ = write!(out, "{}", self);
                }
            }
        )*
    };
}

display_key_part!(i32, i64, u32, u64, str, String, Direction);

impl KeyPart for NaiveDate {
    fn write_key_part(&self, out: &mut String) {
        let _ = write!(out, "{}", self.format("%Y-%m-%d"));
    }
}

impl<T: KeyPart> KeyPart for Option<T> {
    fn write_key_part(&self, out: &mut String) {
        match self {
            Some(value) => value.write_key_part(out),
            None => out.push_str(UNSET),
        }
    }
}

/// Types whose values address a cache entry.
pub trait CacheKey {
    fn cache_key(&self) -> String;
}

/// Cache key builder for consistent key generation.
pub struct CacheKeyBuilder {
    key: String,
    empty: bool,
}

impl CacheKeyBuilder {
    /// Start a key. The namespace is written verbatim, including its
    /// terminator (`stations:`, `station:4/journey-count?`).
    pub fn new(namespace: &str) -> Self {
        Self {
            key: namespace.to_string(),
            empty: true,
        }
    }

    /// Append a `name=value` pair.
    pub fn param<V: KeyPart + ?Sized>(mut self, name: &str, value: &V) -> Self {
        if !self.empty {
            self.key.push('&');
        }
        self.empty = false;
        self.key.push_str(name);
        self.key.push('=');
        value.write_key_part(&mut self.key);
        self
    }

    pub fn build(self) -> String {
        self.key
    }
}

/// Keys of queries that take no parameters or a single identifier.
pub mod keys {
    /// Cache key for the station count.
    pub fn station_count() -> String {
        "stations:count".to_string()
    }

    /// Cache key for the journey count.
    pub fn journey_count() -> String {
        "journeys:count".to_string()
    }

    /// Cache key for a station summary.
    pub fn station(id: i32) -> String {
        format!("station:{}", id)
    }

    /// Cache key for a single journey.
    pub fn journey(id: i32) -> String {
        format!("journey:{}", id)
    }
}
