//! Value types storable in the keyspace.

pub mod sorted_set;

pub use sorted_set::SortedSet;

use bytes::Bytes;

/// A typed value owned by a keyspace entry.
#[derive(Debug, Clone)]
pub enum Value {
    /// Binary-safe string.
    String(Bytes),
    /// Sorted set of (member, score) pairs.
    SortedSet(SortedSet),
}

impl Value {
    /// Short type name, used in log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::SortedSet(_) => "zset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Value::String(Bytes::from_static(b"x")).type_name(), "string");
        assert_eq!(Value::SortedSet(SortedSet::new()).type_name(), "zset");
    }
}
