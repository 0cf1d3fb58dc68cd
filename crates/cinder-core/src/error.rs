//! Error types for the storage engine.

use thiserror::Error;

/// The operation was attempted on a key holding a value of the wrong
/// type, e.g. a sorted-set command against a string key.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Key holds wrong type")]
pub struct WrongType;
