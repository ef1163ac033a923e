//! Crate-wide error taxonomy (spec.md §7). Small, closed, hand-written
//! `Display` impls rather than a derive crate — none of the reference pack
//! reaches for one at this scale, so this stays consistent with the
//! teacher's own plain-`Result` texture while still giving callers
//! matchable variants instead of a bare `String`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AeError {
    /// `register`/`create_file_event` on an fd at or beyond the loop's
    /// configured capacity.
    SetSizeExceeded { fd: i32, setsize: usize },
    /// The polling backend reported a fatal (non-interrupted) failure.
    Backend(String),
    /// `delete_timer` given an id that does not name a live timer.
    UnknownTimer(i64),
}

impl fmt::Display for AeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetSizeExceeded { fd, setsize } => {
                write!(f, "fd {fd} exceeds event loop capacity ({setsize})")
            }
            Self::Backend(msg) => write!(f, "polling backend error: {msg}"),
            Self::UnknownTimer(id) => write!(f, "no timer with id {id}"),
        }
    }
}

impl std::error::Error for AeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    /// `add` on a key that already has a live entry.
    KeyExists,
    /// `delete`/`unlink`/`find` targeting a key with no live entry.
    NotFound,
    /// Table (re)allocation failed.
    AllocationFailed,
    /// An unsafe iterator detected that the dictionary was mutated during
    /// iteration. Surfaced as a variant for documentation, but the
    /// iterator's `Drop` panics with this rather than returning it: it
    /// classifies as a contract violation that should abort the process,
    /// not a recoverable error.
    FingerprintMismatch,
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyExists => write!(f, "key already exists"),
            Self::NotFound => write!(f, "no such key"),
            Self::AllocationFailed => write!(f, "hash table allocation failed"),
            Self::FingerprintMismatch => {
                write!(f, "dictionary mutated during unsafe iteration")
            }
        }
    }
}

impl std::error::Error for DictError {}
