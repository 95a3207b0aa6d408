//! Core data types shared across the corpus, mutators, and the wire protocol.

use std::fmt;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// A guest virtual address, as reported by the Backend.
pub type Gva = u64;

/// The set of guest virtual addresses newly executed during one run.
pub type CoverageSet = HashSet<Gva>;

/// An owned candidate input. Immutable once constructed; identity is the
/// BLAKE3 hex digest over its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testcase {
    buffer: Vec<u8>,
}

impl Testcase {
    /// Wraps `buffer` as a new testcase.
    #[must_use]
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    /// The testcase bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// The testcase size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the testcase is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The BLAKE3 hex digest of this testcase's bytes; used as its identity
    /// and as the basis of its on-disk filename.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        blake3::hash(&self.buffer).to_hex().to_string()
    }

    /// Consumes `self`, returning the owned buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl From<Vec<u8>> for Testcase {
    fn from(buffer: Vec<u8>) -> Self {
        Self::new(buffer)
    }
}

/// The terminal classification of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The run hit the boundary breakpoint and completed normally.
    Ok,
    /// The snapshot executed a context switch (guest cr3 changed).
    /// Terminal, but not considered a bug.
    Cr3Change,
    /// The run was terminated by a detected crash. `name` may be empty, in
    /// which case the crash is not persisted to disk.
    Crash(String),
    /// The run exceeded the configured execution budget.
    Timedout,
}

impl Verdict {
    /// The short tag used as a filename prefix and in stats lines.
    /// `Ok` has no tag (empty string), matching the on-disk naming rule.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Verdict::Ok => "",
            Verdict::Cr3Change => "Cr3Change",
            Verdict::Crash(_) => "Crash",
            Verdict::Timedout => "Timedout",
        }
    }

    /// The crash name, if this is a named `Crash` verdict.
    #[must_use]
    pub fn crash_name(&self) -> Option<&str> {
        match self {
            Verdict::Crash(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ok => write!(f, "Ok"),
            Verdict::Cr3Change => write!(f, "Cr3Change"),
            Verdict::Crash(name) => write!(f, "Crash({name})"),
            Verdict::Timedout => write!(f, "Timedout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_same_bytes() {
        let a = Testcase::new(b"hello".to_vec());
        let b = Testcase::new(b"hello".to_vec());
        assert_eq!(a.hash_hex(), b.hash_hex());
    }

    #[test]
    fn hash_differs_for_different_bytes() {
        let a = Testcase::new(b"hello".to_vec());
        let b = Testcase::new(b"world".to_vec());
        assert_ne!(a.hash_hex(), b.hash_hex());
    }

    #[test]
    fn ok_tag_is_empty() {
        assert_eq!(Verdict::Ok.tag(), "");
        assert_eq!(Verdict::Cr3Change.tag(), "Cr3Change");
    }

    #[test]
    fn empty_crash_name_is_not_persisted() {
        assert_eq!(Verdict::Crash(String::new()).crash_name(), None);
        assert_eq!(
            Verdict::Crash("bug-1".to_string()).crash_name(),
            Some("bug-1")
        );
    }
}
