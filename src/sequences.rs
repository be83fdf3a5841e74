//! Saved sequence registry
//!
//! An ordered list of named byte payloads available for one-click resend.
//! Entries are loaded once at session start from a JSON file of two-element
//! `[label, sequence-text]` records, where `sequence-text` uses the
//! [`crate::codec`] escape grammar. Decoding happens at load time, so a
//! malformed entry aborts the whole load and the registry stays unchanged.

use crate::codec;
use crate::error::{PortScopeError, Result, ResultExt};
use std::path::Path;

/// A named, pre-decoded byte payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub label: String,
    pub raw: Vec<u8>,
}

/// Append-only, insertion-ordered list of saved sequences
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    entries: Vec<SequenceEntry>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and append `(label, sequence-text)` pairs
    ///
    /// All-or-nothing: if any entry fails to decode, nothing is appended
    /// and the codec error is returned with the offending label as context.
    pub fn load<L, S>(&mut self, pairs: &[(L, S)]) -> Result<()>
    where
        L: AsRef<str>,
        S: AsRef<str>,
    {
        let mut decoded = Vec::with_capacity(pairs.len());
        for (label, text) in pairs {
            let raw = codec::parse(text.as_ref())
                .with_context(|| format!("sequence {:?}", label.as_ref()))?;
            decoded.push(SequenceEntry {
                label: label.as_ref().to_string(),
                raw,
            });
        }
        self.entries.extend(decoded);
        Ok(())
    }

    /// Load a JSON file of `[label, sequence-text]` records
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PortScopeError::Sequence(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let pairs: Vec<(String, String)> = serde_json::from_str(&contents).map_err(|e| {
            PortScopeError::Sequence(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        self.load(&pairs)
    }

    /// Decoded payload at `index`, in insertion order
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|e| e.raw.as_slice())
    }

    /// Label at `index`, in insertion order
    pub fn label(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SequenceEntry> {
        self.entries.iter()
    }
}
