//! Shared-content registry (`content.map`).
//!
//! Contents flagged as shared are stored once on the installation medium
//! under `shared1/` and referenced from every title that uses them. The
//! registry is an append-only sequence of 28-byte records: an 8-byte
//! ASCII name followed by the content's 20-byte SHA-1. Lookups take the
//! first hash match; the format has no collision handling.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::WadError;

/// Size of one registry record on disk.
pub const RECORD_SIZE: usize = 28;

/// One shared-content record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedContent {
    pub name: [u8; 8],
    pub hash: [u8; 20],
}

impl SharedContent {
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// In-memory copy of a shared-content registry.
#[derive(Clone, Debug, Default)]
pub struct ContentMap {
    entries: Vec<SharedContent>,
}

impl ContentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the registry. A trailing partial record (the residue of an
    /// interrupted append) is ignored.
    pub fn parse(data: &[u8]) -> Self {
        let entries = data
            .chunks_exact(RECORD_SIZE)
            .map(|rec| SharedContent {
                name: rec[..8].try_into().unwrap(),
                hash: rec[8..].try_into().unwrap(),
            })
            .collect();
        Self { entries }
    }

    /// Loads the registry file; a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, WadError> {
        match std::fs::read(path) {
            Ok(data) => Ok(Self::parse(&data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn entries(&self) -> &[SharedContent] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the stored asset with this hash, first match wins.
    pub fn lookup(&self, hash: &[u8; 20]) -> Option<String> {
        self.entries
            .iter()
            .find(|e| &e.hash == hash)
            .map(SharedContent::name_str)
    }

    pub fn contains(&self, hash: &[u8; 20]) -> bool {
        self.entries.iter().any(|e| &e.hash == hash)
    }

    /// Allocates the next free asset name: the last record's name parsed
    /// as a decimal integer, incremented, re-rendered as 8 zero-padded
    /// digits. The registry defines no first name, so an empty (or
    /// unparseable) registry cannot allocate and the caller must seed it.
    pub fn allocate_name(&self) -> Result<String, WadError> {
        let last = self.entries.last().ok_or(WadError::MapExhausted)?;
        let name = std::str::from_utf8(&last.name).map_err(|_| WadError::MapExhausted)?;
        let n: u32 = name.parse().map_err(|_| WadError::MapExhausted)?;
        Ok(format!("{:08}", n + 1))
    }

    /// Appends one record in memory. This is the registry's only mutation
    /// and is never rolled back.
    pub fn append(&mut self, name: [u8; 8], hash: [u8; 20]) {
        self.entries.push(SharedContent { name, hash });
    }

    /// Renders the registry back to its on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * RECORD_SIZE);
        for e in &self.entries {
            out.extend_from_slice(&e.name);
            out.extend_from_slice(&e.hash);
        }
        out
    }
}

/// Appends one record to the registry file, creating it if needed.
pub fn append_record(path: &Path, name: &str, hash: &[u8; 20]) -> Result<(), WadError> {
    let mut name_bytes = [0u8; 8];
    let n = name.len().min(8);
    name_bytes[..n].copy_from_slice(&name.as_bytes()[..n]);

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&name_bytes)?;
    file.write_all(hash)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(names: &[&str]) -> ContentMap {
        let mut map = ContentMap::new();
        for (i, name) in names.iter().enumerate() {
            let mut n = [0u8; 8];
            n.copy_from_slice(name.as_bytes());
            map.append(n, [i as u8; 20]);
        }
        map
    }

    #[test]
    fn allocates_the_next_decimal_name() {
        let map = map_with(&["00000000", "00000041"]);
        assert_eq!(map.allocate_name().unwrap(), "00000042");
    }

    #[test]
    fn empty_registry_cannot_allocate() {
        assert!(matches!(
            ContentMap::new().allocate_name(),
            Err(WadError::MapExhausted)
        ));
    }

    #[test]
    fn lookup_returns_first_match() {
        let mut map = map_with(&["00000000", "00000001"]);
        // Duplicate hash: the earlier record wins, by design.
        map.append(*b"00000002", [0u8; 20]);
        assert_eq!(map.lookup(&[0u8; 20]).unwrap(), "00000000");
        assert_eq!(map.lookup(&[1u8; 20]).unwrap(), "00000001");
        assert!(map.lookup(&[9u8; 20]).is_none());
        assert!(map.contains(&[1u8; 20]));
    }

    #[test]
    fn parse_ignores_a_trailing_partial_record() {
        let mut data = map_with(&["00000007"]).to_bytes();
        data.extend_from_slice(&[1, 2, 3]);
        let map = ContentMap::parse(&data);
        assert_eq!(map.entries().len(), 1);
        assert_eq!(map.entries()[0].name_str(), "00000007");
    }

    #[test]
    fn round_trips_through_bytes() {
        let map = map_with(&["00000000", "00000001"]);
        let again = ContentMap::parse(&map.to_bytes());
        assert_eq!(again.entries(), map.entries());
    }
}
