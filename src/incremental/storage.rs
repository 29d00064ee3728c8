//! Binary snapshot storage
//!
//! File format:
//! - Header (64 bytes): magic, version, counts, creation time
//! - Per root: root path, file count
//! - Per file: relative path, 16-byte digest, six fact lists
//!
//! Strings are length-prefixed UTF-8 (u32 LE), lists are count-prefixed.
//! The fact lists are, in order: includes (as spelled, `"x.h"` or `<x.h>`),
//! implemented names, inherited names, classes, free functions and used
//! namespaces; names are stored joined with `::`.
//!
//! @module incremental/storage

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, info, warn};

use super::snapshot::{FileSnapshot, RootSnapshot, Snapshot};
use crate::core::error::{Error, Result};
use crate::scan::{FileRecord, IncludeDirective, QualifiedName};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Magic bytes identifying testscope snapshot files
const MAGIC: [u8; 8] = *b"TSCOPE01";

/// Current file format version
const VERSION: u32 = 1;

/// Header size in bytes
const HEADER_SIZE: usize = 64;

// =============================================================================
// FILE HEADER
// =============================================================================

/// Layout (64 bytes, little endian):
/// - magic: [u8; 8]
/// - version: u32
/// - root_count: u32
/// - file_count: u32
/// - _reserved: u32
/// - created_at: i64
/// - _padding: [u8; 32]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    magic: [u8; 8],
    version: u32,
    root_count: u32,
    file_count: u32,
    created_at: i64,
}

impl Header {
    fn new(snapshot: &Snapshot) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            root_count: snapshot.roots.len() as u32,
            file_count: snapshot.file_count() as u32,
            created_at: snapshot.created_at,
        }
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.root_count.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.file_count.to_le_bytes());
        bytes[24..32].copy_from_slice(&self.created_at.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::SnapshotError {
                message: "Invalid snapshot file (header too small)".into(),
            });
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);
        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut created_at = [0u8; 8];
        created_at.copy_from_slice(&bytes[24..32]);

        let header = Self {
            magic,
            version: u32_at(8),
            root_count: u32_at(12),
            file_count: u32_at(16),
            created_at: i64::from_le_bytes(created_at),
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(Error::SnapshotError {
                message: "Invalid snapshot file (bad magic)".into(),
            });
        }
        if self.version != VERSION {
            return Err(Error::SnapshotError {
                message: format!(
                    "Unsupported snapshot version {} (expected {})",
                    self.version, VERSION
                ),
            });
        }
        Ok(())
    }
}

// =============================================================================
// SAVE
// =============================================================================

/// Write a snapshot to `path`
pub fn save_snapshot(snapshot: &Snapshot, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);

    writer.write_all(&Header::new(snapshot).to_bytes())?;

    for root in &snapshot.roots {
        write_str(&mut writer, &root.path)?;
        write_u32(&mut writer, root.files.len() as u32)?;
        for file in &root.files {
            write_str(&mut writer, &file.path)?;
            writer.write_all(&file.digest.to_le_bytes())?;
            write_record(&mut writer, &file.record)?;
        }
    }

    writer.flush()?;
    debug!(path = %path.display(), files = snapshot.file_count(), "Snapshot saved");
    Ok(())
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    write_u32(writer, s.len() as u32)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

fn write_list<W: Write, I>(writer: &mut W, items: I) -> Result<()>
where
    I: ExactSizeIterator<Item = String>,
{
    write_u32(writer, items.len() as u32)?;
    for item in items {
        write_str(writer, &item)?;
    }
    Ok(())
}

fn write_record<W: Write>(writer: &mut W, record: &FileRecord) -> Result<()> {
    write_list(writer, record.includes.iter().map(|i| i.spelling()))?;
    write_list(writer, record.implements.iter().map(|n| n.join()))?;
    write_list(writer, record.inherits.iter().map(|n| n.join()))?;
    write_list(writer, record.classes.iter().map(|n| n.join()))?;
    write_list(writer, record.functions.iter().map(|n| n.join()))?;
    write_list(writer, record.using_namespaces.iter().map(|n| n.join()))?;
    Ok(())
}

// =============================================================================
// LOAD
// =============================================================================

/// Load a snapshot from `path`
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    let header = Header::from_bytes(&mmap)?;
    let mut reader = Reader {
        bytes: &mmap,
        offset: HEADER_SIZE,
    };

    let mut roots = Vec::with_capacity(header.root_count as usize);
    let mut file_count = 0usize;
    for _ in 0..header.root_count {
        let root_path = reader.read_str()?.to_string();
        let count = reader.read_u32()? as usize;
        let mut files = Vec::with_capacity(count.min(header.file_count as usize));
        for _ in 0..count {
            let path = reader.read_str()?.to_string();
            let digest = u128::from_le_bytes(reader.read_array::<16>()?);
            let record = reader.read_record()?;
            files.push(FileSnapshot {
                path,
                digest,
                record,
            });
        }
        file_count += files.len();
        roots.push(RootSnapshot {
            path: root_path,
            files,
        });
    }

    if file_count != header.file_count as usize {
        return Err(Error::SnapshotError {
            message: format!(
                "Snapshot file count mismatch (header {}, found {})",
                header.file_count, file_count
            ),
        });
    }

    Ok(Snapshot {
        created_at: header.created_at,
        roots,
    })
}

/// Load the previous run's snapshot. Absence or any read failure means
/// "no prior data".
pub fn load_previous(path: &Path) -> Option<Snapshot> {
    if !path.is_file() {
        info!(path = %path.display(), "No previous snapshot, every file is new");
        return None;
    }
    match load_snapshot(path) {
        Ok(snapshot) => {
            info!(
                path = %path.display(),
                files = snapshot.file_count(),
                "Loaded previous snapshot"
            );
            Some(snapshot)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable snapshot");
            None
        }
    }
}

/// Bounds-checked cursor over the mapped file
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(Error::SnapshotError {
                message: format!(
                    "Truncated snapshot file at offset {} (need {} bytes, have {})",
                    self.offset,
                    len,
                    self.bytes.len().saturating_sub(self.offset)
                ),
            });
        };
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_str(&mut self) -> Result<&'a str> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|e| Error::SnapshotError {
            message: format!("Invalid UTF-8 in snapshot: {}", e),
        })
    }

    fn read_list(&mut self) -> Result<Vec<&'a str>> {
        let count = self.read_u32()? as usize;
        // every entry needs at least its length prefix
        if count > self.bytes.len().saturating_sub(self.offset) / 4 {
            return Err(Error::SnapshotError {
                message: format!("Corrupt list length {} at offset {}", count, self.offset),
            });
        }
        (0..count).map(|_| self.read_str()).collect()
    }

    fn read_names(&mut self) -> Result<Vec<QualifiedName>> {
        Ok(self
            .read_list()?
            .into_iter()
            .map(QualifiedName::parse)
            .collect())
    }

    fn read_record(&mut self) -> Result<FileRecord> {
        let includes = self
            .read_list()?
            .into_iter()
            .map(IncludeDirective::from_spelling)
            .collect();
        Ok(FileRecord {
            includes,
            implements: self.read_names()?.into_iter().collect(),
            inherits: self.read_names()?.into_iter().collect(),
            classes: self.read_names()?.into_iter().collect(),
            functions: self.read_names()?.into_iter().collect(),
            using_namespaces: self.read_names()?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::IncludeKind;
    use tempfile::tempdir;

    fn sample() -> Snapshot {
        let mut record = FileRecord::default();
        record
            .includes
            .push(IncludeDirective::new("a/b.h", IncludeKind::Angled, 3));
        record
            .includes
            .push(IncludeDirective::new("local.h", IncludeKind::Quoted, 4));
        record.implements.insert(QualifiedName::parse("ns::Foo::operator()"));
        record.classes.insert(QualifiedName::parse("ns::Foo"));
        record.inherits.insert(QualifiedName::parse("Base"));
        record.functions.insert(QualifiedName::parse("ns::helper"));
        record.using_namespaces.push(QualifiedName::parse("std"));

        Snapshot {
            created_at: 1_700_000_000,
            roots: vec![
                RootSnapshot {
                    path: "src".into(),
                    files: vec![FileSnapshot {
                        path: "ns/foo.cpp".into(),
                        digest: u128::MAX - 7,
                        record,
                    }],
                },
                RootSnapshot {
                    path: "tests".into(),
                    files: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("testscope.snapshot");

        let original = sample();
        save_snapshot(&original, &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();

        assert_eq!(loaded.created_at, original.created_at);
        assert_eq!(loaded.roots.len(), 2);
        let file = &loaded.roots[0].files[0];
        assert_eq!(file.digest, u128::MAX - 7);

        // line numbers are not persisted
        let includes: Vec<String> = file.record.includes.iter().map(|i| i.spelling()).collect();
        assert_eq!(includes, vec!["<a/b.h>", "\"local.h\""]);
        assert_eq!(file.record.implements, original.roots[0].files[0].record.implements);
        assert_eq!(file.record.using_namespaces, original.roots[0].files[0].record.using_namespaces);
    }

    #[test]
    fn test_bad_magic_and_truncation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap");

        std::fs::write(&path, [0u8; 80]).unwrap();
        assert!(matches!(load_snapshot(&path), Err(Error::SnapshotError { .. })));

        save_snapshot(&sample(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();
        assert!(matches!(load_snapshot(&path), Err(Error::SnapshotError { .. })));
        assert!(load_previous(&path).is_none());
    }

    #[test]
    fn test_missing_snapshot_is_no_prior_data() {
        let dir = tempdir().unwrap();
        assert!(load_previous(&dir.path().join("absent")).is_none());
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap");
        let mut header = Header::new(&Snapshot::default()).to_bytes();
        header[8..12].copy_from_slice(&99u32.to_le_bytes());
        std::fs::write(&path, header).unwrap();
        assert!(load_snapshot(&path).is_err());
    }
}
