//! Audit sinks and the hash chain they maintain.

use super::entry::AuditEntry;
use super::{AuditError, AUDIT_LOG_FILENAME};
use crate::lock::lock_exclusive;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The special hash used for the first entry in a new log file.
pub const GENESIS_HASH: &str = "genesis";

/// Destination for committed audit batches.
///
/// `publish` is all-or-nothing: on error, none of the batch is visible and
/// the chain position is unchanged.
pub trait AuditSink {
    fn publish(&mut self, batch: Vec<AuditEntry>) -> Result<(), AuditError>;
}

/// Sequence number and last hash of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashChain {
    last_seq: u64,
    last_hash: String,
}

impl Default for HashChain {
    fn default() -> Self {
        HashChain {
            last_seq: 0,
            last_hash: GENESIS_HASH.to_string(),
        }
    }
}

impl HashChain {
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }

    /// Chain `entry` onto the end and return it with seq and hashes set.
    pub fn link(&mut self, mut entry: AuditEntry) -> AuditEntry {
        self.last_seq += 1;
        entry.seq = self.last_seq;
        entry.prev_hash = self.last_hash.clone();
        entry.compute_hash();
        self.last_hash = entry.hash().to_string();
        entry
    }
}

/// In-memory sink. Keeps every published entry, chained.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    chain: HashChain,
    entries: Vec<AuditEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }
}

impl AuditSink for MemorySink {
    fn publish(&mut self, batch: Vec<AuditEntry>) -> Result<(), AuditError> {
        for entry in batch {
            let linked = self.chain.link(entry);
            self.entries.push(linked);
        }
        Ok(())
    }
}

/// Hash-chained JSONL audit log on disk.
///
/// Each `publish` locks the file and chains onto whatever tail is on disk at
/// that moment, so several handles or processes extend one chain.
pub struct JsonlAuditLog {
    path: PathBuf,
    chain: HashChain,
}

impl JsonlAuditLog {
    /// Open an existing log, resuming its chain, or prepare a new one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuditError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let chain = match File::open(&path) {
            Ok(file) => Self::read_chain_tail(&path, file)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashChain::default(),
            Err(e) => return Err(AuditError::Io { path, source: e }),
        };

        Ok(JsonlAuditLog { path, chain })
    }

    /// Open `audit.jsonl` inside `dir`.
    pub fn open_in_dir(dir: &Path) -> Result<Self, AuditError> {
        Self::open(dir.join(AUDIT_LOG_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> u64 {
        self.chain.last_seq()
    }

    pub fn last_hash(&self) -> &str {
        self.chain.last_hash()
    }

    /// Chain position after the last entry in `reader`.
    fn read_chain_tail(path: &Path, reader: impl Read) -> Result<HashChain, AuditError> {
        let mut last: Option<(usize, String)> = None;
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|e| AuditError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            if !line.trim().is_empty() {
                last = Some((idx + 1, line));
            }
        }

        let mut chain = HashChain::default();
        if let Some((line_no, line)) = last {
            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| AuditError::Parse {
                line: line_no,
                source: e,
            })?;
            chain.last_seq = entry.seq;
            if let Some(hash) = entry.entry_hash {
                chain.last_hash = hash;
            }
        }
        Ok(chain)
    }
}

impl AuditSink for JsonlAuditLog {
    fn publish(&mut self, batch: Vec<AuditEntry>) -> Result<(), AuditError> {
        if batch.is_empty() {
            return Ok(());
        }

        let io_err = |e: std::io::Error| AuditError::Io {
            path: self.path.clone(),
            source: e,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        lock_exclusive(&file).map_err(io_err)?;

        // Another writer may have appended since this handle last looked.
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        let mut chain = Self::read_chain_tail(&self.path, &file)?;
        let committed_len = file.metadata().map_err(io_err)?.len();

        let mut buffer = String::new();
        for entry in batch {
            let linked = chain.link(entry);
            let line = serde_json::to_string(&linked)
                .map_err(|e| AuditError::Serialization { source: e })?;
            buffer.push_str(&line);
            buffer.push('\n');
        }

        // One write per batch, synced before it counts. On failure cut the
        // file back so no partial batch survives.
        let written = file
            .write_all(buffer.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_data());
        if let Err(e) = written {
            if let Err(truncate) = file.set_len(committed_len).and_then(|_| file.sync_data()) {
                return Err(AuditError::PartialBatch {
                    path: self.path.clone(),
                    source: e,
                    truncate,
                });
            }
            return Err(io_err(e));
        }

        self.chain = chain;
        Ok(())
    }
}
