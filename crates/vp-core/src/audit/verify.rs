//! Audit log integrity verification.

use super::entry::AuditEntry;
use super::writer::GENESIS_HASH;
use super::AuditError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Result of hash chain verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_valid: bool,

    pub entries_verified: u64,

    /// SHA-256 over all entry hashes in order, or "empty".
    pub state_hash: String,

    /// First broken link in the chain, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_link: Option<BrokenLink>,

    /// Entries whose stored hash does not match their content.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tampered_entries: Vec<TamperedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokenLink {
    /// 1-indexed line number.
    pub line: usize,
    pub expected: String,
    pub actual: String,
    pub break_type: BreakType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    /// `prev_hash` does not match the previous entry's hash.
    ChainMismatch,
    /// The first entry does not start from genesis.
    InvalidGenesis,
    /// `seq` does not follow the previous entry's `seq`.
    SequenceGap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TamperedEntry {
    pub line: usize,
    pub seq: u64,
    pub stored_hash: String,
    pub computed_hash: String,
    pub kind: String,
}

/// Verify self-hashes, chain links and sequence numbers of a JSONL log.
///
/// A missing file is an empty, valid log. Only the first chain break is
/// reported; every tampered entry is.
pub fn verify_log(path: &Path) -> Result<VerificationResult, AuditError> {
    if !path.exists() {
        return Ok(VerificationResult {
            is_valid: true,
            entries_verified: 0,
            state_hash: "empty".to_string(),
            broken_link: None,
            tampered_entries: Vec::new(),
        });
    }

    let file = File::open(path).map_err(|e| AuditError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut entries_verified = 0u64;
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut prev_seq = 0u64;
    let mut broken_link: Option<BrokenLink> = None;
    let mut tampered_entries = Vec::new();
    let mut state = Sha256::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_num = idx + 1;
        let line = line.map_err(|e| AuditError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| AuditError::Parse {
            line: line_num,
            source: e,
        })?;

        if !entry.verify_hash() {
            tampered_entries.push(TamperedEntry {
                line: line_num,
                seq: entry.seq,
                stored_hash: entry.entry_hash.clone().unwrap_or_default(),
                computed_hash: entry.digest(),
                kind: entry.record.kind().to_string(),
            });
        }

        if broken_link.is_none() {
            if entry.prev_hash != prev_hash {
                let break_type = if entries_verified == 0 {
                    BreakType::InvalidGenesis
                } else {
                    BreakType::ChainMismatch
                };
                broken_link = Some(BrokenLink {
                    line: line_num,
                    expected: prev_hash.clone(),
                    actual: entry.prev_hash.clone(),
                    break_type,
                });
            } else if entry.seq != prev_seq + 1 {
                broken_link = Some(BrokenLink {
                    line: line_num,
                    expected: (prev_seq + 1).to_string(),
                    actual: entry.seq.to_string(),
                    break_type: BreakType::SequenceGap,
                });
            }
        }

        if let Some(ref hash) = entry.entry_hash {
            prev_hash = hash.clone();
            state.update(hash.as_bytes());
        }
        prev_seq = entry.seq;
        entries_verified += 1;
    }

    let state_hash = if entries_verified == 0 {
        "empty".to_string()
    } else {
        hex::encode(state.finalize())
    };

    Ok(VerificationResult {
        is_valid: broken_link.is_none() && tampered_entries.is_empty(),
        entries_verified,
        state_hash,
        broken_link,
        tampered_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditRecord, AuditSink, JsonlAuditLog};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use vp_common::Principal;

    fn write_log(dir: &Path, n: usize) -> std::path::PathBuf {
        let mut log = JsonlAuditLog::open_in_dir(dir).unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        for i in 0..n {
            log.publish(vec![AuditEntry::new(
                &Principal::from("owner"),
                ts,
                AuditRecord::OwnerInitialized {
                    owner: Principal::new(format!("owner-{i}")),
                },
            )])
            .unwrap();
        }
        log.path().to_path_buf()
    }

    #[test]
    fn missing_file_is_empty_and_valid() {
        let tmp = TempDir::new().unwrap();
        let result = verify_log(&tmp.path().join("none.jsonl")).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.state_hash, "empty");
    }

    #[test]
    fn valid_log_verifies() {
        let tmp = TempDir::new().unwrap();
        let path = write_log(tmp.path(), 3);
        let result = verify_log(&path).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.entries_verified, 3);
        assert_ne!(result.state_hash, "empty");
    }

    #[test]
    fn edited_entry_is_reported_as_tampered() {
        let tmp = TempDir::new().unwrap();
        let path = write_log(tmp.path(), 3);
        let content = std::fs::read_to_string(&path).unwrap();
        let edited = content.replacen("owner-1", "owner-X", 1);
        std::fs::write(&path, edited).unwrap();

        let result = verify_log(&path).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.tampered_entries.len(), 1);
        assert_eq!(result.tampered_entries[0].line, 2);
        assert_eq!(result.tampered_entries[0].kind, "owner_initialized");
    }

    #[test]
    fn removed_entry_breaks_chain() {
        let tmp = TempDir::new().unwrap();
        let path = write_log(tmp.path(), 3);
        let content = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content.lines().enumerate().filter(|(i, _)| *i != 1).map(|(_, l)| l).collect();
        std::fs::write(&path, kept.join("\n") + "\n").unwrap();

        let result = verify_log(&path).unwrap();
        assert!(!result.is_valid);
        let link = result.broken_link.unwrap();
        assert_eq!(link.line, 2);
        assert_eq!(link.break_type, BreakType::ChainMismatch);
    }

    #[test]
    fn truncated_head_is_invalid_genesis() {
        let tmp = TempDir::new().unwrap();
        let path = write_log(tmp.path(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        let second = content.lines().nth(1).unwrap().to_string();
        std::fs::write(&path, second + "\n").unwrap();

        let link = verify_log(&path).unwrap().broken_link.unwrap();
        assert_eq!(link.break_type, BreakType::InvalidGenesis);
    }

    #[test]
    fn garbage_line_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_log(tmp.path(), 1);
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        std::fs::write(&path, content).unwrap();
        assert!(matches!(
            verify_log(&path),
            Err(AuditError::Parse { line: 2, .. })
        ));
    }
}
