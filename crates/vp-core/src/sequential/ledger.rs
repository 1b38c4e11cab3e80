//! Append-only, deduplicated evidence history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vp_common::{Error, Result};
use vp_math::LikelihoodRatio;

/// One accepted evidence submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: String,
    pub ratio: LikelihoodRatio,
}

/// Ordered evidence ledger with an identifier index.
///
/// Identifiers are compared byte-for-byte. Deserialization rejects a
/// persisted ledger that contains the same identifier twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EvidenceRecord>", into = "Vec<EvidenceRecord>")]
pub struct EvidenceLedger {
    records: Vec<EvidenceRecord>,
    index: BTreeSet<String>,
}

impl EvidenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Append a record. Fails with `DuplicateEvidence` and leaves the ledger
    /// untouched if the identifier is already present.
    pub fn append(&mut self, record: EvidenceRecord) -> Result<()> {
        if self.index.contains(&record.id) {
            return Err(Error::DuplicateEvidence { id: record.id });
        }
        self.index.insert(record.id.clone());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&EvidenceRecord> {
        self.records.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.records.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.records.iter()
    }
}

impl TryFrom<Vec<EvidenceRecord>> for EvidenceLedger {
    type Error = Error;

    fn try_from(records: Vec<EvidenceRecord>) -> Result<Self> {
        let mut ledger = EvidenceLedger::new();
        for record in records {
            ledger.append(record)?;
        }
        Ok(ledger)
    }
}

impl From<EvidenceLedger> for Vec<EvidenceRecord> {
    fn from(ledger: EvidenceLedger) -> Self {
        ledger.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, ratio: u32) -> EvidenceRecord {
        EvidenceRecord {
            id: id.to_string(),
            ratio: LikelihoodRatio::new(ratio),
        }
    }

    #[test]
    fn append_preserves_order() {
        let mut ledger = EvidenceLedger::new();
        ledger.append(record("b", 10)).unwrap();
        ledger.append(record("a", 20)).unwrap();
        let ids: Vec<&str> = ledger.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(ledger.get(1).unwrap().ratio, LikelihoodRatio::new(20));
    }

    #[test]
    fn duplicate_is_rejected_without_mutation() {
        let mut ledger = EvidenceLedger::new();
        ledger.append(record("visit-1", 150)).unwrap();
        let before = ledger.clone();
        let err = ledger.append(record("visit-1", 50)).unwrap_err();
        assert!(matches!(err, Error::DuplicateEvidence { ref id } if id == "visit-1"));
        assert_eq!(ledger, before);
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let mut ledger = EvidenceLedger::new();
        ledger.append(record("Proximity", 100)).unwrap();
        assert!(ledger.append(record("proximity", 100)).is_ok());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn out_of_range_index() {
        let mut ledger = EvidenceLedger::new();
        ledger.append(record("a", 1)).unwrap();
        let err = ledger.get(1).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 1, len: 1 }));
    }

    #[test]
    fn deserialize_rejects_duplicates() {
        let json = r#"[{"id":"a","ratio":100},{"id":"a","ratio":200}]"#;
        let err = serde_json::from_str::<EvidenceLedger>(json).unwrap_err();
        assert!(err.to_string().contains("already submitted"));
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut ledger = EvidenceLedger::new();
        ledger.append(record("a", 100)).unwrap();
        assert_eq!(
            serde_json::to_string(&ledger).unwrap(),
            r#"[{"id":"a","ratio":100}]"#
        );
    }
}
