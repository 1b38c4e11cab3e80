//! Engine behavior over the file-backed store and the JSONL audit log.

use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use tempfile::TempDir;
use vp_common::{Error, Principal};
use vp_config::priors::ClassParams;
use vp_config::{EngineSettings, Priors, Tenancy};
use vp_core::audit::{
    audit_path_in, verify_log, AuditEntry, AuditError, AuditSink, JsonlAuditLog,
};
use vp_core::store::{JsonFileStore, StateKey, StateStore};
use vp_core::{Engine, EvidenceVector, InvocationContext, Proximity};
use vp_math::{LikelihoodRatio, Probability};

fn ctx(caller: &str) -> InvocationContext {
    InvocationContext::new(
        Principal::from(caller),
        Utc.with_ymd_and_hms(2026, 6, 2, 10, 15, 0).unwrap(),
    )
}

fn open(root: &std::path::Path, settings: EngineSettings) -> Engine<JsonFileStore, JsonlAuditLog> {
    let store = JsonFileStore::new(root);
    let sink = JsonlAuditLog::open(audit_path_in(root)).unwrap();
    Engine::new(Priors::default(), settings, store, sink).unwrap()
}

/// The default tables expressed in basis points instead of percent.
fn default_priors_in_basis_points() -> Priors {
    fn rescale(params: &mut ClassParams) {
        params.prior *= 100;
        params.proximity.very_close *= 100;
        params.proximity.close *= 100;
        params.proximity.near *= 100;
        params.proximity.far *= 100;
        params.confirmation *= 100;
        params.prescription *= 100;
        params.device_data *= 100;
    }

    let mut priors = Priors::default();
    priors.scale = 10_000;
    rescale(&mut priors.classes.pph);
    rescale(&mut priors.classes.ppr);
    priors
}

/// Sink that refuses every batch.
struct RefusingSink;

impl AuditSink for RefusingSink {
    fn publish(&mut self, _batch: Vec<AuditEntry>) -> Result<(), AuditError> {
        Err(AuditError::Io {
            path: PathBuf::from("/dev/full"),
            source: std::io::Error::other("disk full"),
        })
    }
}

#[test]
fn state_and_chain_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let admin = ctx("admin");

    {
        let mut engine = open(tmp.path(), EngineSettings::default());
        engine.initialize(&admin, Principal::from("admin")).unwrap();
        engine
            .submit_evidence(&admin, "visit-1", LikelihoodRatio::new(300))
            .unwrap();
        engine
            .predict_visit(&admin, &EvidenceVector::new().with_proximity(Proximity::Far))
            .unwrap();
        assert_eq!(engine.sink().entry_count(), 5);
    }

    let mut engine = open(tmp.path(), EngineSettings::default());
    assert_eq!(engine.owner().unwrap(), Some(Principal::from("admin")));
    let state = engine.model_state(&admin).unwrap();
    assert_eq!(state.posterior, Probability::new(75));
    assert_eq!(state.step, 1);

    // Chain resumes where the first engine stopped.
    assert_eq!(engine.sink().entry_count(), 5);
    engine
        .submit_evidence(&admin, "visit-2", LikelihoodRatio::new(100))
        .unwrap();
    assert!(matches!(
        engine.submit_evidence(&admin, "visit-1", LikelihoodRatio::new(100)),
        Err(Error::DuplicateEvidence { .. })
    ));

    let report = verify_log(&audit_path_in(tmp.path())).unwrap();
    assert!(report.is_valid);
    assert_eq!(report.entries_verified, 7);
    assert!(report.tampered_entries.is_empty());
}

#[test]
fn per_caller_models_get_separate_files() {
    let tmp = TempDir::new().unwrap();
    let settings = EngineSettings {
        tenancy: Tenancy::PerCaller,
        ..EngineSettings::default()
    };
    let mut engine = open(tmp.path(), settings);
    engine
        .initialize(&ctx("admin"), Principal::from("admin"))
        .unwrap();

    engine
        .submit_evidence(&ctx("dr-a"), "x", LikelihoodRatio::new(300))
        .unwrap();
    engine
        .submit_evidence(&ctx("dr-b"), "x", LikelihoodRatio::new(25))
        .unwrap();

    let store = engine.store();
    let a = StateKey::Caller(Principal::from("dr-a"));
    let b = StateKey::Caller(Principal::from("dr-b"));
    assert!(store.model_path(&a).exists());
    assert!(store.model_path(&b).exists());
    assert!(!store.model_path(&StateKey::Global).exists());
    assert_ne!(store.model_path(&a), store.model_path(&b));

    assert_eq!(
        store.load_model(&a).unwrap().unwrap().posterior,
        Probability::new(75)
    );
    assert_eq!(
        store.load_model(&b).unwrap().unwrap().posterior,
        Probability::new(19)
    );
}

#[test]
fn refused_audit_rolls_back_new_model() {
    let tmp = TempDir::new().unwrap();
    let mut store = JsonFileStore::new(tmp.path());
    store.save_owner(&Principal::from("admin")).unwrap();

    let mut engine =
        Engine::new(Priors::default(), EngineSettings::default(), store, RefusingSink).unwrap();
    let err = engine
        .submit_evidence(&ctx("admin"), "visit-1", LikelihoodRatio::new(300))
        .unwrap_err();
    assert!(matches!(err, Error::Audit(_)));

    assert!(engine.store().load_model(&StateKey::Global).unwrap().is_none());
    assert!(!engine.store().model_path(&StateKey::Global).exists());
}

#[test]
fn refused_audit_restores_previous_model() {
    let tmp = TempDir::new().unwrap();
    let admin = ctx("admin");
    {
        let mut engine = open(tmp.path(), EngineSettings::default());
        engine.initialize(&admin, Principal::from("admin")).unwrap();
        engine
            .submit_evidence(&admin, "visit-1", LikelihoodRatio::new(300))
            .unwrap();
    }

    let store = JsonFileStore::new(tmp.path());
    let before = store.load_model(&StateKey::Global).unwrap().unwrap();
    let mut engine =
        Engine::new(Priors::default(), EngineSettings::default(), store, RefusingSink).unwrap();

    assert!(engine.reset_model(&admin, 10).is_err());
    assert!(engine
        .submit_evidence(&admin, "visit-2", LikelihoodRatio::new(300))
        .is_err());

    let after = engine.store().load_model(&StateKey::Global).unwrap().unwrap();
    assert_eq!(after, before);
}

#[test]
fn refused_audit_undoes_ownership_changes() {
    let tmp = TempDir::new().unwrap();
    let mut engine = Engine::new(
        Priors::default(),
        EngineSettings::default(),
        JsonFileStore::new(tmp.path()),
        RefusingSink,
    )
    .unwrap();

    assert!(engine
        .initialize(&ctx("admin"), Principal::from("admin"))
        .is_err());
    assert_eq!(engine.owner().unwrap(), None);

    JsonFileStore::new(tmp.path())
        .save_owner(&Principal::from("admin"))
        .unwrap();
    assert!(engine
        .transfer_ownership(&ctx("admin"), Principal::from("dr-b"))
        .is_err());
    assert_eq!(engine.owner().unwrap(), Some(Principal::from("admin")));
}

#[test]
fn tampering_is_detected_after_the_fact() {
    let tmp = TempDir::new().unwrap();
    let admin = ctx("admin");
    {
        let mut engine = open(tmp.path(), EngineSettings::default());
        engine.initialize(&admin, Principal::from("admin")).unwrap();
        engine.reset_model(&admin, 30).unwrap();
    }

    let path = audit_path_in(tmp.path());
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"prior\":30", "\"prior\":90")).unwrap();

    let report = verify_log(&path).unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.tampered_entries.len(), 1);
    assert_eq!(report.tampered_entries[0].kind, "model_reset");
}

#[test]
fn reopening_under_another_scale_is_refused() {
    let tmp = TempDir::new().unwrap();
    let admin = ctx("admin");
    {
        let mut engine = open(tmp.path(), EngineSettings::default());
        engine.initialize(&admin, Principal::from("admin")).unwrap();
        let state = engine
            .submit_evidence(&admin, "a", LikelihoodRatio::new(300))
            .unwrap();
        assert_eq!(state.posterior, Probability::new(75));
    }

    let store = JsonFileStore::new(tmp.path());
    let sink = JsonlAuditLog::open(audit_path_in(tmp.path())).unwrap();
    let mut engine = Engine::new(
        default_priors_in_basis_points(),
        EngineSettings::default(),
        store,
        sink,
    )
    .unwrap();

    let err = engine.model_state(&admin).unwrap_err();
    assert!(matches!(
        err,
        Error::ScaleMismatch {
            stored: 100,
            configured: 10_000
        }
    ));
    assert!(matches!(
        engine.submit_evidence(&admin, "b", LikelihoodRatio::new(30_000)),
        Err(Error::ScaleMismatch { .. })
    ));

    // Nothing was written: the stored model and the chain are as they were.
    let stored = engine.store().load_model(&StateKey::Global).unwrap().unwrap();
    assert_eq!(stored.scale, 100);
    assert_eq!(stored.posterior, Probability::new(75));
    assert_eq!(verify_log(&audit_path_in(tmp.path())).unwrap().entries_verified, 3);
}
