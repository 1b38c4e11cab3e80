//! Configuration validation errors and semantic validation.

use crate::engine::EngineSettings;
use crate::priors::{ClassParams, Priors};
use thiserror::Error;
use vp_common::VisitClass;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

impl From<ValidationError> for vp_common::Error {
    fn from(err: ValidationError) -> Self {
        vp_common::Error::InvalidPriors(err.to_string())
    }
}

/// Validate priors configuration semantically.
///
/// Integer tables must be exact: class priors sum to `scale`, each class's
/// proximity distribution sums to `scale`, and no entry exceeds `scale`.
pub fn validate_priors(priors: &Priors) -> ValidationResult<()> {
    check_version(&priors.schema_version)?;

    if priors.scale == 0 {
        return Err(ValidationError::InvalidValue {
            field: "scale".to_string(),
            message: "Must be > 0".to_string(),
        });
    }

    let prior_sum = u64::from(priors.classes.pph.prior) + u64::from(priors.classes.ppr.prior);
    if prior_sum != u64::from(priors.scale) {
        return Err(ValidationError::SemanticError(format!(
            "Class priors must sum to scale {}, got {} (pph={}, ppr={})",
            priors.scale, prior_sum, priors.classes.pph.prior, priors.classes.ppr.prior,
        )));
    }

    for class in VisitClass::ALL {
        validate_class_params(class.label(), priors.class(class), priors.scale)?;
    }

    Ok(())
}

/// Validate a single class's parameters.
fn validate_class_params(name: &str, params: &ClassParams, scale: u32) -> ValidationResult<()> {
    check_probability(&format!("classes.{}.prior", name), params.prior, scale)?;
    check_probability(
        &format!("classes.{}.confirmation", name),
        params.confirmation,
        scale,
    )?;
    check_probability(
        &format!("classes.{}.prescription", name),
        params.prescription,
        scale,
    )?;
    check_probability(
        &format!("classes.{}.device_data", name),
        params.device_data,
        scale,
    )?;

    for (bucket, value) in params.proximity.entries() {
        check_probability(
            &format!("classes.{}.proximity.{}", name, bucket),
            value,
            scale,
        )?;
    }

    let total = params.proximity.total();
    if total != u64::from(scale) {
        return Err(ValidationError::SemanticError(format!(
            "classes.{}.proximity must sum to scale {}, got {}",
            name, scale, total
        )));
    }

    Ok(())
}

/// Validate engine settings semantically.
pub fn validate_engine_settings(settings: &EngineSettings) -> ValidationResult<()> {
    check_version(&settings.schema_version)?;

    if settings.max_workload_iterations == 0 {
        return Err(ValidationError::InvalidValue {
            field: "max_workload_iterations".to_string(),
            message: "Must be >= 1".to_string(),
        });
    }

    Ok(())
}

fn check_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn check_probability(field: &str, value: u32, scale: u32) -> ValidationResult<()> {
    if value > scale {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in [0, {}], got {}", scale, value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;

    #[test]
    fn defaults_validate() {
        assert!(validate_priors(&Priors::default()).is_ok());
        assert!(validate_engine_settings(&EngineSettings::default()).is_ok());
    }

    #[test]
    fn version_mismatch_is_reported() {
        let priors = Priors {
            schema_version: "0.9.0".to_string(),
            ..Priors::default()
        };
        let err = validate_priors(&priors).unwrap_err();
        assert_eq!(err.code(), 66);
        assert!(err.to_string().contains("0.9.0"));
    }

    #[test]
    fn priors_must_sum_to_scale() {
        let mut priors = Priors::default();
        priors.classes.ppr.prior = 41;
        let err = validate_priors(&priors).unwrap_err();
        assert!(matches!(err, ValidationError::SemanticError(_)));
        assert!(err.to_string().contains("got 101"));
    }

    #[test]
    fn entry_above_scale_is_rejected() {
        let mut priors = Priors::default();
        priors.classes.pph.confirmation = 101;
        let err = validate_priors(&priors).unwrap_err();
        match err {
            ValidationError::InvalidValue { field, .. } => {
                assert_eq!(field, "classes.pph.confirmation");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn proximity_distribution_must_sum_to_scale() {
        let mut priors = Priors::default();
        priors.classes.ppr.proximity.far = 59;
        let err = validate_priors(&priors).unwrap_err();
        assert!(err.to_string().contains("classes.ppr.proximity"));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let priors = Priors {
            scale: 0,
            ..Priors::default()
        };
        let err = validate_priors(&priors).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "scale"));
    }

    #[test]
    fn zero_workload_cap_is_rejected() {
        let settings = EngineSettings {
            max_workload_iterations: 0,
            ..EngineSettings::default()
        };
        assert!(validate_engine_settings(&settings).is_err());
    }

    #[test]
    fn converts_into_common_error() {
        let err: vp_common::Error = ValidationError::ParseError("bad".into()).into();
        assert_eq!(err.code(), 11);
    }
}
