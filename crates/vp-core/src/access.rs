//! Single-owner authorization for protected operations.
//!
//! The gate only compares principals; authenticating them is the host's job.

use serde::{Deserialize, Serialize};
use vp_common::{Error, Principal, Result};

/// Holder of the single authorized principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGate {
    owner: Principal,
}

impl AccessGate {
    pub fn new(owner: Principal) -> Self {
        AccessGate { owner }
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn is_owner(&self, caller: &Principal) -> bool {
        &self.owner == caller
    }

    /// Fail with `Unauthorized` unless `caller` holds the gate.
    pub fn authorize(&self, caller: &Principal) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(Error::Unauthorized {
                caller: caller.to_string(),
            })
        }
    }

    /// Hand the gate to `new_owner`. Returns the gate after the transfer;
    /// `self` is left untouched so the caller decides when to commit.
    pub fn transfer(&self, caller: &Principal, new_owner: Principal) -> Result<AccessGate> {
        self.authorize(caller)?;
        Ok(AccessGate::new(new_owner))
    }
}
