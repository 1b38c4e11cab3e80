//! Core math modules.

pub mod fixed;
pub mod growth;
