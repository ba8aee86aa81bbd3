//! Shared query parameter types for API handlers.

use coursepath_core::error::CoreError;
use coursepath_core::progress::ProgressSource;
use serde::Deserialize;

/// Progress source selector (`?source=ledger|resource_view`).
///
/// Omitting the parameter selects the ledger source.
#[derive(Debug, Deserialize)]
pub struct SourceParams {
    pub source: Option<String>,
}

impl SourceParams {
    /// Parse the requested source, rejecting unknown values.
    pub fn resolve(&self) -> Result<ProgressSource, CoreError> {
        match self.source.as_deref() {
            None => Ok(ProgressSource::default()),
            Some(s) => ProgressSource::from_str_value(s),
        }
    }
}
