use thiserror::Error;

use super::types::DocumentFamily;

/// Failure of one document unit. Absence of a unit is not an error and is
/// reported as `Ok(None)` by the locator and assemblers instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("{family} {key}: required anchor `{anchor}` not found")]
    AnchorNotFound {
        family: DocumentFamily,
        key: String,
        anchor: String,
    },
}

impl UnitError {
    pub fn anchor_not_found(
        family: DocumentFamily,
        key: Option<&str>,
        anchor: impl Into<String>,
    ) -> Self {
        UnitError::AnchorNotFound {
            family,
            key: key.unwrap_or("*").to_string(),
            anchor: anchor.into(),
        }
    }

    pub fn family(&self) -> DocumentFamily {
        match self {
            UnitError::AnchorNotFound { family, .. } => *family,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            UnitError::AnchorNotFound { key, .. } => key,
        }
    }
}
