//! Fallback generator

use super::{FallbackReason, Resolution};

/// Produces the fixed "insufficient information" answer
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    message: String,
}

impl FallbackGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Same text for every reason; only the tag differs
    pub fn generate(&self, reason: FallbackReason) -> Resolution {
        Resolution::new(self.message.clone(), reason.into())
    }
}
