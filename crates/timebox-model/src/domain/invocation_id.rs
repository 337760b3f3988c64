use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle returned by the submission boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(String);

impl InvocationId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InvocationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for InvocationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
