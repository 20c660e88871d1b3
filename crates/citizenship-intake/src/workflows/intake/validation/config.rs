use serde::{Deserialize, Serialize};

/// Size ceiling for each certificate scan: 2 MiB.
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 2 * 1024 * 1024;

/// Age after which male applicants must provide a phone number.
pub const DEFAULT_PHONE_REQUIRED_OVER_AGE: u32 = 18;

/// Tunable limits applied by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub max_document_bytes: u64,
    pub phone_required_over_age: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            phone_required_over_age: DEFAULT_PHONE_REQUIRED_OVER_AGE,
        }
    }
}
