//! Storage types shared by every provider

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Acknowledgement of a successful metadata save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub success: bool,
    pub last_sync: i64,
    /// Location of the stored document, for providers that expose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SaveReceipt {
    pub fn stored(last_sync: i64) -> Self {
        Self {
            success: true,
            last_sync,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Client-side bounds on provider calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub load: Duration,
    pub save: Duration,
}

impl Timeouts {
    pub const fn from_secs(load: u64, save: u64) -> Self {
        Self {
            load: Duration::from_secs(load),
            save: Duration::from_secs(save),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_secs(10, 10)
    }
}
