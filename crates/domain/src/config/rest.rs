use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST gateway
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    /// Extra headers sent with every request.  They override the SDK
    /// defaults (`Content-Type`, `X-Module-Id`) on name collision.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Simulated latency applied to test-mode calls.
    #[serde(default = "d_300")]
    pub mock_delay_ms: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8000,
            default_headers: BTreeMap::new(),
            mock_delay_ms: 300,
        }
    }
}

fn d_8000() -> u64 {
    8000
}
fn d_300() -> u64 {
    300
}
