//! Pool lifecycle states.

use serde::{Deserialize, Serialize};

/// Tri-state gate consulted before every mutating pool operation.
///
/// `Online <-> Offline` is reversible; `Shutdown` is terminal.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LifecycleState {
    #[default]
    Online,
    Offline,
    Shutdown,
}

impl LifecycleState {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Shutdown => "shutdown",
        }
    }

    /// Parse a lowercase state name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            "shutdown" => Some(Self::Shutdown),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
