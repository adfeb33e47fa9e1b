//! Telemetry utilities for formatting and emitting sync counters.
//! Kept independent of bridge internals; callers pass in counters explicitly.
use serde::Serialize;

use crate::retry::RetryStats;

/// Dispatch-side counters kept by a bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    pub mounts: u64,
    pub dispatches: u64,
    pub handler_calls: u64,
    pub handler_failures: u64,
    pub render_requests: u64,
}

/// Everything one editor instance counts, flattened for a single log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounters {
    #[serde(flatten)]
    pub bridge: BridgeStats,
    pub retry: RetryStats,
}

pub fn counters_json(counters: &SyncCounters) -> String {
    serde_json::to_string(counters).unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
}

pub fn maybe_emit(enabled: bool, json_line: &str) {
    if enabled {
        log::info!(target: "trait_sync::telemetry", "{json_line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_serialize_as_one_object() {
        let counters = SyncCounters {
            bridge: BridgeStats {
                dispatches: 2,
                handler_calls: 3,
                ..BridgeStats::default()
            },
            retry: RetryStats {
                synced: 1,
                ..RetryStats::default()
            },
        };
        let value: serde_json::Value = serde_json::from_str(&counters_json(&counters)).unwrap();
        assert_eq!(value["dispatches"], 2);
        assert_eq!(value["handler_calls"], 3);
        assert_eq!(value["retry"]["synced"], 1);
    }
}
