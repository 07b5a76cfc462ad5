// Latest-known server health snapshot

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

const CPU_WEIGHT: f64 = 0.4;
const MEMORY_WEIGHT: f64 = 0.3;
const DISK_WEIGHT: f64 = 0.3;

/// Ephemeral snapshot; each new one for the same server supersedes the previous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
pub struct ServerStatus {
    pub server_id: String,
    pub online: bool,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub health_score: f64,
    pub timestamp: String,
}

impl ServerStatus {
    /// Builds a snapshot with `health_score` derived from the utilization figures.
    pub fn observed(
        server_id: impl Into<String>,
        online: bool,
        cpu_percent: f64,
        memory_percent: f64,
        disk_percent: f64,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            online,
            cpu_percent,
            memory_percent,
            disk_percent,
            health_score: health_score(online, cpu_percent, memory_percent, disk_percent),
            timestamp: timestamp.into(),
        }
    }
}

/// Composite health in [0, 100]: 0 when offline, otherwise 100 minus weighted utilization.
/// Rounded to one decimal.
pub fn health_score(online: bool, cpu_percent: f64, memory_percent: f64, disk_percent: f64) -> f64 {
    if !online {
        return 0.0;
    }
    let load = CPU_WEIGHT * cpu_percent.clamp(0.0, 100.0)
        + MEMORY_WEIGHT * memory_percent.clamp(0.0, 100.0)
        + DISK_WEIGHT * disk_percent.clamp(0.0, 100.0);
    ((100.0 - load).clamp(0.0, 100.0) * 10.0).round() / 10.0
}
