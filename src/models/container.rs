// Containers running on a managed server

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub server_id: String,
    pub name: String,
    pub image: String,
    /// Free-form runtime status as reported by the engine (e.g. "Up 3 hours").
    pub status: String,
    /// Published port mappings, order preserved (e.g. "0.0.0.0:8080->80/tcp").
    pub ports: Vec<String>,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
}
