//! Health tracking for the alerter
//!
//! Components report their own status; the registry also remembers when the
//! pipeline last completed so a stalled scheduler shows up as degraded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still operational, with a problem worth surfacing
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }

    fn worst(self, other: ComponentStatus) -> ComponentStatus {
        use ComponentStatus::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_successful_run: Option<i64>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const SOURCE: &str = "source";
    pub const EVALUATOR: &str = "evaluator";
    pub const NOTIFIER: &str = "notifier";
}

#[derive(Debug)]
struct RegistryState {
    components: HashMap<String, ComponentHealth>,
    ready: bool,
    /// Staleness is measured from here until the first successful run
    started_at: i64,
    last_successful_run: Option<i64>,
    /// Seconds without a successful run before health degrades
    stale_after_secs: Option<i64>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            components: HashMap::new(),
            ready: false,
            started_at: chrono::Utc::now().timestamp(),
            last_successful_run: None,
            stale_after_secs: None,
        }
    }
}

/// Shared registry of component health and run freshness
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Degrade health when no run succeeds within `secs`
    pub async fn set_stale_after(&self, secs: i64) {
        self.state.write().await.stale_after_secs = Some(secs);
    }

    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn record_successful_run(&self, at: i64) {
        self.state.write().await.last_successful_run = Some(at);
    }

    pub async fn health(&self) -> HealthResponse {
        self.health_at(chrono::Utc::now().timestamp()).await
    }

    /// Health as seen at unix time `now`
    pub async fn health_at(&self, now: i64) -> HealthResponse {
        let state = self.state.read().await;

        let mut status = state
            .components
            .values()
            .fold(ComponentStatus::Healthy, |acc, c| acc.worst(c.status));

        if let Some(limit) = state.stale_after_secs {
            let last = state.last_successful_run.unwrap_or(state.started_at);
            if now - last > limit {
                status = status.worst(ComponentStatus::Degraded);
            }
        }

        HealthResponse {
            status,
            components: state.components.clone(),
            last_successful_run: state.last_successful_run,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = self.state.read().await.ready;
        let health = self.health().await;

        let reason = if !ready {
            Some("Alerter not yet initialized")
        } else if health.status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}
