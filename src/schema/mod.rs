// Domain schema registry: decode untyped JSON into entities and enforce their invariants.
// Everything here is pure and synchronous; failures come back as values, never panics.

mod fields;
mod params;
mod rules;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::str::FromStr;

use crate::error::{SchemaError, SchemaResult};
use crate::models::*;

pub use fields::{format_timestamp, parse_end_bound, parse_timestamp};
pub use params::resolve_parameters;

/// Invariants of a decoded entity beyond what its Rust type already guarantees.
pub trait Validate {
    /// Entity name used in error messages and the by-name registry.
    const ENTITY: &'static str;

    fn validate(&self) -> SchemaResult<()>;
}

/// Decodes and validates one entity.
pub fn parse_entity<T>(raw: serde_json::Value) -> SchemaResult<T>
where
    T: DeserializeOwned + Validate,
{
    let entity: T =
        serde_json::from_value(raw).map_err(|e| SchemaError::malformed(T::ENTITY, e.to_string()))?;
    entity.validate()?;
    Ok(entity)
}

/// Boundary form of [`parse_entity`]: the outcome wrapped in a response envelope.
pub fn validate_value<T>(raw: serde_json::Value) -> ApiResult<T>
where
    T: DeserializeOwned + Validate,
{
    let result = parse_entity::<T>(raw);
    if let Err(e) = &result {
        tracing::debug!(entity = T::ENTITY, kind = e.kind(), error = %e, "rejected input");
    }
    result.into()
}

/// Same as [`validate_value`] but from JSON text; undecodable text is a failure envelope.
pub fn validate_str<T>(json: &str) -> ApiResult<T>
where
    T: DeserializeOwned + Validate,
{
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(raw) => validate_value(raw),
        Err(e) => ApiResult::from(Err(SchemaError::malformed(T::ENTITY, e.to_string()))),
    }
}

/// Every entity kind known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Organization,
    Group,
    Server,
    Container,
    Task,
    TaskTemplate,
    TaskParameter,
    ServerStatus,
    AuditLog,
    AuditFilter,
    TerminalSession,
}

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Organization,
        EntityKind::Group,
        EntityKind::Server,
        EntityKind::Container,
        EntityKind::Task,
        EntityKind::TaskTemplate,
        EntityKind::TaskParameter,
        EntityKind::ServerStatus,
        EntityKind::AuditLog,
        EntityKind::AuditFilter,
        EntityKind::TerminalSession,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => Organization::ENTITY,
            EntityKind::Group => Group::ENTITY,
            EntityKind::Server => Server::ENTITY,
            EntityKind::Container => Container::ENTITY,
            EntityKind::Task => Task::ENTITY,
            EntityKind::TaskTemplate => TaskTemplate::ENTITY,
            EntityKind::TaskParameter => TaskParameter::ENTITY,
            EntityKind::ServerStatus => ServerStatus::ENTITY,
            EntityKind::AuditLog => AuditLog::ENTITY,
            EntityKind::AuditFilter => AuditFilter::ENTITY,
            EntityKind::TerminalSession => TerminalSession::ENTITY,
        }
    }

    /// Validates `raw` as this kind and returns the normalized entity as JSON.
    pub fn validate_raw(&self, raw: serde_json::Value) -> SchemaResult<serde_json::Value> {
        match self {
            EntityKind::Organization => normalized::<Organization>(raw),
            EntityKind::Group => normalized::<Group>(raw),
            EntityKind::Server => normalized::<Server>(raw),
            EntityKind::Container => normalized::<Container>(raw),
            EntityKind::Task => normalized::<Task>(raw),
            EntityKind::TaskTemplate => normalized::<TaskTemplate>(raw),
            EntityKind::TaskParameter => normalized::<TaskParameter>(raw),
            EntityKind::ServerStatus => normalized::<ServerStatus>(raw),
            EntityKind::AuditLog => normalized::<AuditLog>(raw),
            EntityKind::AuditFilter => normalized::<AuditFilter>(raw),
            EntityKind::TerminalSession => normalized::<TerminalSession>(raw),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SchemaError;

    /// Accepts snake_case or kebab-case names (e.g. "task_template", "audit-log").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| SchemaError::validation("entity", format!("unknown entity kind {:?}", s)))
    }
}

fn normalized<T>(raw: serde_json::Value) -> SchemaResult<serde_json::Value>
where
    T: DeserializeOwned + Serialize + Validate,
{
    let entity = parse_entity::<T>(raw)?;
    serde_json::to_value(&entity).map_err(|e| SchemaError::malformed(T::ENTITY, e.to_string()))
}
