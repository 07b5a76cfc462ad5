// Per-entity validation rules.

use std::collections::HashSet;

use super::Validate;
use super::fields::{
    non_empty, optional_non_empty, optional_percent, optional_timestamp, percent, timestamp,
};
use super::params::check_value;
use crate::error::{SchemaError, SchemaResult};
use crate::models::*;

impl Validate for Organization {
    const ENTITY: &'static str = "organization";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "name", &self.name)?;
        timestamp(Self::ENTITY, "created_at", &self.created_at)?;
        timestamp(Self::ENTITY, "updated_at", &self.updated_at)?;
        for group in self.groups.iter().flatten() {
            group.validate()?;
            if group.org_id != self.id {
                return Err(SchemaError::reference(
                    Group::ENTITY,
                    &group.id,
                    Self::ENTITY,
                    &group.org_id,
                ));
            }
        }
        Ok(())
    }
}

impl Validate for Group {
    const ENTITY: &'static str = "group";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "org_id", &self.org_id)?;
        non_empty(Self::ENTITY, "name", &self.name)?;
        timestamp(Self::ENTITY, "created_at", &self.created_at)?;
        timestamp(Self::ENTITY, "updated_at", &self.updated_at)?;
        for server in self.servers.iter().flatten() {
            server.validate()?;
            if server.group_id != self.id {
                return Err(SchemaError::reference(
                    Server::ENTITY,
                    &server.id,
                    Self::ENTITY,
                    &server.group_id,
                ));
            }
        }
        Ok(())
    }
}

impl Validate for Server {
    const ENTITY: &'static str = "server";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "group_id", &self.group_id)?;
        non_empty(Self::ENTITY, "name", &self.name)?;
        non_empty(Self::ENTITY, "host", &self.host)?;
        if self.host.chars().any(char::is_whitespace) {
            return Err(SchemaError::validation(
                Self::ENTITY,
                format!("host must not contain whitespace, got {:?}", self.host),
            ));
        }
        // u16 already caps the upper bound on decode
        if self.port == 0 {
            return Err(SchemaError::validation(
                Self::ENTITY,
                "port must be between 1 and 65535, got 0",
            ));
        }
        non_empty(Self::ENTITY, "username", &self.username)?;
        for label in &self.labels {
            non_empty(Self::ENTITY, "labels[]", label)?;
        }
        optional_timestamp(Self::ENTITY, "last_seen", self.last_seen.as_deref())?;
        timestamp(Self::ENTITY, "created_at", &self.created_at)?;
        timestamp(Self::ENTITY, "updated_at", &self.updated_at)?;
        Ok(())
    }
}

impl Validate for Container {
    const ENTITY: &'static str = "container";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "server_id", &self.server_id)?;
        non_empty(Self::ENTITY, "name", &self.name)?;
        non_empty(Self::ENTITY, "image", &self.image)?;
        for port in &self.ports {
            non_empty(Self::ENTITY, "ports[]", port)?;
        }
        timestamp(Self::ENTITY, "created", &self.created)?;
        optional_percent(Self::ENTITY, "cpu_percent", self.cpu_percent)?;
        optional_percent(Self::ENTITY, "memory_percent", self.memory_percent)?;
        Ok(())
    }
}

impl Validate for Task {
    const ENTITY: &'static str = "task";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "server_id", &self.server_id)?;
        non_empty(Self::ENTITY, "template_id", &self.template_id)?;
        percent(Self::ENTITY, "progress", self.progress)?;
        let created = timestamp(Self::ENTITY, "created_at", &self.created_at)?;
        let completed = optional_timestamp(Self::ENTITY, "completed_at", self.completed_at.as_deref())?;
        match (self.status.is_terminal(), completed) {
            (true, None) => Err(SchemaError::validation(
                Self::ENTITY,
                format!("completed_at is required when status is {}", self.status),
            )),
            (false, Some(_)) => Err(SchemaError::validation(
                Self::ENTITY,
                format!("completed_at must be absent while status is {}", self.status),
            )),
            (true, Some(done)) if done < created => Err(SchemaError::validation(
                Self::ENTITY,
                "completed_at must not precede created_at",
            )),
            _ => Ok(()),
        }
    }
}

impl Validate for TaskParameter {
    const ENTITY: &'static str = "task_parameter";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "name", &self.name)?;
        if self.type_ == ParameterType::Select {
            let options = self.options.as_deref().unwrap_or_default();
            if options.is_empty() {
                return Err(SchemaError::validation(
                    Self::ENTITY,
                    format!("{}: options are required for a select parameter", self.name),
                ));
            }
            for option in options {
                non_empty(Self::ENTITY, "options[]", option)?;
            }
        }
        if let Some(default) = &self.default {
            check_value(self, default).map_err(|reason| {
                SchemaError::validation(
                    Self::ENTITY,
                    format!("{}: default {}", self.name, reason),
                )
            })?;
        }
        Ok(())
    }
}

impl Validate for TaskTemplate {
    const ENTITY: &'static str = "task_template";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "name", &self.name)?;
        let mut seen = HashSet::with_capacity(self.parameters.len());
        for param in &self.parameters {
            param.validate()?;
            if !seen.insert(param.name.as_str()) {
                return Err(SchemaError::validation(
                    Self::ENTITY,
                    format!("duplicate parameter name {:?}", param.name),
                ));
            }
        }
        Ok(())
    }
}

impl Validate for ServerStatus {
    const ENTITY: &'static str = "server_status";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "server_id", &self.server_id)?;
        percent(Self::ENTITY, "cpu_percent", self.cpu_percent)?;
        percent(Self::ENTITY, "memory_percent", self.memory_percent)?;
        percent(Self::ENTITY, "disk_percent", self.disk_percent)?;
        percent(Self::ENTITY, "health_score", self.health_score)?;
        timestamp(Self::ENTITY, "timestamp", &self.timestamp)?;
        Ok(())
    }
}

impl Validate for AuditLog {
    const ENTITY: &'static str = "audit_log";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "server_id", &self.server_id)?;
        non_empty(Self::ENTITY, "user_id", &self.user_id)?;
        non_empty(Self::ENTITY, "action", &self.action)?;
        timestamp(Self::ENTITY, "created_at", &self.created_at)?;
        Ok(())
    }
}

impl Validate for AuditFilter {
    const ENTITY: &'static str = "audit_filter";

    /// An inverted date range is not an error; it simply matches nothing.
    fn validate(&self) -> SchemaResult<()> {
        optional_non_empty(Self::ENTITY, "server_id", self.server_id.as_deref())?;
        optional_non_empty(Self::ENTITY, "action", self.action.as_deref())?;
        optional_timestamp(Self::ENTITY, "start_date", self.start_date.as_deref())?;
        optional_timestamp(Self::ENTITY, "end_date", self.end_date.as_deref())?;
        if self.limit == Some(0) {
            return Err(SchemaError::validation(Self::ENTITY, "limit must be > 0"));
        }
        Ok(())
    }
}

impl Validate for TerminalSession {
    const ENTITY: &'static str = "terminal_session";

    fn validate(&self) -> SchemaResult<()> {
        non_empty(Self::ENTITY, "id", &self.id)?;
        non_empty(Self::ENTITY, "server_id", &self.server_id)?;
        non_empty(Self::ENTITY, "server_name", &self.server_name)?;
        Ok(())
    }
}
