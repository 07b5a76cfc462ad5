// Shared test helpers
#![allow(dead_code)]

use servercraft::config::AuditConfig;
use servercraft::models::*;
use std::collections::BTreeSet;

pub const T0: &str = "2024-05-01T10:00:00Z";
pub const T1: &str = "2024-05-01T11:00:00Z";

pub fn org(id: &str) -> Organization {
    Organization {
        id: id.into(),
        name: format!("Org {}", id),
        created_at: T0.into(),
        updated_at: T0.into(),
        groups: None,
    }
}

pub fn group(id: &str, org_id: &str) -> Group {
    Group {
        id: id.into(),
        org_id: org_id.into(),
        name: format!("Group {}", id),
        created_at: T0.into(),
        updated_at: T0.into(),
        servers: None,
    }
}

pub fn server(id: &str, group_id: &str) -> Server {
    Server {
        id: id.into(),
        group_id: group_id.into(),
        name: format!("server-{}", id),
        host: "10.0.0.5".into(),
        port: 22,
        username: "deploy".into(),
        auth_method: AuthMethod::Key,
        labels: BTreeSet::from(["prod".to_string()]),
        last_seen: None,
        created_at: T0.into(),
        updated_at: T0.into(),
    }
}

pub fn task(id: &str, status: TaskStatus) -> Task {
    Task {
        id: id.into(),
        server_id: "s1".into(),
        template_id: "tpl-restart".into(),
        status,
        progress: 0.0,
        output: String::new(),
        created_at: T0.into(),
        completed_at: status.is_terminal().then(|| T1.to_string()),
    }
}

pub fn session(id: &str, status: TerminalStatus) -> TerminalSession {
    TerminalSession {
        id: id.into(),
        server_id: "s1".into(),
        server_name: "web-1".into(),
        status,
    }
}

pub fn audit(id: &str, server_id: &str, action: &str, result: AuditResult, created_at: &str) -> AuditLog {
    AuditLog {
        id: id.into(),
        server_id: server_id.into(),
        user_id: "u1".into(),
        action: action.into(),
        details: format!("{} on {}", action, server_id),
        result,
        created_at: created_at.into(),
    }
}

pub fn audit_limits() -> AuditConfig {
    AuditConfig {
        default_limit: 50,
        max_limit: 500,
    }
}

pub fn status(server_id: &str, cpu: f64, timestamp: &str) -> ServerStatus {
    ServerStatus::observed(server_id, true, cpu, 40.0, 50.0, timestamp)
}
