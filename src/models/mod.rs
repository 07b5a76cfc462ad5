// Domain models: the ServerCraft wire contract (snake_case JSON, lowercase enums)

mod audit;
mod container;
mod envelope;
mod organization;
mod status;
mod task;
mod terminal;

pub use audit::{AuditFilter, AuditLog, AuditPage, AuditResult};
pub use container::Container;
pub use envelope::ApiResult;
pub use organization::{AuthMethod, Group, Organization, Server};
pub use status::{ServerStatus, health_score};
pub use task::{ParameterType, Task, TaskParameter, TaskStatus, TaskTemplate};
pub use terminal::{TerminalSession, TerminalStatus};
