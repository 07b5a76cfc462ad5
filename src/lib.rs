// Library for tests to access modules

pub mod audit_repo;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod schema;
pub mod status_repo;
pub mod version;
