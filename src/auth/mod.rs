// Authentication: credential policy, password hashing, account stores, flows

pub mod validator;
pub mod password;
pub mod memory_store;
pub mod pg_store;
pub mod flows;
pub mod auth_middleware;
pub mod audit_logger;
