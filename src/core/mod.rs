// Core domain: models, errors, token cryptography

pub mod crypto;
pub mod errors;
pub mod models;
