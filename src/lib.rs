// Library root for the keeper identity service

pub mod core;
pub mod auth;
pub mod api;
pub mod config;
