pub mod config;
pub mod error;
pub mod registry;
pub mod repair;
