//! Database layer for the plant store: connection pooling, embedded
//! migrations, the `Plant` model, and typed query functions.

pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod queries;
