//! stashlink - ephemeral content exchange
//!
//! Uploaded files and text notes live for a fixed retention period behind
//! short random identifiers; a URL shortener shares the same storage and
//! lifecycle model.
//!
//! # Architecture
//! - `storage`: dialect-neutral SQL stores (SQLite / PostgreSQL) and file storage
//! - `tasks`: background expiry sweeper and asynchronous counter updater
//! - `services`: validation and business rules
//! - `api`: HTTP handlers and middleware
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod tasks;
pub mod utils;
