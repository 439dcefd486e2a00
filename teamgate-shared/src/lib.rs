//! # TeamGate Shared Library
//!
//! This crate contains the domain types, authentication primitives and
//! workflows used by the TeamGate API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, teams and roles
//! - `auth`: Password hashing, JWT tokens, visibility rules and middleware context
//! - `store`: Identity store port with PostgreSQL and in-memory adapters
//! - `services`: Registration/login and user/team administration workflows
//! - `db`: Connection pool and migrations
//! - `error`: Workflow error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the TeamGate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
