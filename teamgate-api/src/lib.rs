//! # TeamGate API Server Library
//!
//! HTTP surface of the TeamGate access-control layer: registration and
//! login, token refresh, and role-gated user and team administration.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
