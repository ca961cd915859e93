// server/src/lib.rs

//! Exposes the application modules as a library so integration tests can
//! drive the coordinator and the HTTP handlers directly.

// Declare modules for the application
pub mod config;
pub mod errors;
pub mod flow;
pub mod services;
pub mod state;
pub mod web;
