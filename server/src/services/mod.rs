// server/src/services/mod.rs

// Declare service modules
pub mod admin;
pub mod telegram;
