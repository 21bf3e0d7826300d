//! HTTP handlers

pub mod health;
pub mod sessions;
pub mod escalation;
pub mod artifacts;
pub mod catalog;
