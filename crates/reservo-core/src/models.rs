//! Domain models for Reservo.
//!
//! These are the core types shared across all crates.

pub mod api_key;
pub mod business;
pub mod entitlement;
pub mod permission;
pub mod resource;
pub mod role;
pub mod scope;
pub mod user;
