//! Reservo Core: domain models, repository traits and the shared error
//! taxonomy for tenant-scoped authorization.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{ReservoError, ReservoResult};
