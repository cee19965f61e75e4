//! adminsync core - Domain types and traits for Okta admin role reconciliation

pub mod error;
pub mod ids;
pub mod models;
pub mod traits;

#[cfg(test)]
mod tests;

pub use error::*;
pub use ids::*;
pub use models::*;
pub use traits::*;
