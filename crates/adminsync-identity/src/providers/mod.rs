//! Directory gateway implementations

#[cfg(feature = "okta")]
pub mod okta;

mod common;

pub use common::*;
