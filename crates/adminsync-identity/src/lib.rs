//! adminsync identity - Directory gateway implementations
//!
//! Currently ships the Okta Management API gateway. A gateway is bound to a
//! single tenant; `OktaConnector` builds one per configured tenant.

pub mod connector;
pub mod providers;


#[cfg(feature = "okta")]
pub use providers::okta::OktaDirectory;

pub use connector::OktaConnector;
pub use providers::HttpSettings;
