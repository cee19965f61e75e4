//! Builds tenant-bound directory gateways from shared transport settings

use std::sync::Arc;
use tracing::{debug, instrument};

use adminsync_core::{DirectoryConnector, DirectoryGateway, Result, Tenant};

use crate::providers::HttpSettings;

#[cfg(feature = "okta")]
use crate::providers::okta::OktaDirectory;

/// Connector producing one `OktaDirectory` per tenant
#[derive(Debug, Clone, Default)]
pub struct OktaConnector {
    settings: HttpSettings,
}

impl OktaConnector {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

#[cfg(feature = "okta")]
impl DirectoryConnector for OktaConnector {
    #[instrument(skip(self, tenant), fields(tenant = %tenant.name))]
    fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn DirectoryGateway>> {
        debug!("Connecting to Okta org at {}", tenant.base_url);
        let directory = OktaDirectory::new(tenant, &self.settings)?;
        Ok(Arc::new(directory))
    }
}
