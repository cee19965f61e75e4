//! Runtime configuration

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use adminsync_core::{AdminSyncError, Result, RolePolicy, RoleType, Tenant};
use adminsync_identity::HttpSettings;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

/// Separator for list-valued settings
const LIST_SEPARATOR: char = '|';

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub okta: OktaSettings,
    #[serde(default)]
    pub groups: GroupSettings,
    /// Logins exempt from role removal, `|`-separated
    #[serde(default)]
    pub whitelist: Option<String>,
    pub sync: SyncSettings,
}

/// Parallel `|`-separated lists, one entry per tenant
#[derive(Default, Deserialize)]
pub struct OktaSettings {
    pub names: Option<String>,
    pub urls: Option<String>,
    pub api_keys: Option<String>,
}

impl fmt::Debug for OktaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OktaSettings")
            .field("names", &self.names)
            .field("urls", &self.urls)
            .field("api_keys", &self.api_keys.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Group name granting each role type; unset or blank leaves it unmapped
#[derive(Debug, Default, Deserialize)]
pub struct GroupSettings {
    pub read_only_admin: Option<String>,
    pub mobile_admin: Option<String>,
    pub user_admin: Option<String>,
    pub app_admin: Option<String>,
    pub org_admin: Option<String>,
    pub super_admin: Option<String>,
}

impl GroupSettings {
    fn get(&self, role_type: RoleType) -> Option<&str> {
        let name = match role_type {
            RoleType::ReadOnlyAdmin => &self.read_only_admin,
            RoleType::MobileAdmin => &self.mobile_admin,
            RoleType::UserAdmin => &self.user_admin,
            RoleType::AppAdmin => &self.app_admin,
            RoleType::OrgAdmin => &self.org_admin,
            RoleType::SuperAdmin => &self.super_admin,
        };
        name.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_max_concurrent_tenants")]
    pub max_concurrent_tenants: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Cancel a run that takes longer than this
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
    /// Repeat the run at this interval; unset runs once and exits
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

fn default_max_concurrent_tenants() -> usize {
    1
}

fn default_page_size() -> u32 {
    200
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retry_delay() -> u64 {
    1000
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from config file if present
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Load from environment variables, e.g. ADMINSYNC__OKTA__NAMES
            .add_source(
                config::Environment::with_prefix("ADMINSYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    /// Apply defaults to `builder` and deserialize the result
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let config = builder
            .set_default("sync.max_concurrent_tenants", 1)?
            .set_default("sync.page_size", 200)?
            .set_default("sync.request_timeout_secs", 30)?
            .set_default("sync.max_retries", 0)?
            .set_default("sync.retry_delay_ms", 1000)?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Tenants to reconcile, in configured order.
    ///
    /// The three okta lists must all be present, free of blank entries and of
    /// equal length.
    pub fn tenants(&self) -> Result<Vec<Tenant>> {
        let names = split_required("okta.names", self.okta.names.as_deref())?;
        let urls = split_required("okta.urls", self.okta.urls.as_deref())?;
        let api_keys = split_required("okta.api_keys", self.okta.api_keys.as_deref())?;

        if names.len() != urls.len() || names.len() != api_keys.len() {
            return Err(AdminSyncError::configuration_invalid(format!(
                "okta.names, okta.urls and okta.api_keys must have the same number of entries \
                 (got {}, {} and {})",
                names.len(),
                urls.len(),
                api_keys.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(AdminSyncError::configuration_invalid(format!(
                "okta.names lists tenant {} more than once",
                duplicate
            )));
        }

        Ok(names
            .into_iter()
            .zip(urls)
            .zip(api_keys)
            .map(|((name, url), api_key)| Tenant::new(name, url, api_key))
            .collect())
    }

    pub fn role_policy(&self) -> RolePolicy {
        let mut policy = RolePolicy::new();
        for role_type in RoleType::ASCENDING {
            if let Some(group) = self.groups.get(role_type) {
                policy.set_group(role_type, group);
            }
        }
        for login in self.whitelist.as_deref().unwrap_or_default().split(LIST_SEPARATOR) {
            policy.whitelist(login);
        }
        policy
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            request_timeout_secs: self.sync.request_timeout_secs,
            max_retries: self.sync.max_retries,
            retry_delay_ms: self.sync.retry_delay_ms,
            page_size: self.sync.page_size,
        }
    }

    /// Reject values the reconciler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sync.page_size == 0 {
            return Err(AdminSyncError::configuration_invalid(
                "sync.page_size must be greater than zero",
            ));
        }
        if self.sync.max_concurrent_tenants == 0 {
            return Err(AdminSyncError::configuration_invalid(
                "sync.max_concurrent_tenants must be greater than zero",
            ));
        }
        if self.sync.interval_secs == Some(0) {
            return Err(AdminSyncError::configuration_invalid(
                "sync.interval_secs must be greater than zero when set",
            ));
        }
        if self.sync.run_timeout_secs == Some(0) {
            return Err(AdminSyncError::configuration_invalid(
                "sync.run_timeout_secs must be greater than zero when set",
            ));
        }
        Ok(())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.sync.run_timeout_secs.map(Duration::from_secs)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.sync.interval_secs.map(Duration::from_secs)
    }
}

fn split_required(key: &str, value: Option<&str>) -> Result<Vec<String>> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AdminSyncError::configuration_invalid(format!(
            "{} is required",
            key
        )));
    }

    let entries: Vec<String> = value
        .split(LIST_SEPARATOR)
        .map(|entry| entry.trim().to_string())
        .collect();
    if entries.iter().any(String::is_empty) {
        return Err(AdminSyncError::configuration_invalid(format!(
            "{} contains a blank entry",
            key
        )));
    }

    Ok(entries)
}
