//! Okta directory gateway
//!
//! Talks to the Okta Management API:
//! - `/api/v1/users` paging for the role baseline
//! - `/api/v1/groups` lookup and membership listing
//! - `/api/v1/users/{id}/roles` listing, assignment and removal

use async_trait::async_trait;
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use adminsync_core::{
    AdminSyncError, DirectoryGateway, Group, GroupId, Page, Result, RoleAssignment,
    RoleAssignmentId, RoleType, Tenant, User, UserId,
};

use super::common::*;

/// Okta directory bound to one tenant
pub struct OktaDirectory {
    tenant_name: String,
    base_url: String,
    /// Parsed `base_url`; pagination links must share its origin
    origin_url: Url,
    api_key: String,
    http_client: HttpClient,
    page_size: u32,
}

impl OktaDirectory {
    /// Create a new Okta directory client for a tenant
    pub fn new(tenant: &Tenant, settings: &HttpSettings) -> Result<Self> {
        let base_url = tenant.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AdminSyncError::configuration_invalid(format!(
                "Tenant {} has no base URL",
                tenant.name
            )));
        }

        let origin_url = Url::parse(&base_url).map_err(|e| {
            AdminSyncError::configuration_invalid(format!(
                "Tenant {} has an invalid base URL {}: {}",
                tenant.name, base_url, e
            ))
        })?;

        Ok(Self {
            tenant_name: tenant.name.clone(),
            base_url,
            origin_url,
            api_key: tenant.api_key.clone(),
            http_client: HttpClient::new(settings)?,
            page_size: settings.page_size.max(1),
        })
    }

    /// Base URL for Okta API
    fn api_base(&self) -> String {
        format!("{}/api/v1", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("SSWS {}", self.api_key))
            .header("Accept", "application/json")
    }

    /// GET a JSON body, returning it with the `rel="next"` link if present
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, Option<String>)> {
        let response = self
            .http_client
            .execute_with_retry(self.authorized(self.http_client.inner().get(url)))
            .await?;

        let next_link = response
            .headers()
            .get("link")
            .and_then(|h| h.to_str().ok())
            .and_then(parse_next_link);

        let body = response.json().await.map_err(|e| {
            AdminSyncError::directory_unavailable(format!("Failed to parse Okta response: {}", e))
        })?;

        Ok((body, next_link))
    }

    /// Follow `Link` headers from `url` until the last page
    async fn get_all_pages<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        let mut url = url;

        loop {
            let (items, next_link): (Vec<T>, _) = self.get_json(&url).await?;
            all_items.extend(items);

            match next_link {
                Some(next) => url = self.checked_next_link(next)?,
                None => break,
            }
        }

        Ok(all_items)
    }

    /// Refuse to send the API token anywhere but the tenant's own org
    fn checked_next_link(&self, next: String) -> Result<String> {
        let same_origin = Url::parse(&next)
            .map(|url| url.origin() == self.origin_url.origin())
            .unwrap_or(false);
        if same_origin {
            Ok(next)
        } else {
            Err(AdminSyncError::directory_unavailable(format!(
                "Pagination link {} points outside {}",
                next, self.base_url
            )))
        }
    }

    fn user_roles_url(&self, user_id: &UserId) -> String {
        format!(
            "{}/users/{}/roles",
            self.api_base(),
            urlencoding::encode(user_id.as_str())
        )
    }
}

#[async_trait]
impl DirectoryGateway for OktaDirectory {
    #[instrument(skip(self), fields(tenant = %self.tenant_name))]
    async fn list_users_page(&self, cursor: Option<&str>) -> Result<Page<User>> {
        let url = match cursor {
            Some(next) => self.checked_next_link(next.to_string())?,
            None => format!("{}/users?limit={}", self.api_base(), self.page_size),
        };

        let (okta_users, next_cursor): (Vec<OktaUser>, _) = self.get_json(&url).await?;
        debug!("Fetched page of {} users", okta_users.len());

        Ok(Page {
            items: okta_users.into_iter().map(User::from).collect(),
            next_cursor,
        })
    }

    #[instrument(skip(self), fields(tenant = %self.tenant_name))]
    async fn list_roles(&self, user_id: &UserId) -> Result<Vec<RoleAssignment>> {
        let (roles, _): (Vec<OktaRole>, _) = self.get_json(&self.user_roles_url(user_id)).await?;
        Ok(roles.into_iter().map(RoleAssignment::from).collect())
    }

    #[instrument(skip(self), fields(tenant = %self.tenant_name))]
    async fn find_groups_by_name(&self, name: &str) -> Result<Vec<Group>> {
        let expression = format!("profile.name eq \"{}\"", name.replace('"', "\\\""));
        let url = format!(
            "{}/groups?search={}",
            self.api_base(),
            urlencoding::encode(&expression)
        );

        // Keep exact matches only
        let groups: Vec<Group> = self
            .get_all_pages::<OktaGroup>(url)
            .await?
            .into_iter()
            .filter(|g| g.profile.name == name)
            .map(|g| Group::new(g.id, g.profile.name))
            .collect();

        if groups.is_empty() {
            debug!("No group named {}", name);
        }

        Ok(groups)
    }

    #[instrument(skip(self), fields(tenant = %self.tenant_name))]
    async fn list_group_members(&self, group_id: &GroupId) -> Result<HashSet<User>> {
        let url = format!(
            "{}/groups/{}/users?limit={}",
            self.api_base(),
            urlencoding::encode(group_id.as_str()),
            self.page_size
        );

        let members: Vec<OktaUser> = self.get_all_pages(url).await?;
        debug!("Group {} has {} members", group_id, members.len());

        Ok(members.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self), fields(tenant = %self.tenant_name))]
    async fn assign_role(&self, user_id: &UserId, role_type: RoleType) -> Result<RoleAssignment> {
        let request = self
            .http_client
            .inner()
            .post(self.user_roles_url(user_id))
            .json(&AssignRoleRequest { role_type });

        let response = self
            .http_client
            .execute_with_retry(self.authorized(request))
            .await?;

        let role: OktaRole = response.json().await.map_err(|e| {
            AdminSyncError::directory_unavailable(format!("Failed to parse Okta response: {}", e))
        })?;

        info!("Assigned {} to user {}", role_type, user_id);
        Ok(role.into())
    }

    #[instrument(skip(self), fields(tenant = %self.tenant_name))]
    async fn unassign_role(
        &self,
        user_id: &UserId,
        assignment_id: &RoleAssignmentId,
    ) -> Result<()> {
        let url = format!(
            "{}/{}",
            self.user_roles_url(user_id),
            urlencoding::encode(assignment_id.as_str())
        );

        self.http_client
            .execute_with_retry(self.authorized(self.http_client.inner().delete(url)))
            .await?;

        info!("Unassigned role {} from user {}", assignment_id, user_id);
        Ok(())
    }
}

// =============================================================================
// Okta API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct OktaUser {
    id: String,
    #[serde(default)]
    profile: OktaUserProfile,
}

#[derive(Debug, Default, Deserialize)]
struct OktaUserProfile {
    login: Option<String>,
}

impl From<OktaUser> for User {
    fn from(user: OktaUser) -> Self {
        let login = user.profile.login.unwrap_or_else(|| user.id.clone());
        User::new(user.id, login)
    }
}

#[derive(Debug, Deserialize)]
struct OktaGroup {
    id: String,
    profile: OktaGroupProfile,
}

#[derive(Debug, Deserialize)]
struct OktaGroupProfile {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OktaRole {
    id: String,
    #[serde(rename = "type")]
    role_type: String,
}

impl From<OktaRole> for RoleAssignment {
    fn from(role: OktaRole) -> Self {
        RoleAssignment::new(role.id, role.role_type)
    }
}

#[derive(Debug, Serialize)]
struct AssignRoleRequest {
    #[serde(rename = "type")]
    role_type: RoleType,
}
