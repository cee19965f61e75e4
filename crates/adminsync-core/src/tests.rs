//! Unit tests for adminsync-core

use super::*;
use std::collections::HashSet;

// =============================================================================
// Role Type Catalog Tests
// =============================================================================

#[cfg(test)]
mod role_type_tests {
    use super::*;

    #[test]
    fn test_ascending_order_is_privilege_order() {
        assert_eq!(
            RoleType::ASCENDING,
            [
                RoleType::ReadOnlyAdmin,
                RoleType::MobileAdmin,
                RoleType::UserAdmin,
                RoleType::AppAdmin,
                RoleType::OrgAdmin,
                RoleType::SuperAdmin,
            ]
        );

        for pair in RoleType::ASCENDING.windows(2) {
            assert!(pair[0] < pair[1], "{} should rank below {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_parse_every_catalog_label() {
        for role_type in RoleType::ASCENDING {
            let parsed: RoleType = role_type.as_str().parse().unwrap();
            assert_eq!(parsed, role_type);
        }
    }

    #[test]
    fn test_parse_unknown_label_fails() {
        let err = "HELP_DESK_ADMIN".parse::<RoleType>().unwrap_err();
        assert_eq!(
            err,
            AdminSyncError::UnknownRoleType {
                value: "HELP_DESK_ADMIN".to_string()
            }
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("super_admin".parse::<RoleType>().is_err());
    }

    #[test]
    fn test_label_matching_ignores_case() {
        assert!(RoleType::OrgAdmin.matches_label("org_admin"));
        assert!(RoleType::OrgAdmin.matches_label("ORG_ADMIN"));
        assert!(!RoleType::OrgAdmin.matches_label("APP_ADMIN"));
    }

    #[test]
    fn test_role_type_serde_uses_directory_labels() {
        let json = serde_json::to_string(&RoleType::ReadOnlyAdmin).unwrap();
        assert_eq!(json, "\"READ_ONLY_ADMIN\"");

        let parsed: RoleType = serde_json::from_str("\"MOBILE_ADMIN\"").unwrap();
        assert_eq!(parsed, RoleType::MobileAdmin);
    }
}

// =============================================================================
// Domain Model Tests
// =============================================================================

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_user_identity_is_directory_id() {
        let a = User::new("00u1", "alice@example.com");
        let renamed = User::new("00u1", "alice.smith@example.com");
        let other = User::new("00u2", "alice@example.com");

        assert_eq!(a, renamed);
        assert_ne!(a, other);

        let set: HashSet<User> = [a, renamed, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_role_assignment_parses_label() {
        let assignment = RoleAssignment::new("ra1", "APP_ADMIN");
        assert_eq!(assignment.role_type().unwrap(), RoleType::AppAdmin);
        assert!(assignment.is(RoleType::AppAdmin));
        assert!(!assignment.is(RoleType::OrgAdmin));

        let custom = RoleAssignment::new("ra2", "CUSTOM");
        assert!(custom.role_type().is_err());
    }

    #[test]
    fn test_tenant_debug_redacts_api_key() {
        let tenant = Tenant::new("prod", "https://prod.okta.com", "super-secret-token");
        let debug = format!("{:?}", tenant);
        assert!(debug.contains("prod"));
        assert!(!debug.contains("super-secret-token"));
    }

    #[test]
    fn test_tenant_serialization_skips_api_key() {
        let tenant = Tenant::new("prod", "https://prod.okta.com", "super-secret-token");
        let json = serde_json::to_string(&tenant).unwrap();
        assert!(!json.contains("super-secret-token"));
    }

    #[test]
    fn test_page_last() {
        let page = Page::last(vec![1, 2, 3]);
        assert!(page.is_last());
        assert_eq!(page.items.len(), 3);
    }
}

// =============================================================================
// Role Policy Tests
// =============================================================================

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_blank_group_leaves_role_unmapped() {
        let policy = RolePolicy::new()
            .with_group(RoleType::ReadOnlyAdmin, "okta-readonly")
            .with_group(RoleType::SuperAdmin, "   ");

        assert_eq!(policy.group_for(RoleType::ReadOnlyAdmin), Some("okta-readonly"));
        assert_eq!(policy.group_for(RoleType::SuperAdmin), None);
        assert_eq!(policy.group_for(RoleType::OrgAdmin), None);
    }

    #[test]
    fn test_blank_group_clears_previous_mapping() {
        let mut policy = RolePolicy::new().with_group(RoleType::AppAdmin, "apps");
        policy.set_group(RoleType::AppAdmin, "");
        assert_eq!(policy.group_for(RoleType::AppAdmin), None);
    }

    #[test]
    fn test_whitelist_ignores_blank_entries() {
        let policy = RolePolicy::new()
            .with_whitelisted("carol@example.com")
            .with_whitelisted("")
            .with_whitelisted(" ");

        assert!(policy.is_whitelisted("carol@example.com"));
        assert!(!policy.is_whitelisted("dave@example.com"));
        assert_eq!(policy.whitelist_len(), 1);
    }
}

// =============================================================================
// Error Tests
// =============================================================================

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdminSyncError::directory_rejected(409, "role already assigned");
        assert_eq!(
            err.to_string(),
            "Directory rejected request (HTTP 409): role already assigned"
        );

        let err = AdminSyncError::configuration_invalid("okta.urls must have a value");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: okta.urls must have a value"
        );
    }

    #[test]
    fn test_directory_error_classification() {
        assert!(AdminSyncError::directory_unavailable("timeout").is_directory_error());
        assert!(AdminSyncError::directory_rejected(400, "bad").is_directory_error());
        assert!(!AdminSyncError::unknown_role_type("X").is_directory_error());
        assert!(!AdminSyncError::cancelled("stop").is_directory_error());
    }
}
