//! Strongly-typed identifiers assigned by the remote directory

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate opaque string ID wrappers
macro_rules! define_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId, "Directory-assigned user id");
define_id!(GroupId, "Directory-assigned group id");
define_id!(RoleAssignmentId, "Directory-internal id of one role assignment held by a user");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_matches_inner() {
        let id = UserId::new("00u1abcd");
        assert_eq!(id.to_string(), "00u1abcd");
        assert_eq!(id.as_str(), "00u1abcd");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = GroupId::from("00g42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00g42\"");

        let parsed: GroupId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
