//! Permission roles and required levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role held by an access key. Ordered: read-only < read-write < all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum Role {
    ReadOnly,
    ReadWrite,
    All,
}

/// Level a route demands before its handler runs.
///
/// `None` is only ever a requirement; no key holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum AuthLevel {
    None = 0,
    ReadOnly = 1,
    ReadWrite = 2,
    All = 3,
}

impl Role {
    /// Every role, lowest first. Bucket creation issues one key per entry.
    pub const ALL: [Role; 3] = [Role::ReadOnly, Role::ReadWrite, Role::All];

    pub const fn ordinal(self) -> u8 {
        match self {
            Role::ReadOnly => 1,
            Role::ReadWrite => 2,
            Role::All => 3,
        }
    }

    /// True when a key holding `self` satisfies `required`.
    pub const fn admits(self, required: AuthLevel) -> bool {
        self.ordinal() >= required.ordinal()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::ReadOnly => "readOnly",
            Role::ReadWrite => "readWrite",
            Role::All => "all",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthLevel {
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// The weakest role that satisfies this level, or `None` for open routes.
    pub const fn minimum_role(self) -> Option<Role> {
        match self {
            AuthLevel::None => None,
            AuthLevel::ReadOnly => Some(Role::ReadOnly),
            AuthLevel::ReadWrite => Some(Role::ReadWrite),
            AuthLevel::All => Some(Role::All),
        }
    }
}

impl From<Role> for AuthLevel {
    fn from(role: Role) -> Self {
        match role {
            Role::ReadOnly => AuthLevel::ReadOnly,
            Role::ReadWrite => AuthLevel::ReadWrite,
            Role::All => AuthLevel::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELS: [AuthLevel; 4] = [
        AuthLevel::None,
        AuthLevel::ReadOnly,
        AuthLevel::ReadWrite,
        AuthLevel::All,
    ];

    #[test]
    fn admission_matches_ordinal_order() {
        for role in Role::ALL {
            for level in LEVELS {
                assert_eq!(
                    role.admits(level),
                    role.ordinal() >= level.ordinal(),
                    "{role} vs {level:?}"
                );
            }
        }
    }

    #[test]
    fn every_role_passes_open_routes() {
        assert!(Role::ALL.iter().all(|r| r.admits(AuthLevel::None)));
    }

    #[test]
    fn lower_roles_are_denied_higher_levels() {
        assert!(!Role::ReadOnly.admits(AuthLevel::ReadWrite));
        assert!(!Role::ReadOnly.admits(AuthLevel::All));
        assert!(!Role::ReadWrite.admits(AuthLevel::All));
        assert!(Role::All.admits(AuthLevel::All));
        assert!(Role::ReadWrite.admits(AuthLevel::ReadOnly));
    }

    #[test]
    fn role_order_agrees_with_level_order() {
        assert!(Role::ReadOnly < Role::ReadWrite && Role::ReadWrite < Role::All);
        for role in Role::ALL {
            assert_eq!(AuthLevel::from(role).ordinal(), role.ordinal());
            assert_eq!(AuthLevel::from(role).minimum_role(), Some(role));
        }
        assert_eq!(AuthLevel::None.minimum_role(), None);
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&Role::ReadOnly).unwrap(), "\"readOnly\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"readWrite\"").unwrap(),
            Role::ReadWrite
        );
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }
}
