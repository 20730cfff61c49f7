//! Account and organization identity model.
//!
//! # Responsibility
//! - Define the identity unit every access check is evaluated for.
//! - Provide the `Principal` view shared by full accounts and the narrow
//!   collaborator projection returned by the resource graph.
//!
//! # Invariants
//! - An account belongs to exactly one organization.
//! - `role` is one of the two known roles; unknown stored roles are rejected
//!   by the repository rather than mapped to a default.

use super::{require_non_empty, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable account identifier.
pub type AccountId = Uuid;

/// Stable organization (tenant) identifier.
pub type OrganizationId = Uuid;

/// Account role within its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May override ownership inside its organization, subject to the
    /// access-level allow-list.
    Administrator,
    /// Regular member; only owns or collaborates.
    Contributor,
}

impl Role {
    /// Integer stored in `accounts.role`.
    pub fn as_db(self) -> i64 {
        match self {
            Self::Administrator => 1,
            Self::Contributor => 2,
        }
    }

    /// Decodes a stored role integer.
    pub fn from_db(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Administrator),
            2 => Some(Self::Contributor),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Contributor => "contributor",
        }
    }
}

/// Identity fields the access policy needs about an account.
///
/// Implemented by [`Account`] and by [`CollaboratorIdentity`], so ownership
/// and administration checks can be evaluated for the querying account and
/// for each of its co-collaborators with the same code.
pub trait Principal {
    fn account_id(&self) -> AccountId;
    fn organization_id(&self) -> OrganizationId;
    fn role(&self) -> Role;

    /// Whether this principal holds the administrator role.
    fn is_administrator(&self) -> bool {
        self.role() == Role::Administrator
    }

    /// Whether both principals belong to the same organization.
    fn same_organization(&self, other: &impl Principal) -> bool
    where
        Self: Sized,
    {
        self.organization_id() == other.organization_id()
    }
}

/// Tenancy boundary grouping accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("organization.name", &self.name)
    }
}

/// Identity unit for all access checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub organization_id: OrganizationId,
    pub role: Role,
    /// Informational label; never consulted by the policy.
    pub display_name: String,
}

impl Account {
    /// Creates a new account with a generated stable ID.
    pub fn new(organization_id: OrganizationId, role: Role, display_name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), organization_id, role, display_name)
    }

    /// Creates an account with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: AccountId,
        organization_id: OrganizationId,
        role: Role,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            organization_id,
            role,
            display_name: display_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_non_empty("account.display_name", &self.display_name)
    }
}

impl Principal for Account {
    fn account_id(&self) -> AccountId {
        self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn role(&self) -> Role {
        self.role
    }
}

/// Narrow projection of a co-collaborating account.
///
/// Carries only the three fields the ownership and administration checks
/// read, which is all the co-collaborator query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollaboratorIdentity {
    pub id: AccountId,
    pub organization_id: OrganizationId,
    pub role: Role,
}

impl Principal for CollaboratorIdentity {
    fn account_id(&self) -> AccountId {
        self.id
    }

    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn role(&self) -> Role {
        self.role
    }
}

impl From<&Account> for CollaboratorIdentity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            organization_id: account.organization_id,
            role: account.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Account, CollaboratorIdentity, Principal, Role};
    use uuid::Uuid;

    #[test]
    fn role_db_encoding_is_stable() {
        assert_eq!(Role::Administrator.as_db(), 1);
        assert_eq!(Role::Contributor.as_db(), 2);
        assert_eq!(Role::from_db(1), Some(Role::Administrator));
        assert_eq!(Role::from_db(2), Some(Role::Contributor));
        assert_eq!(Role::from_db(0), None);
        assert_eq!(Role::from_db(3), None);
    }

    #[test]
    fn principal_view_matches_account_fields() {
        let org = Uuid::new_v4();
        let admin = Account::new(org, Role::Administrator, "Ada");
        let contributor = Account::new(org, Role::Contributor, "Cy");
        let outsider = Account::new(Uuid::new_v4(), Role::Administrator, "Os");

        assert!(admin.is_administrator());
        assert!(!contributor.is_administrator());
        assert!(admin.same_organization(&contributor));
        assert!(!admin.same_organization(&outsider));

        let projected = CollaboratorIdentity::from(&admin);
        assert_eq!(projected.account_id(), admin.id);
        assert_eq!(projected.organization_id(), org);
        assert!(projected.is_administrator());
    }

    #[test]
    fn blank_display_name_is_rejected() {
        let account = Account::new(Uuid::new_v4(), Role::Contributor, "  ");
        assert!(account.validate().is_err());
    }
}
