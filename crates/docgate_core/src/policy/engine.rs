//! Access policy engine.
//!
//! # Responsibility
//! - Compose identity and graph lookups into the four authorization
//!   predicates and the top-level edit decision.
//!
//! # Invariants
//! - `owns` and `administers` read only already-loaded fields.
//! - `can_edit` evaluates owner, then administrator, then shared; the graph
//!   query only runs when both local checks fail.
//! - Sharing is exactly one hop: co-collaborators are judged by `owns` /
//!   `administers` alone, never by their own collaborations.
//! - The engine holds no state and performs no writes. Callers supply one
//!   consistent read snapshot through the stores they pass in.

use super::{AccessError, AccessResult, EditDecision, EditGrant, SharedBasis};
use crate::model::account::{Account, AccountId, CollaboratorIdentity, Principal};
use crate::model::document::{Document, DocumentId};
use crate::repo::graph_repo::ResourceGraph;
use crate::repo::identity_repo::IdentityStore;
use log::{debug, warn};

/// Ownership: the document is tagged with the principal's account id.
pub fn owns(principal: &impl Principal, document: &Document) -> bool {
    document.owner_id == principal.account_id()
}

/// Decision engine over an identity store and a resource graph.
pub struct AccessPolicyEngine<'a, I: ?Sized, G: ?Sized> {
    identity: &'a I,
    graph: &'a G,
}

impl<'a, I, G> AccessPolicyEngine<'a, I, G>
where
    I: IdentityStore + ?Sized,
    G: ResourceGraph + ?Sized,
{
    pub fn new(identity: &'a I, graph: &'a G) -> Self {
        Self { identity, graph }
    }

    /// Resolves both sides of a decision.
    ///
    /// The account is resolved first; an unknown account short-circuits
    /// before the document is looked up.
    pub fn resolve(
        &self,
        account_id: AccountId,
        document_id: DocumentId,
    ) -> AccessResult<(Account, Document)> {
        let account = self
            .identity
            .get_account(account_id)?
            .ok_or(AccessError::AccountNotFound(account_id))?;
        let document = self
            .graph
            .get_document(document_id)?
            .ok_or(AccessError::DocumentNotFound(document_id))?;
        Ok((account, document))
    }

    pub fn owns<P: Principal>(&self, principal: &P, document: &Document) -> bool {
        owns(principal, document)
    }

    /// Administrator override within the document's organization.
    ///
    /// Requires the administrator role, the same organization, and an access
    /// level on the allow-list. Unrecognized stored levels never qualify.
    pub fn administers<P: Principal>(&self, principal: &P, document: &Document) -> bool {
        self.identity.is_administrator(principal)
            && principal.organization_id() == document.organization_id
            && document.access.is_administrable()
    }

    pub fn owns_or_administers<P: Principal>(&self, principal: &P, document: &Document) -> bool {
        self.owns(principal, document) || self.administers(principal, document)
    }

    /// Whether a co-collaborator on a project containing the document owns
    /// or administers it.
    pub fn shared_via_collaboration(
        &self,
        account: &Account,
        document: &Document,
    ) -> AccessResult<bool> {
        Ok(self.shared_grant(account, document)?.is_some())
    }

    pub fn can_edit(&self, account: &Account, document: &Document) -> AccessResult<bool> {
        Ok(self.evaluate_edit(account, document)?.allowed)
    }

    /// Runs the edit decision and reports which grant allowed it.
    pub fn evaluate_edit(
        &self,
        account: &Account,
        document: &Document,
    ) -> AccessResult<EditDecision> {
        let invalid_access_level = document.invalid_access_level();
        if let Some(invalid) = invalid_access_level {
            warn!(
                "event=invalid_access_level module=policy status=denied document_id={} raw={}",
                invalid.document_id, invalid.raw
            );
        }

        let grant = if self.owns(account, document) {
            Some(EditGrant::Owner)
        } else if self.administers(account, document) {
            Some(EditGrant::Administrator)
        } else {
            self.shared_grant(account, document)?
        };

        debug!(
            "event=edit_evaluate module=policy account_id={} document_id={} allowed={} grant={}",
            account.id,
            document.id,
            grant.is_some(),
            grant.as_ref().map_or("none", EditGrant::as_str)
        );
        Ok(EditDecision::from_grant(grant, invalid_access_level))
    }

    fn shared_grant(&self, account: &Account, document: &Document) -> AccessResult<Option<EditGrant>> {
        let collaborators = self
            .graph
            .accounts_collaborating_on_document(document.id, account.id)?;
        Ok(collaborators
            .iter()
            .find_map(|collaborator| self.collaborator_basis(collaborator, document)))
    }

    fn collaborator_basis(
        &self,
        collaborator: &CollaboratorIdentity,
        document: &Document,
    ) -> Option<EditGrant> {
        let basis = if self.owns(collaborator, document) {
            SharedBasis::CollaboratorOwns
        } else if self.administers(collaborator, document) {
            SharedBasis::CollaboratorAdministers
        } else {
            return None;
        };
        Some(EditGrant::Shared {
            collaborator: collaborator.id,
            basis,
        })
    }
}
