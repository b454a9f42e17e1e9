//! # Registration Hooks
//!
//! Per-type admission and lifecycle rules applied around resource CRUD: AE
//! originator minting and uniqueness, CSR attribute enforcement and
//! federation notification, `<request>` recall guarding, and announced-base
//! duplicate detection. The executor owning the actual CRUD calls the
//! `will_be_*` hooks before a write and the past-tense hooks after it.

use crate::error::DispatchError;
use cse_federation::FederationManager;
use cse_types::{attr, Resource, ResourceAddress, ResourceFilter, ResourceStore, ResourceType};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Characters allowed in an originator after the 'C'/'S' prefix, and in a
/// CSE-ID after its leading slash.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-')
}

/// Applies registration behavior per resource type.
pub struct RegistrationHooks {
    store: Arc<dyn ResourceStore>,
    federation: Arc<FederationManager>,
}

impl RegistrationHooks {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, federation: Arc<FederationManager>) -> Self {
        Self { store, federation }
    }

    /// Admission hook, called before a resource is persisted.
    ///
    /// Returns the effective originator, which may have been minted for an AE
    /// registration. The resource may be amended in place (forced `ri`,
    /// enforced attributes).
    pub async fn on_resource_will_be_created(
        &self,
        resource: &mut Resource,
        originator: &str,
    ) -> Result<String, DispatchError> {
        match resource.ty {
            ResourceType::Ae => self.admit_ae(resource, originator).await,
            ResourceType::Csr => self.admit_csr(resource, originator),
            ResourceType::Req => {
                resource.set_attr(attr::ORG, originator);
                resource.set_attr(attr::CR, originator);
                Ok(originator.to_string())
            }
            ResourceType::CseBaseAnnc => {
                self.admit_cse_base_annc(resource).await?;
                Ok(originator.to_string())
            }
            _ => Ok(originator.to_string()),
        }
    }

    /// Post-create hook: a persisted `<CSR>` registers the remote CSE.
    pub async fn on_resource_created(&self, resource: &Resource) {
        if resource.ty != ResourceType::Csr {
            return;
        }
        match cse_types::RemoteCseLink::from_csr(resource) {
            Some(link) => self.federation.on_registree_registered(link).await,
            None => warn!(ri = %resource.ri, "created CSR carries no csi, not registered"),
        }
    }

    /// Post-update hook: an updated `<CSR>` refreshes its descendant list.
    pub async fn on_resource_updated(&self, resource: &Resource) {
        if resource.ty != ResourceType::Csr {
            return;
        }
        let Some(csi) = resource.attr_str(attr::CSI) else {
            warn!(ri = %resource.ri, "updated CSR carries no csi, ignored");
            return;
        };
        self.federation
            .on_registree_updated(csi, &resource.string_list(attr::DCSE))
            .await;
    }

    /// Deletion guard, called before a resource is removed.
    pub fn on_resource_will_be_deleted(
        &self,
        resource: &Resource,
        originator: &str,
    ) -> Result<(), DispatchError> {
        if resource.ty != ResourceType::Req {
            return Ok(());
        }
        if let Some(creator) = resource.attr_str(attr::CR) {
            if creator != originator {
                return Err(DispatchError::RecallNotAllowed(format!(
                    "{originator} is not the creator of {}",
                    resource.ri
                )));
            }
        }
        let recallable = resource
            .request_status()
            .is_some_and(cse_types::RequestStatus::is_recallable);
        if !recallable {
            return Err(DispatchError::RecallNotAllowed(resource.ri.clone()));
        }
        Ok(())
    }

    /// Post-delete hook: a removed `<CSR>` deregisters the remote CSE.
    pub async fn on_resource_deleted(&self, resource: &Resource) {
        if resource.ty != ResourceType::Csr {
            return;
        }
        if let Some(csi) = resource.attr_str(attr::CSI) {
            self.federation.on_registree_deregistered(csi).await;
        }
    }

    /// AE registration: mint or validate the originator, enforce `aei`
    /// uniqueness, and stamp the resource with its identifier.
    async fn admit_ae(
        &self,
        resource: &mut Resource,
        originator: &str,
    ) -> Result<String, DispatchError> {
        let aei = match originator {
            "" | "C" | "S" => {
                let minted = format!("C{}", Uuid::new_v4().simple());
                debug!(aei = %minted, "minted AE identifier");
                minted
            }
            other => {
                let mut chars = other.chars();
                let valid = matches!(chars.next(), Some('C' | 'S'))
                    && chars.clone().next().is_some()
                    && chars.all(is_identifier_char);
                if !valid {
                    return Err(DispatchError::InvalidOriginator(other.to_string()));
                }
                other.to_string()
            }
        };

        let duplicates = self
            .store
            .search(ResourceFilter::by_attribute(
                ResourceType::Ae,
                attr::AEI,
                &aei,
            ))
            .await
            .map_err(DispatchError::Cse)?;
        if !duplicates.is_empty() {
            return Err(DispatchError::AlreadyRegistered(aei));
        }

        resource.set_attr(attr::AEI, aei.clone());
        Ok(aei)
    }

    /// CSR registration: the registering CSE's identifier is authoritative;
    /// `csi` and `ri` are forced from the originator regardless of what the
    /// representation claimed.
    fn admit_csr(
        &self,
        resource: &mut Resource,
        originator: &str,
    ) -> Result<String, DispatchError> {
        let mut chars = originator.chars();
        let valid_csi = chars.next() == Some('/')
            && chars.clone().next().is_some()
            && chars.all(is_identifier_char);
        if !valid_csi {
            return Err(DispatchError::InvalidOriginator(originator.to_string()));
        }

        match resource.attr_str(attr::CB) {
            Some(cb) => {
                let parsed = ResourceAddress::parse(cb)
                    .map_err(|_| DispatchError::InvalidAttribute(format!("cb: {cb}")))?;
                if parsed.cse_id().is_none() {
                    return Err(DispatchError::InvalidAttribute(format!("cb: {cb}")));
                }
            }
            None => return Err(DispatchError::InvalidAttribute("cb missing".into())),
        }

        resource.set_attr(attr::CSI, originator);
        resource.ri = originator.trim_start_matches('/').to_string();
        Ok(originator.to_string())
    }

    /// Only one announcement per original CSE base.
    async fn admit_cse_base_annc(&self, resource: &Resource) -> Result<(), DispatchError> {
        let Some(lnk) = resource.attr_str(attr::LNK) else {
            return Err(DispatchError::InvalidAttribute("lnk missing".into()));
        };
        let duplicates = self
            .store
            .search(ResourceFilter::by_attribute(
                ResourceType::CseBaseAnnc,
                attr::LNK,
                lnk,
            ))
            .await
            .map_err(DispatchError::Cse)?;
        if !duplicates.is_empty() {
            return Err(DispatchError::Conflict(format!(
                "CSE base already announced: {lnk}"
            )));
        }
        Ok(())
    }
}
