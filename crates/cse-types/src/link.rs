//! Projection of a `<CSR>` resource into a federation link.

use crate::resource::{attr, Resource, ResourceType};
use serde::{Deserialize, Serialize};

/// A remote CSE the local node is linked to: either the registrar (upstream)
/// or a registree (downstream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCseLink {
    /// CSE-ID of the remote node, with its leading slash.
    pub cse_id: String,
    /// Resource id of the local `<CSR>` mirror.
    pub resource_id: String,
    /// Reachable network addresses, most preferred first.
    pub points_of_access: Vec<String>,
    /// CSE-IDs reachable transitively below the remote node.
    pub descendant_cse_ids: Vec<String>,
    /// Last-modified timestamp of the mirror.
    pub last_modified: Option<String>,
}

impl RemoteCseLink {
    /// Project a `<CSR>` resource into a link; `None` when the resource is
    /// not a `<CSR>` or carries no CSE-ID.
    #[must_use]
    pub fn from_csr(resource: &Resource) -> Option<Self> {
        if resource.ty != ResourceType::Csr {
            return None;
        }
        let cse_id = resource.attr_str(attr::CSI)?.to_string();
        Some(Self {
            cse_id,
            resource_id: resource.ri.clone(),
            points_of_access: resource.string_list(attr::POA),
            descendant_cse_ids: resource.string_list(attr::DCSE),
            last_modified: resource.last_modified().map(str::to_string),
        })
    }

    /// First point of access, the address transit URLs are composed from.
    #[must_use]
    pub fn first_point_of_access(&self) -> Option<&str> {
        self.points_of_access.first().map(String::as_str)
    }
}
