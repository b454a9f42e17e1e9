//! # Resource Representation
//!
//! A generic resource: its type tag, identifiers, and an attribute bag keyed
//! by oneM2M short names. The store and executor own validation; this type
//! only provides typed access to the attributes the core reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute short names used by the core.
pub mod attr {
    /// CSE identifier of a `<CSEBase>` or `<CSR>`.
    pub const CSI: &str = "csi";
    /// Address of the remote CSE base (`<CSR>`).
    pub const CB: &str = "cb";
    /// Points of access.
    pub const POA: &str = "poa";
    /// Descendant CSE identifiers (`<CSR>`).
    pub const DCSE: &str = "dcse";
    /// AE identifier (`<AE>`).
    pub const AEI: &str = "aei";
    /// Link to the announced original (`<CSEBaseAnnc>`).
    pub const LNK: &str = "lnk";
    /// Expiration time.
    pub const ET: &str = "et";
    /// Last-modified time.
    pub const LT: &str = "lt";
    /// Creation time.
    pub const CT: &str = "ct";
    /// Request status (`<request>`).
    pub const RS: &str = "rs";
    /// Operation result (`<request>`).
    pub const ORS: &str = "ors";
    /// Meta information echoing the original request (`<request>`).
    pub const MI: &str = "mi";
    /// Creator / bound originator.
    pub const CR: &str = "cr";
    /// Requesting entity recorded on a `<request>`.
    pub const ORG: &str = "org";
}

/// Resource types the core dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// `<CSEBase>` (ty = 5).
    CseBase,
    /// `<AE>` application entity (ty = 2).
    Ae,
    /// `<CSR>` remote CSE registration (ty = 16).
    Csr,
    /// `<request>` (ty = 17).
    Req,
    /// `<CSEBaseAnnc>` announced CSE base (ty = 10005).
    CseBaseAnnc,
    /// `<subscription>` (ty = 23).
    Subscription,
    /// Any type the core has no registration behavior for.
    Other(u16),
}

impl ResourceType {
    /// Numeric wire value of the type.
    #[must_use]
    pub const fn type_id(self) -> u16 {
        match self {
            Self::Ae => 2,
            Self::CseBase => 5,
            Self::Csr => 16,
            Self::Req => 17,
            Self::Subscription => 23,
            Self::CseBaseAnnc => 10005,
            Self::Other(ty) => ty,
        }
    }

    /// Mapping from the numeric wire value.
    #[must_use]
    pub const fn from_type_id(ty: u16) -> Self {
        match ty {
            2 => Self::Ae,
            5 => Self::CseBase,
            16 => Self::Csr,
            17 => Self::Req,
            23 => Self::Subscription,
            10005 => Self::CseBaseAnnc,
            other => Self::Other(other),
        }
    }
}

/// Status of a persisted `<request>` resource.
///
/// `Pending` is the only non-terminal status; the owning actor writes exactly
/// one transition out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Completed,
    Failed,
    Pending,
    Forwarded,
    PartiallyCompleted,
}

impl RequestStatus {
    /// Numeric wire value of the status.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Completed => 1,
            Self::Failed => 2,
            Self::Pending => 3,
            Self::Forwarded => 4,
            Self::PartiallyCompleted => 5,
        }
    }

    /// Mapping from the numeric wire value.
    #[must_use]
    pub const fn from_value(value: u8) -> Option<Self> {
        Some(match value {
            1 => Self::Completed,
            2 => Self::Failed,
            3 => Self::Pending,
            4 => Self::Forwarded,
            5 => Self::PartiallyCompleted,
            _ => return None,
        })
    }

    /// Terminal statuses never transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// A request may only be recalled (deleted by its originator) once it has
    /// reached `Completed` or `Failed`.
    #[must_use]
    pub const fn is_recallable(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A resource held by (or mirrored into) the resource store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type tag.
    pub ty: ResourceType,
    /// Resource identifier, unique per CSE.
    pub ri: String,
    /// Resource name, unique per parent.
    pub rn: String,
    /// Parent resource identifier; `None` only for the CSE base.
    pub pi: Option<String>,
    /// Remaining attributes keyed by short name.
    pub attributes: Map<String, Value>,
}

impl Resource {
    /// New resource with an empty attribute bag.
    #[must_use]
    pub fn new(
        ty: ResourceType,
        ri: impl Into<String>,
        rn: impl Into<String>,
        pi: Option<String>,
    ) -> Self {
        Self {
            ty,
            ri: ri.into(),
            rn: rn.into(),
            pi,
            attributes: Map::new(),
        }
    }

    /// Raw attribute access.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String attribute access.
    #[must_use]
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Set (or replace) an attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// A string-list attribute (`poa`, `dcse`); missing or mistyped entries
    /// yield an empty list.
    #[must_use]
    pub fn string_list(&self, name: &str) -> Vec<String> {
        self.attributes
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Expiration time (`et`).
    #[must_use]
    pub fn expiration(&self) -> Option<&str> {
        self.attr_str(attr::ET)
    }

    /// Last-modified time (`lt`).
    #[must_use]
    pub fn last_modified(&self) -> Option<&str> {
        self.attr_str(attr::LT)
    }

    /// Status of a `<request>` resource.
    #[must_use]
    pub fn request_status(&self) -> Option<RequestStatus> {
        self.attributes
            .get(attr::RS)
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(RequestStatus::from_value)
    }

    /// Write the status of a `<request>` resource.
    pub fn set_request_status(&mut self, status: RequestStatus) {
        self.set_attr(attr::RS, status.value());
    }

    /// Rebuild a resource from a full representation, e.g. content retrieved
    /// from a remote CSE. Requires at least `ty` and `ri`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let ty = map
            .get("ty")
            .and_then(Value::as_u64)
            .and_then(|v| u16::try_from(v).ok())
            .map(ResourceType::from_type_id)?;
        let ri = map.get("ri").and_then(Value::as_str)?.to_string();
        let rn = map
            .get("rn")
            .and_then(Value::as_str)
            .unwrap_or(ri.as_str())
            .to_string();
        let pi = map.get("pi").and_then(Value::as_str).map(str::to_string);
        let mut attributes = map.clone();
        for key in ["ty", "ri", "rn", "pi"] {
            attributes.remove(key);
        }
        Some(Self {
            ty,
            ri,
            rn,
            pi,
            attributes,
        })
    }

    /// Full representation including the identifying fields.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.insert("ty".into(), Value::from(self.ty.type_id()));
        map.insert("ri".into(), Value::from(self.ri.clone()));
        map.insert("rn".into(), Value::from(self.rn.clone()));
        if let Some(pi) = &self.pi {
            map.insert("pi".into(), Value::from(pi.clone()));
        }
        Value::Object(map)
    }
}
