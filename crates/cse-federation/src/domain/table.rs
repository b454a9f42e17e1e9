//! # Federation Table
//!
//! Pure topology state: which CSE-IDs are known, through which entry each
//! was learned, and the concrete links of direct registrees. Callers hold
//! the manager's table-wide lock for every read-modify-write sequence; the
//! table itself does no locking.

use crate::error::FederationError;
use cse_types::RemoteCseLink;
use std::collections::HashMap;

/// One known CSE-ID.
#[derive(Debug, Clone)]
struct TableEntry {
    /// Concrete link for direct registrees; `None` for CSE-IDs known only
    /// through a descendant list.
    link: Option<RemoteCseLink>,
    /// CSE-ID of the entry this one was learned from; the local CSE-ID for
    /// direct registrees.
    registered_at: String,
}

/// Mapping from CSE-ID to the entry it resolves through.
///
/// Invariant: following `registered_at` from any entry terminates at the
/// local CSE-ID — the table always forms a tree rooted at the local node.
#[derive(Debug, Clone)]
pub struct FederationTable {
    local_cse_id: String,
    entries: HashMap<String, TableEntry>,
}

impl FederationTable {
    #[must_use]
    pub fn new(local_cse_id: impl Into<String>) -> Self {
        Self {
            local_cse_id: local_cse_id.into(),
            entries: HashMap::new(),
        }
    }

    /// Register a direct registree and merge its descendant list.
    ///
    /// Descendants are merged first-writer-wins: a CSE-ID already known
    /// through another entry keeps its existing (closer) registration path.
    /// The direct entry itself always wins over a previous transitive entry
    /// for the same CSE-ID.
    pub fn insert_registree(&mut self, link: RemoteCseLink) {
        let cse_id = link.cse_id.clone();
        let descendants = link.descendant_cse_ids.clone();
        self.entries.insert(
            cse_id.clone(),
            TableEntry {
                link: Some(link),
                registered_at: self.local_cse_id.clone(),
            },
        );
        for descendant in descendants {
            if descendant == self.local_cse_id {
                continue;
            }
            self.entries.entry(descendant).or_insert(TableEntry {
                link: None,
                registered_at: cse_id.clone(),
            });
        }
    }

    /// Remove a CSE-ID and every entry registered through it, transitively.
    ///
    /// Returns the removed CSE-IDs.
    pub fn remove_subtree(&mut self, cse_id: &str) -> Vec<String> {
        let mut doomed = vec![cse_id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            for (id, entry) in &self.entries {
                if entry.registered_at == parent && !doomed.contains(id) {
                    doomed.push(id.clone());
                }
            }
            cursor += 1;
        }
        doomed.retain(|id| self.entries.remove(id).is_some());
        doomed
    }

    /// Replace the descendant set of a direct registree: every entry learned
    /// from `cse_id` is dropped and the new list inserted (again
    /// first-writer-wins against entries learned elsewhere).
    pub fn replace_descendants(&mut self, cse_id: &str, descendants: &[String]) {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.registered_at == cse_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            self.entries.remove(&id);
        }
        if let Some(entry) = self.entries.get_mut(cse_id) {
            if let Some(link) = &mut entry.link {
                link.descendant_cse_ids = descendants.to_vec();
            }
        }
        for descendant in descendants {
            if descendant == &self.local_cse_id {
                continue;
            }
            self.entries
                .entry(descendant.clone())
                .or_insert(TableEntry {
                    link: None,
                    registered_at: cse_id.to_string(),
                });
        }
    }

    /// Resolve a CSE-ID to the nearest concrete link, following the
    /// `registered_at` chain for transitive entries.
    pub fn resolve(&self, cse_id: &str) -> Result<RemoteCseLink, FederationError> {
        let mut current = cse_id;
        let mut hops = 0;
        loop {
            let entry = self
                .entries
                .get(current)
                .ok_or_else(|| FederationError::UnknownCse(cse_id.to_string()))?;
            if let Some(link) = &entry.link {
                if link.first_point_of_access().is_some() {
                    return Ok(link.clone());
                }
            }
            if entry.registered_at == self.local_cse_id {
                // A direct entry without a point of access is a dead end.
                return Err(FederationError::NoPointOfAccess(cse_id.to_string()));
            }
            current = entry.registered_at.as_str();
            hops += 1;
            if hops > self.entries.len() {
                // Broken tree invariant; treat as unknown rather than spin.
                return Err(FederationError::UnknownCse(cse_id.to_string()));
            }
        }
    }

    /// Whether the CSE-ID is known, directly or transitively.
    #[must_use]
    pub fn contains(&self, cse_id: &str) -> bool {
        self.entries.contains_key(cse_id)
    }

    /// The CSE-ID an entry was learned from, if known.
    #[must_use]
    pub fn registered_at(&self, cse_id: &str) -> Option<&str> {
        self.entries.get(cse_id).map(|e| e.registered_at.as_str())
    }

    /// Concrete links of all direct registrees.
    #[must_use]
    pub fn direct_links(&self) -> Vec<RemoteCseLink> {
        self.entries
            .values()
            .filter(|entry| entry.registered_at == self.local_cse_id)
            .filter_map(|entry| entry.link.clone())
            .collect()
    }

    /// Every known CSE-ID — the aggregate descendant list pushed upstream.
    #[must_use]
    pub fn aggregate_descendants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
