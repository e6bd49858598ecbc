//! # Person
//!
//! A node of the genealogy graph.
//!
//! A person has no natural key; its identity is the `PersonId` handle the
//! owning tree assigned when the person was added. Attributes are plain data
//! and can be edited directly. Edges (parents, relatives, life events) are
//! stored as handles into the same tree.
//!
//! ## Invariants
//! - A person is never its own parent or relative.
//! - Both parent slots never hold the same person.
//! - Filled parent slots plus genetic relatives never exceed two.
//!
//! Edge mutations are crate-private: `FamilyTree` checks membership of the
//! referenced persons and is the only public entry point.

use crate::primitives::MAX_GENETIC_PARENTS;
use crate::registry::RegistryEntryKey;
use crate::{LifeEventId, LifeStatus, LineageError, ParentSlot, PersonId, RelativeType};
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    id: PersonId,
    /// Distinguishes persons who would otherwise display identically.
    pub disambiguation_id: Option<NonZeroU32>,
    life_status: LifeStatus,
    pub legal_last_name: Option<String>,
    pub public_last_name: Option<String>,
    pub legal_first_names: Vec<String>,
    pub public_first_names: Vec<String>,
    pub nicknames: Vec<String>,
    gender: Option<RegistryEntryKey>,
    assigned_gender_at_birth: Option<RegistryEntryKey>,
    pub main_occupation: Option<String>,
    pub notes: Option<String>,
    pub sources: Vec<String>,
    documents: Vec<String>,
    main_picture: Option<String>,
    parents: [Option<PersonId>; 2],
    relatives: BTreeMap<RelativeType, BTreeSet<PersonId>>,
    life_events: BTreeSet<LifeEventId>,
}

impl Person {
    pub(crate) fn new(id: PersonId) -> Self {
        Self {
            id,
            disambiguation_id: None,
            life_status: LifeStatus::default(),
            legal_last_name: None,
            public_last_name: None,
            legal_first_names: Vec::new(),
            public_first_names: Vec::new(),
            nicknames: Vec::new(),
            gender: None,
            assigned_gender_at_birth: None,
            main_occupation: None,
            notes: None,
            sources: Vec::new(),
            documents: Vec::new(),
            main_picture: None,
            parents: [None, None],
            relatives: BTreeMap::new(),
            life_events: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> PersonId {
        self.id
    }

    // =========================================================================
    // NAMES
    // =========================================================================

    /// Last name to display: public if set, else legal.
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.public_last_name
            .as_deref()
            .or(self.legal_last_name.as_deref())
    }

    /// First names to display: public if any, else legal.
    #[must_use]
    pub fn first_names(&self) -> &[String] {
        if self.public_first_names.is_empty() {
            &self.legal_first_names
        } else {
            &self.public_first_names
        }
    }

    /// "First Names LAST (#n)" style label.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = self.first_names().iter().map(String::as_str).collect();
        if let Some(last) = self.last_name() {
            parts.push(last);
        }
        let mut name = if parts.is_empty() {
            "?".to_string()
        } else {
            parts.join(" ")
        };
        if let Some(id) = self.disambiguation_id {
            name.push_str(&format!(" (#{id})"));
        }
        name
    }

    // =========================================================================
    // STATUS & GENDER
    // =========================================================================

    #[must_use]
    pub const fn life_status(&self) -> LifeStatus {
        self.life_status
    }

    pub(crate) fn set_life_status(&mut self, status: LifeStatus) {
        self.life_status = status;
    }

    #[must_use]
    pub fn gender(&self) -> Option<&RegistryEntryKey> {
        self.gender.as_ref()
    }

    pub(crate) fn set_gender(&mut self, gender: Option<RegistryEntryKey>) {
        self.gender = gender;
    }

    #[must_use]
    pub fn assigned_gender_at_birth(&self) -> Option<&RegistryEntryKey> {
        self.assigned_gender_at_birth.as_ref()
    }

    pub(crate) fn set_assigned_gender_at_birth(&mut self, gender: Option<RegistryEntryKey>) {
        self.assigned_gender_at_birth = gender;
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    /// Names of attached documents, in attachment order.
    #[must_use]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    #[must_use]
    pub fn main_picture(&self) -> Option<&str> {
        self.main_picture.as_deref()
    }

    pub(crate) fn attach_document(&mut self, name: &str, main: bool) {
        if !self.documents.iter().any(|d| d == name) {
            self.documents.push(name.to_string());
        }
        if main {
            self.main_picture = Some(name.to_string());
        }
    }

    pub(crate) fn detach_document(&mut self, name: &str) {
        self.documents.retain(|d| d != name);
        if self.main_picture.as_deref() == Some(name) {
            self.main_picture = None;
        }
    }

    pub(crate) fn rename_document(&mut self, from: &str, to: &str) {
        for document in &mut self.documents {
            if document == from {
                *document = to.to_string();
            }
        }
        if self.main_picture.as_deref() == Some(from) {
            self.main_picture = Some(to.to_string());
        }
    }

    // =========================================================================
    // PARENTS
    // =========================================================================

    #[must_use]
    pub const fn parent(&self, slot: ParentSlot) -> Option<PersonId> {
        self.parents[slot.index()]
    }

    /// Both parent slots.
    #[must_use]
    pub const fn parents(&self) -> [Option<PersonId>; 2] {
        self.parents
    }

    /// Set or clear one parent slot.
    ///
    /// - `SelfReference` if `parent` is this person
    /// - `IdenticalParents` if the other slot already holds `parent`
    /// - `GeneticParentLimit` if this would exceed two genetic parents
    pub(crate) fn set_parent(&mut self, slot: ParentSlot, parent: Option<PersonId>) -> Result<(), LineageError> {
        if let Some(parent) = parent {
            if parent == self.id {
                return Err(LineageError::SelfReference(self.id));
            }
            if self.parents[slot.other().index()] == Some(parent) {
                return Err(LineageError::IdenticalParents(self.id));
            }
            if self.parents[slot.index()].is_none() && self.genetic_parent_count() >= MAX_GENETIC_PARENTS {
                return Err(LineageError::GeneticParentLimit(self.id));
            }
        }
        self.parents[slot.index()] = parent;
        Ok(())
    }

    /// Filled parent slots plus genetic relatives.
    #[must_use]
    pub fn genetic_parent_count(&self) -> usize {
        let slots = self.parents.iter().flatten().count();
        let donors: usize = self
            .relatives
            .iter()
            .filter(|(kind, _)| kind.is_genetic())
            .map(|(_, set)| set.len())
            .sum();
        slots + donors
    }

    // =========================================================================
    // RELATIVES
    // =========================================================================

    /// Add `relative` under `kind`. Returns whether the edge is new.
    ///
    /// - `SelfReference` if `relative` is this person
    /// - `GeneticParentLimit` for a genetic kind beyond two genetic parents
    pub(crate) fn add_relative(&mut self, relative: PersonId, kind: RelativeType) -> Result<bool, LineageError> {
        if relative == self.id {
            return Err(LineageError::SelfReference(self.id));
        }
        if self.has_relative(relative, kind) {
            return Ok(false);
        }
        if kind.is_genetic() && self.genetic_parent_count() >= MAX_GENETIC_PARENTS {
            return Err(LineageError::GeneticParentLimit(self.id));
        }
        Ok(self.relatives.entry(kind).or_default().insert(relative))
    }

    /// Remove one relative edge. Returns whether it existed.
    pub(crate) fn remove_relative(&mut self, relative: PersonId, kind: RelativeType) -> bool {
        let Some(set) = self.relatives.get_mut(&kind) else {
            return false;
        };
        let removed = set.remove(&relative);
        if set.is_empty() {
            self.relatives.remove(&kind);
        }
        removed
    }

    #[must_use]
    pub fn has_relative(&self, relative: PersonId, kind: RelativeType) -> bool {
        self.relatives
            .get(&kind)
            .is_some_and(|set| set.contains(&relative))
    }

    /// Relatives of one kind, in handle order.
    pub fn relatives_of_type(&self, kind: RelativeType) -> impl Iterator<Item = PersonId> + '_ {
        self.relatives.get(&kind).into_iter().flatten().copied()
    }

    /// All relative edges as `(kind, relative)`, grouped by kind ordinal.
    pub fn relatives(&self) -> impl Iterator<Item = (RelativeType, PersonId)> + '_ {
        self.relatives
            .iter()
            .flat_map(|(kind, set)| set.iter().map(move |relative| (*kind, *relative)))
    }

    /// Drop every edge (parent slot or relative) pointing at `other`.
    pub(crate) fn forget(&mut self, other: PersonId) {
        for slot in &mut self.parents {
            if *slot == Some(other) {
                *slot = None;
            }
        }
        for set in self.relatives.values_mut() {
            set.remove(&other);
        }
        self.relatives.retain(|_, set| !set.is_empty());
    }

    // =========================================================================
    // LIFE EVENTS
    // =========================================================================

    /// Events this person takes part in as actor or witness.
    pub fn life_events(&self) -> impl Iterator<Item = LifeEventId> + '_ {
        self.life_events.iter().copied()
    }

    pub(crate) fn link_event(&mut self, event: LifeEventId) {
        self.life_events.insert(event);
    }

    pub(crate) fn unlink_event(&mut self, event: LifeEventId) {
        self.life_events.remove(&event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
