//! # Family Tree
//!
//! The unit of load and save: persons, the deduplicated life event set, the
//! root person, the two registries and the attached documents.
//!
//! Entities live in arenas keyed by handles (`PersonId`, `LifeEventId`)
//! assigned from monotonic counters. All collections are `BTreeMap`s so
//! iteration order, and therefore serialization order, is deterministic.
//!
//! Every mutation that touches more than one entity goes through this type,
//! which validates membership and registry constraints before changing
//! anything. A failed call leaves the tree unchanged.

use crate::calendar::DateTime;
use crate::document::{validate_document_name, AttachedDocument, FileOperation};
use crate::life_event::LifeEvent;
use crate::person::Person;
use crate::primitives::MAX_TRAVERSAL_DEPTH;
use crate::registry::{
    Color, GenderRegistry, LifeEventType, LifeEventTypeArgs, LifeEventTypeRegistry, RegistryEntryKey,
};
use crate::{LifeEventId, LifeStatus, LineageError, ParentSlot, PersonId, RelativeType};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

/// Summary counts of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub name: String,
    pub person_count: usize,
    pub life_event_count: usize,
    pub document_count: usize,
    pub living_count: usize,
    pub deceased_count: usize,
    pub user_gender_count: usize,
    pub user_life_event_type_count: usize,
    pub root: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FamilyTree {
    name: String,
    persons: BTreeMap<PersonId, Person>,
    life_events: BTreeMap<LifeEventId, LifeEvent>,
    root: Option<PersonId>,
    genders: GenderRegistry,
    life_event_types: LifeEventTypeRegistry,
    documents: BTreeMap<String, AttachedDocument>,
    file_operations: Vec<FileOperation>,
    next_person_id: u64,
    next_event_id: u64,
}

impl FamilyTree {
    /// Create an empty tree with builtin registries only.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persons: BTreeMap::new(),
            life_events: BTreeMap::new(),
            root: None,
            genders: GenderRegistry::new(),
            life_event_types: LifeEventTypeRegistry::new(),
            documents: BTreeMap::new(),
            file_operations: Vec::new(),
            next_person_id: 0,
            next_event_id: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // =========================================================================
    // REGISTRIES
    // =========================================================================

    #[must_use]
    pub fn genders(&self) -> &GenderRegistry {
        &self.genders
    }

    #[must_use]
    pub fn life_event_types(&self) -> &LifeEventTypeRegistry {
        &self.life_event_types
    }

    /// Register a user gender.
    pub fn register_gender(
        &mut self,
        key: RegistryEntryKey,
        label: impl Into<String>,
        color: Color,
    ) -> Result<(), LineageError> {
        self.genders.register(key, Some(label.into()), color)?;
        Ok(())
    }

    /// Override the color of any gender, builtin or user.
    pub fn set_gender_color(&mut self, key: &RegistryEntryKey, color: Color) -> Result<(), LineageError> {
        let gender = self
            .genders
            .get_mut(key)
            .ok_or_else(|| LineageError::UnknownRegistryKey(key.clone()))?;
        gender.set_color(color);
        Ok(())
    }

    /// Remove a user gender no person refers to.
    pub fn remove_gender(&mut self, key: &RegistryEntryKey) -> Result<(), LineageError> {
        let in_use = self.persons.values().any(|p| {
            p.gender() == Some(key) || p.assigned_gender_at_birth() == Some(key)
        });
        if in_use && !self.genders.is_builtin(key) {
            return Err(LineageError::InvalidArgument(format!(
                "gender {key} is still assigned to a person"
            )));
        }
        self.genders.remove(key)?;
        Ok(())
    }

    /// Register a user life event type.
    pub fn register_life_event_type(
        &mut self,
        key: RegistryEntryKey,
        label: impl Into<String>,
        args: LifeEventTypeArgs,
    ) -> Result<(), LineageError> {
        self.life_event_types.register(key, Some(label.into()), args)?;
        Ok(())
    }

    /// Change the bounds and flags of a user type no event uses yet.
    pub fn redefine_life_event_type(
        &mut self,
        key: &RegistryEntryKey,
        args: LifeEventTypeArgs,
    ) -> Result<(), LineageError> {
        self.ensure_type_unused(key)?;
        self.life_event_types
            .get_mut(key)
            .ok_or_else(|| LineageError::UnknownRegistryKey(key.clone()))?
            .redefine(args)
    }

    /// Remove a user life event type no event uses.
    pub fn remove_life_event_type(&mut self, key: &RegistryEntryKey) -> Result<(), LineageError> {
        if !self.life_event_types.is_builtin(key) {
            self.ensure_type_unused(key)?;
        }
        self.life_event_types.remove(key)?;
        Ok(())
    }

    fn ensure_type_unused(&self, key: &RegistryEntryKey) -> Result<(), LineageError> {
        if self.life_events.values().any(|e| e.event_type() == key) {
            return Err(LineageError::InvalidArgument(format!(
                "life event type {key} is used by an event"
            )));
        }
        Ok(())
    }

    // =========================================================================
    // PERSONS
    // =========================================================================

    /// Add a blank person and return its handle.
    pub fn add_person(&mut self) -> PersonId {
        let id = PersonId(self.next_person_id);
        self.next_person_id = self.next_person_id.saturating_add(1);
        self.persons.insert(id, Person::new(id));
        id
    }

    #[must_use]
    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id)
    }

    /// Mutable access to plain person attributes.
    pub fn person_mut(&mut self, id: PersonId) -> Option<&mut Person> {
        self.persons.get_mut(&id)
    }

    pub fn require_person(&self, id: PersonId) -> Result<&Person, LineageError> {
        self.persons.get(&id).ok_or(LineageError::PersonNotFound(id))
    }

    fn require_person_mut(&mut self, id: PersonId) -> Result<&mut Person, LineageError> {
        self.persons
            .get_mut(&id)
            .ok_or(LineageError::PersonNotFound(id))
    }

    fn check_member(&self, id: PersonId) -> Result<(), LineageError> {
        if self.persons.contains_key(&id) {
            Ok(())
        } else {
            Err(LineageError::NotMember(id))
        }
    }

    #[must_use]
    pub fn contains_person(&self, id: PersonId) -> bool {
        self.persons.contains_key(&id)
    }

    /// Persons in handle order.
    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    #[must_use]
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    #[must_use]
    pub const fn root(&self) -> Option<PersonId> {
        self.root
    }

    /// Designate the root person. Fails with `NotMember` for a foreign handle.
    pub fn set_root(&mut self, person: PersonId) -> Result<(), LineageError> {
        self.check_member(person)?;
        self.root = Some(person);
        Ok(())
    }

    /// Set or clear one parent slot of `child`.
    pub fn set_parent(
        &mut self,
        child: PersonId,
        slot: ParentSlot,
        parent: Option<PersonId>,
    ) -> Result<(), LineageError> {
        if let Some(parent) = parent {
            self.check_member(parent)?;
        }
        self.require_person_mut(child)?.set_parent(slot, parent)
    }

    /// Record `relative` as a `kind` of `person`. Relations are directed;
    /// the reverse edge is not added.
    pub fn add_relative(
        &mut self,
        person: PersonId,
        relative: PersonId,
        kind: RelativeType,
    ) -> Result<bool, LineageError> {
        self.check_member(relative)?;
        self.require_person_mut(person)?.add_relative(relative, kind)
    }

    pub fn remove_relative(
        &mut self,
        person: PersonId,
        relative: PersonId,
        kind: RelativeType,
    ) -> Result<bool, LineageError> {
        Ok(self.require_person_mut(person)?.remove_relative(relative, kind))
    }

    /// Set or clear a person's gender. The key must be in this tree's registry.
    pub fn set_gender(&mut self, person: PersonId, gender: Option<RegistryEntryKey>) -> Result<(), LineageError> {
        if let Some(key) = &gender {
            self.genders.require(key)?;
        }
        self.require_person_mut(person)?.set_gender(gender);
        Ok(())
    }

    pub fn set_assigned_gender_at_birth(
        &mut self,
        person: PersonId,
        gender: Option<RegistryEntryKey>,
    ) -> Result<(), LineageError> {
        if let Some(key) = &gender {
            self.genders.require(key)?;
        }
        self.require_person_mut(person)?
            .set_assigned_gender_at_birth(gender);
        Ok(())
    }

    /// Set a life status consistent with the person's events: an actor of a
    /// death-indicating event stays `Deceased`.
    pub fn set_life_status(&mut self, person: PersonId, status: LifeStatus) -> Result<(), LineageError> {
        if status != LifeStatus::Deceased && self.has_death_event(person) {
            return Err(LineageError::InvalidArgument(format!(
                "{person} is an actor of a death event and must stay deceased"
            )));
        }
        self.require_person_mut(person)?.set_life_status(status);
        Ok(())
    }

    fn has_death_event(&self, person: PersonId) -> bool {
        let Some(p) = self.persons.get(&person) else {
            return false;
        };
        p.life_events().any(|id| {
            self.life_events.get(&id).is_some_and(|event| {
                event.actors().contains(&person)
                    && self
                        .life_event_types
                        .get(event.event_type())
                        .is_some_and(LifeEventType::indicates_death)
            })
        })
    }

    /// Remove a person and every edge pointing at it.
    ///
    /// Walks, in order: other persons' parent and relative edges, the
    /// person's life events (an event left with too few actors for its
    /// type is deleted), the root slot, and finally the arena entry.
    pub fn remove_person(&mut self, id: PersonId) -> Result<Person, LineageError> {
        self.require_person(id)?;

        for person in self.persons.values_mut() {
            person.forget(id);
        }

        let events: Vec<LifeEventId> = self.require_person(id)?.life_events().collect();
        for event_id in events {
            let Some(event) = self.life_events.get_mut(&event_id) else {
                continue;
            };
            let was_actor = event.drop_participant(id);
            let remaining = event.actors().len();
            let still_valid = self
                .life_event_types
                .get(event.event_type())
                .is_some_and(|t| t.accepts_actor_count(remaining));
            if was_actor && !still_valid {
                tracing::debug!(event = %event_id, person = %id, "removing event left without enough actors");
                self.delete_event(event_id);
            }
        }

        if self.root == Some(id) {
            self.root = None;
        }

        self.persons.remove(&id).ok_or(LineageError::PersonNotFound(id))
    }

    // =========================================================================
    // LIFE EVENTS
    // =========================================================================

    #[must_use]
    pub fn life_event(&self, id: LifeEventId) -> Option<&LifeEvent> {
        self.life_events.get(&id)
    }

    /// Mutable access to plain event attributes (date, place, notes, sources).
    pub fn life_event_mut(&mut self, id: LifeEventId) -> Option<&mut LifeEvent> {
        self.life_events.get_mut(&id)
    }

    fn require_event(&self, id: LifeEventId) -> Result<&LifeEvent, LineageError> {
        self.life_events
            .get(&id)
            .ok_or(LineageError::LifeEventNotFound(id))
    }

    /// Events in handle order.
    pub fn life_events(&self) -> impl Iterator<Item = &LifeEvent> {
        self.life_events.values()
    }

    #[must_use]
    pub fn life_event_count(&self) -> usize {
        self.life_events.len()
    }

    /// Events a person takes part in, oldest first.
    #[must_use]
    pub fn life_events_of(&self, person: PersonId) -> Vec<&LifeEvent> {
        let mut events: Vec<&LifeEvent> = self
            .persons
            .get(&person)
            .into_iter()
            .flat_map(|p| p.life_events())
            .filter_map(|id| self.life_events.get(&id))
            .collect();
        events.sort_by(|a, b| a.date.cmp_chronological(&b.date).then(a.id().cmp(&b.id())));
        events
    }

    /// Create an event with its actors.
    ///
    /// Validates the type key, actor membership and count, and the type's
    /// uniqueness; then links the event to each actor and marks actors of
    /// death-indicating types as deceased.
    pub fn add_life_event(
        &mut self,
        date: DateTime,
        event_type: RegistryEntryKey,
        actors: impl IntoIterator<Item = PersonId>,
    ) -> Result<LifeEventId, LineageError> {
        let actors = self.validate_actors(None, &event_type, actors)?;

        let id = LifeEventId(self.next_event_id);
        self.next_event_id = self.next_event_id.saturating_add(1);
        self.life_events
            .insert(id, LifeEvent::new(id, date, event_type));
        self.apply_actors(id, actors)?;
        Ok(id)
    }

    /// Replace the actors of an event, with the same validation as creation.
    pub fn set_life_event_actors(
        &mut self,
        event: LifeEventId,
        actors: impl IntoIterator<Item = PersonId>,
    ) -> Result<(), LineageError> {
        let event_type = self.require_event(event)?.event_type().clone();
        let actors = self.validate_actors(Some(event), &event_type, actors)?;
        self.apply_actors(event, actors)
    }

    /// Change the type of an event, re-validating its current actors.
    pub fn set_life_event_type(
        &mut self,
        event: LifeEventId,
        event_type: RegistryEntryKey,
    ) -> Result<(), LineageError> {
        let actors = self.require_event(event)?.actors().clone();
        let actors = self.validate_actors(Some(event), &event_type, actors)?;
        if let Some(e) = self.life_events.get_mut(&event) {
            e.set_event_type(event_type);
        }
        self.apply_actors(event, actors)
    }

    /// Add a witness. Actors of the event cannot also witness it.
    pub fn add_witness(&mut self, event: LifeEventId, witness: PersonId) -> Result<bool, LineageError> {
        self.check_member(witness)?;
        if self.require_event(event)?.actors().contains(&witness) {
            return Err(LineageError::InvalidArgument(format!(
                "{witness} is already an actor of {event}"
            )));
        }
        let inserted = self
            .life_events
            .get_mut(&event)
            .is_some_and(|e| e.insert_witness(witness));
        if let Some(person) = self.persons.get_mut(&witness) {
            person.link_event(event);
        }
        Ok(inserted)
    }

    pub fn remove_witness(&mut self, event: LifeEventId, witness: PersonId) -> Result<bool, LineageError> {
        self.require_event(event)?;
        let removed = self
            .life_events
            .get_mut(&event)
            .is_some_and(|e| e.remove_witness(witness));
        if removed {
            if let Some(person) = self.persons.get_mut(&witness) {
                person.unlink_event(event);
            }
        }
        Ok(removed)
    }

    /// Delete an event and unlink it from every participant.
    pub fn remove_life_event(&mut self, event: LifeEventId) -> Result<LifeEvent, LineageError> {
        self.require_event(event)?;
        self.delete_event(event)
            .ok_or(LineageError::LifeEventNotFound(event))
    }

    fn delete_event(&mut self, event: LifeEventId) -> Option<LifeEvent> {
        let removed = self.life_events.remove(&event)?;
        for participant in removed.participants() {
            if let Some(person) = self.persons.get_mut(&participant) {
                person.unlink_event(event);
            }
        }
        Some(removed)
    }

    fn validate_actors(
        &self,
        event: Option<LifeEventId>,
        event_type: &RegistryEntryKey,
        actors: impl IntoIterator<Item = PersonId>,
    ) -> Result<BTreeSet<PersonId>, LineageError> {
        let kind = self.life_event_types.require(event_type)?;

        let mut set = BTreeSet::new();
        for actor in actors {
            self.check_member(actor)?;
            if !set.insert(actor) {
                return Err(LineageError::InvalidArgument(format!(
                    "{actor} is listed twice as actor"
                )));
            }
        }
        kind.check_actor_count(set.len())?;

        if kind.unique() {
            for &actor in &set {
                let clash = self.persons.get(&actor).is_some_and(|p| {
                    p.life_events().any(|other| {
                        Some(other) != event
                            && self.life_events.get(&other).is_some_and(|e| {
                                e.event_type() == event_type && e.actors().contains(&actor)
                            })
                    })
                });
                if clash {
                    return Err(LineageError::UniqueEventViolation {
                        person: actor,
                        event_type: event_type.clone(),
                    });
                }
            }
        }

        Ok(set)
    }

    /// Install a validated actor set and keep person links and statuses in step.
    fn apply_actors(&mut self, event: LifeEventId, actors: BTreeSet<PersonId>) -> Result<(), LineageError> {
        let record = self
            .life_events
            .get_mut(&event)
            .ok_or(LineageError::LifeEventNotFound(event))?;
        let previous = record.actors().clone();
        record.replace_actors(actors.clone());
        let still_witnesses = record.witnesses().clone();
        let indicates_death = self
            .life_event_types
            .get(record.event_type())
            .is_some_and(LifeEventType::indicates_death);

        for former in previous.difference(&actors) {
            if !still_witnesses.contains(former) {
                if let Some(person) = self.persons.get_mut(former) {
                    person.unlink_event(event);
                }
            }
        }
        for actor in &actors {
            if let Some(person) = self.persons.get_mut(actor) {
                person.link_event(event);
                if indicates_death {
                    person.set_life_status(LifeStatus::Deceased);
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    #[must_use]
    pub fn document(&self, name: &str) -> Option<&AttachedDocument> {
        self.documents.get(name)
    }

    /// Documents in name order.
    pub fn documents(&self) -> impl Iterator<Item = &AttachedDocument> {
        self.documents.values()
    }

    /// Register a document. With a `source`, a copy into the attachment
    /// directory is queued.
    pub fn add_document(
        &mut self,
        document: AttachedDocument,
        source: Option<PathBuf>,
    ) -> Result<(), LineageError> {
        validate_document_name(&document.name)?;
        if self.documents.contains_key(&document.name) {
            return Err(LineageError::InvalidArgument(format!(
                "document '{}' already exists",
                document.name
            )));
        }
        if let Some(source) = source {
            self.file_operations.push(FileOperation::Copy {
                source,
                name: document.name.clone(),
            });
        }
        self.documents.insert(document.name.clone(), document);
        Ok(())
    }

    /// Insert a document materialized by the reader. No file operation.
    pub(crate) fn insert_loaded_document(&mut self, document: AttachedDocument) {
        self.documents.insert(document.name.clone(), document);
    }

    fn require_document(&self, name: &str) -> Result<(), LineageError> {
        if self.documents.contains_key(name) {
            Ok(())
        } else {
            Err(LineageError::InvalidArgument(format!("unknown document '{name}'")))
        }
    }

    pub fn attach_document_to_person(
        &mut self,
        person: PersonId,
        name: &str,
        main_picture: bool,
    ) -> Result<(), LineageError> {
        self.require_document(name)?;
        self.require_person_mut(person)?
            .attach_document(name, main_picture);
        Ok(())
    }

    pub fn attach_document_to_event(&mut self, event: LifeEventId, name: &str) -> Result<(), LineageError> {
        self.require_document(name)?;
        self.life_events
            .get_mut(&event)
            .ok_or(LineageError::LifeEventNotFound(event))?
            .attach_document(name);
        Ok(())
    }

    /// Rename a document everywhere it is referenced and queue the rename.
    /// Renaming a document to its own name changes nothing.
    pub fn rename_document(&mut self, from: &str, to: &str) -> Result<(), LineageError> {
        validate_document_name(to)?;
        if from == to && self.documents.contains_key(from) {
            return Ok(());
        }
        if self.documents.contains_key(to) {
            return Err(LineageError::InvalidArgument(format!("document '{to}' already exists")));
        }
        let mut document = self
            .documents
            .remove(from)
            .ok_or_else(|| LineageError::InvalidArgument(format!("unknown document '{from}'")))?;
        document.name = to.to_string();
        self.documents.insert(to.to_string(), document);

        for person in self.persons.values_mut() {
            person.rename_document(from, to);
        }
        for event in self.life_events.values_mut() {
            event.rename_document(from, to);
        }
        self.file_operations.push(FileOperation::Rename {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    /// Remove a document and every reference to it, and queue the deletion.
    pub fn remove_document(&mut self, name: &str) -> Result<AttachedDocument, LineageError> {
        let document = self
            .documents
            .remove(name)
            .ok_or_else(|| LineageError::InvalidArgument(format!("unknown document '{name}'")))?;
        for person in self.persons.values_mut() {
            person.detach_document(name);
        }
        for event in self.life_events.values_mut() {
            event.detach_document(name);
        }
        self.file_operations.push(FileOperation::Delete {
            name: name.to_string(),
        });
        Ok(document)
    }

    /// Queued file operations, oldest first.
    #[must_use]
    pub fn pending_file_operations(&self) -> &[FileOperation] {
        &self.file_operations
    }

    /// Drain the queued file operations for execution by the caller.
    pub fn take_file_operations(&mut self) -> Vec<FileOperation> {
        std::mem::take(&mut self.file_operations)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Persons naming `parent` in either parent slot.
    #[must_use]
    pub fn children_of(&self, parent: PersonId) -> Vec<PersonId> {
        self.persons
            .values()
            .filter(|p| p.parents().contains(&Some(parent)))
            .map(Person::id)
            .collect()
    }

    /// Filled parent slots of `person`, first slot first.
    #[must_use]
    pub fn parents_of(&self, person: PersonId) -> Vec<PersonId> {
        self.persons
            .get(&person)
            .map(|p| p.parents().into_iter().flatten().collect())
            .unwrap_or_default()
    }

    /// Persons sharing at least one parent with `person`.
    #[must_use]
    pub fn siblings(&self, person: PersonId) -> Vec<PersonId> {
        let Some(p) = self.persons.get(&person) else {
            return Vec::new();
        };
        let parents: BTreeSet<PersonId> = p.parents().iter().flatten().copied().collect();
        if parents.is_empty() {
            return Vec::new();
        }
        self.persons
            .values()
            .filter(|other| other.id() != person)
            .filter(|other| other.parents().iter().flatten().any(|id| parents.contains(id)))
            .map(Person::id)
            .collect()
    }

    /// Ancestors by parent slots, breadth-first, with their generation
    /// distance. Depth is capped at `MAX_TRAVERSAL_DEPTH`.
    #[must_use]
    pub fn ancestors(&self, person: PersonId, depth: usize) -> Vec<(PersonId, usize)> {
        let depth = depth.min(MAX_TRAVERSAL_DEPTH);
        let mut visited = BTreeSet::from([person]);
        let mut queue = VecDeque::from([(person, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, generation)) = queue.pop_front() {
            if generation >= depth {
                continue;
            }
            let Some(p) = self.persons.get(&current) else {
                continue;
            };
            for parent in p.parents().into_iter().flatten() {
                if visited.insert(parent) {
                    let next = generation.saturating_add(1);
                    result.push((parent, next));
                    queue.push_back((parent, next));
                }
            }
        }

        result
    }

    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let count_status = |status: LifeStatus| {
            self.persons
                .values()
                .filter(|p| p.life_status() == status)
                .count()
        };
        TreeStats {
            name: self.name.clone(),
            person_count: self.persons.len(),
            life_event_count: self.life_events.len(),
            document_count: self.documents.len(),
            living_count: count_status(LifeStatus::Living),
            deceased_count: count_status(LifeStatus::Deceased),
            user_gender_count: self.genders.user_entries().len(),
            user_life_event_type_count: self.life_event_types.user_entries().len(),
            root: self
                .root
                .and_then(|id| self.persons.get(&id))
                .map(Person::display_name),
        }
    }

    /// Check for a registered life event type by key.
    #[must_use]
    pub fn life_event_type(&self, key: &RegistryEntryKey) -> Option<&LifeEventType> {
        self.life_event_types.get(key)
    }
}

// =============================================================================
// TESTS
// =============================================================================
