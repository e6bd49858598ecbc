//! # Life Event
//!
//! A dated event shared by every person who takes part in it.
//!
//! One `LifeEvent` exists per real-world event no matter how many persons
//! are involved; persons hold its handle rather than a copy. Actors are
//! direct participants and their count is bounded by the event type.
//! Witnesses are unbounded and never overlap with the actors.

use crate::calendar::DateTime;
use crate::registry::RegistryEntryKey;
use crate::{LifeEventId, LineageError, PersonId};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

impl LatLon {
    /// Fails with `InvalidArgument` outside [-90, 90] x [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, LineageError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(LineageError::InvalidArgument(format!(
                "coordinates ({lat}, {lon}) are out of range"
            )));
        }
        Ok(Self { lat, lon })
    }

    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

impl FromStr for LatLon {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LineageError::InvalidArgument(format!("coordinates '{s}' are not 'lat,lon'"));
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
        Self::new(lat, lon)
    }
}

/// Where an event happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub address: String,
    pub latlon: Option<LatLon>,
}

impl Place {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latlon: None,
        }
    }

    #[must_use]
    pub fn with_latlon(mut self, latlon: LatLon) -> Self {
        self.latlon = Some(latlon);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifeEvent {
    id: LifeEventId,
    pub date: DateTime,
    event_type: RegistryEntryKey,
    actors: BTreeSet<PersonId>,
    witnesses: BTreeSet<PersonId>,
    pub place: Option<Place>,
    pub notes: Option<String>,
    pub sources: Vec<String>,
    documents: Vec<String>,
}

impl LifeEvent {
    pub(crate) fn new(id: LifeEventId, date: DateTime, event_type: RegistryEntryKey) -> Self {
        Self {
            id,
            date,
            event_type,
            actors: BTreeSet::new(),
            witnesses: BTreeSet::new(),
            place: None,
            notes: None,
            sources: Vec::new(),
            documents: Vec::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> LifeEventId {
        self.id
    }

    #[must_use]
    pub fn event_type(&self) -> &RegistryEntryKey {
        &self.event_type
    }

    pub(crate) fn set_event_type(&mut self, event_type: RegistryEntryKey) {
        self.event_type = event_type;
    }

    #[must_use]
    pub fn actors(&self) -> &BTreeSet<PersonId> {
        &self.actors
    }

    pub(crate) fn replace_actors(&mut self, actors: BTreeSet<PersonId>) {
        self.witnesses.retain(|witness| !actors.contains(witness));
        self.actors = actors;
    }

    #[must_use]
    pub fn witnesses(&self) -> &BTreeSet<PersonId> {
        &self.witnesses
    }

    pub(crate) fn insert_witness(&mut self, witness: PersonId) -> bool {
        self.witnesses.insert(witness)
    }

    pub(crate) fn remove_witness(&mut self, witness: PersonId) -> bool {
        self.witnesses.remove(&witness)
    }

    /// Whether `person` is an actor or a witness.
    #[must_use]
    pub fn involves(&self, person: PersonId) -> bool {
        self.actors.contains(&person) || self.witnesses.contains(&person)
    }

    /// Actors followed by witnesses.
    pub fn participants(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.actors.iter().chain(self.witnesses.iter()).copied()
    }

    /// Remove `person` from both roles. Returns whether it was an actor.
    pub(crate) fn drop_participant(&mut self, person: PersonId) -> bool {
        self.witnesses.remove(&person);
        self.actors.remove(&person)
    }

    #[must_use]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub(crate) fn attach_document(&mut self, name: &str) {
        if !self.documents.iter().any(|d| d == name) {
            self.documents.push(name.to_string());
        }
    }

    pub(crate) fn detach_document(&mut self, name: &str) {
        self.documents.retain(|d| d != name);
    }

    pub(crate) fn rename_document(&mut self, from: &str, to: &str) {
        for document in &mut self.documents {
            if document == from {
                *document = to.to_string();
            }
        }
    }
}
