//! # Tree Writer
//!
//! Serializes a `FamilyTree` into the version 1 XML document.
//!
//! Persons are numbered by their position in the tree's iteration order and
//! every cross-reference (root, parents, relatives, actors, witnesses) is
//! written as such an index. Life events are collected from the persons
//! that reference them and emitted once each.
//!
//! The output is byte-stable: writing a tree, reading it back and writing
//! it again produces the same bytes.

use super::schema::*;
use crate::calendar::DateTime;
use crate::life_event::LifeEvent;
use crate::person::Person;
use crate::primitives::FORMAT_VERSION;
use crate::registry::RegistryEntry;
use crate::tree::FamilyTree;
use crate::{LifeEventId, LineageError, ParentSlot, PersonId};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::{BTreeMap, BTreeSet};

/// Serialize `tree`. Failures are wrapped in `LineageError::Save`; no
/// partial output is returned.
pub fn write_tree(tree: &FamilyTree) -> Result<String, LineageError> {
    let output = write_document(tree).map_err(|e| {
        tracing::warn!(error = %e, "tree save failed");
        e.into_save()
    })?;
    tracing::info!(
        tree = tree.name(),
        persons = tree.person_count(),
        events = tree.life_event_count(),
        bytes = output.len(),
        "tree serialized"
    );
    Ok(output)
}

type Attrs = Vec<(&'static str, String)>;

/// Thin wrapper over the indenting quick-xml writer.
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), LineageError> {
        self.writer.write_event(event).map_err(LineageError::io)
    }

    fn start_tag(name: &str, attrs: &Attrs) -> BytesStart<'static> {
        let mut start = BytesStart::new(name.to_string());
        for (key, value) in attrs {
            start.push_attribute((*key, value.as_str()));
        }
        start
    }

    fn open(&mut self, name: &str, attrs: &Attrs) -> Result<(), LineageError> {
        self.event(Event::Start(Self::start_tag(name, attrs)))
    }

    fn close(&mut self, name: &str) -> Result<(), LineageError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &Attrs) -> Result<(), LineageError> {
        self.event(Event::Empty(Self::start_tag(name, attrs)))
    }

    /// `<name value="…"/>`
    fn value(&mut self, name: &str, value: impl ToString) -> Result<(), LineageError> {
        self.empty(name, &vec![(ATTR_VALUE, value.to_string())])
    }

    /// `<name>text</name>`
    fn text(&mut self, name: &str, text: &str) -> Result<(), LineageError> {
        self.open(name, &Vec::new())?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String, LineageError> {
        String::from_utf8(self.writer.into_inner()).map_err(LineageError::io)
    }
}

/// Person handle to serialization index.
struct Indices(BTreeMap<PersonId, usize>);

impl Indices {
    fn of(&self, id: PersonId) -> Result<usize, LineageError> {
        self.0.get(&id).copied().ok_or(LineageError::NotMember(id))
    }
}

fn write_document(tree: &FamilyTree) -> Result<String, LineageError> {
    let persons: Vec<&Person> = tree.persons().collect();
    let indices = Indices(
        persons
            .iter()
            .enumerate()
            .map(|(index, person)| (person.id(), index))
            .collect(),
    );

    let root = match tree.root() {
        Some(id) => Some(indices.of(id)?),
        None if persons.is_empty() => None,
        None => return Err(LineageError::MissingRoot),
    };

    let mut out = XmlOut::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut attrs: Attrs = vec![
        (ATTR_VERSION, FORMAT_VERSION.to_string()),
        (ATTR_NAME, tree.name().to_string()),
    ];
    if let Some(root) = root {
        attrs.push((ATTR_ROOT, root.to_string()));
    }
    out.open(FAMILY_TREE, &attrs)?;

    write_registries(&mut out, tree)?;
    tracing::debug!("registries written");
    write_tree_documents(&mut out, tree)?;
    tracing::debug!(documents = tree.documents().count(), "documents written");

    if !persons.is_empty() {
        out.open(PEOPLE, &Vec::new())?;
        for person in &persons {
            write_person(&mut out, person, &indices)?;
        }
        out.close(PEOPLE)?;
    }
    tracing::debug!(persons = persons.len(), "people written");

    let events = collect_life_events(tree, &persons);
    if events.len() != tree.life_event_count() {
        tracing::warn!(
            skipped = tree.life_event_count().saturating_sub(events.len()),
            "life events unreachable from any person are not written"
        );
    }
    let event_count = events.len();
    if !events.is_empty() {
        out.open(LIFE_EVENTS, &Vec::new())?;
        for event in events {
            write_life_event(&mut out, event, &indices)?;
        }
        out.close(LIFE_EVENTS)?;
    }
    tracing::debug!(events = event_count, "life events written");

    out.close(FAMILY_TREE)?;
    out.finish()
}

// =============================================================================
// REGISTRIES
// =============================================================================

fn write_registries(out: &mut XmlOut, tree: &FamilyTree) -> Result<(), LineageError> {
    let genders = tree.genders();
    let customized_genders: Vec<_> = genders
        .iter()
        .filter(|g| genders.is_customized(g.key()))
        .collect();
    let user_types = tree.life_event_types().user_entries();

    if customized_genders.is_empty() && user_types.is_empty() {
        return Ok(());
    }

    out.open(REGISTRIES, &Vec::new())?;

    if !customized_genders.is_empty() {
        out.open(GENDERS, &Vec::new())?;
        for gender in customized_genders {
            let mut attrs: Attrs = vec![(ATTR_KEY, gender.key().to_string())];
            if let Some(label) = gender.label() {
                attrs.push((ATTR_LABEL, label.to_string()));
            }
            attrs.push((ATTR_COLOR, gender.color().to_string()));
            out.empty(ENTRY, &attrs)?;
        }
        out.close(GENDERS)?;
    }

    if !user_types.is_empty() {
        out.open(LIFE_EVENT_TYPES, &Vec::new())?;
        for kind in user_types {
            let mut attrs: Attrs = vec![(ATTR_KEY, kind.key().to_string())];
            if let Some(label) = kind.label() {
                attrs.push((ATTR_LABEL, label.to_string()));
            }
            attrs.extend([
                (ATTR_GROUP, kind.group().ordinal().to_string()),
                (ATTR_MIN_ACTORS, kind.min_actors().to_string()),
                (ATTR_MAX_ACTORS, kind.max_actors().to_string()),
                (ATTR_INDICATES_DEATH, kind.indicates_death().to_string()),
                (ATTR_INDICATES_UNION, kind.indicates_union().to_string()),
                (ATTR_UNIQUE, kind.unique().to_string()),
            ]);
            out.empty(ENTRY, &attrs)?;
        }
        out.close(LIFE_EVENT_TYPES)?;
    }

    out.close(REGISTRIES)
}

// =============================================================================
// DOCUMENTS & DATES
// =============================================================================

fn write_tree_documents(out: &mut XmlOut, tree: &FamilyTree) -> Result<(), LineageError> {
    let mut documents = tree.documents().peekable();
    if documents.peek().is_none() {
        return Ok(());
    }

    out.open(PICTURES, &Vec::new())?;
    for document in documents {
        let attrs: Attrs = vec![(ATTR_NAME, document.name.clone())];
        if document.description.is_none() && document.date.is_none() {
            out.empty(PICTURE, &attrs)?;
            continue;
        }
        out.open(PICTURE, &attrs)?;
        if let Some(description) = &document.description {
            out.text(DESCRIPTION, description)?;
        }
        if let Some(date) = &document.date {
            write_date(out, date)?;
        }
        out.close(PICTURE)?;
    }
    out.close(PICTURES)
}

fn write_date(out: &mut XmlOut, date: &DateTime) -> Result<(), LineageError> {
    let mut attrs: Attrs = vec![(ATTR_TYPE, date.variant_name().to_string())];
    match date {
        DateTime::WithPrecision(d) => {
            attrs.push((ATTR_DATE, d.date.to_wire()));
            attrs.push((ATTR_PRECISION, d.precision.ordinal().to_string()));
            out.empty(DATE, &attrs)
        }
        DateTime::Range(r) => {
            attrs.push((ATTR_START, r.start().to_wire()));
            attrs.push((ATTR_END, r.end().to_wire()));
            out.empty(DATE, &attrs)
        }
        DateTime::Alternative(a) => {
            out.open(DATE, &attrs)?;
            for candidate in a.dates() {
                out.empty(DATE, &vec![(ATTR_DATE, candidate.to_wire())])?;
            }
            out.close(DATE)
        }
    }
}

fn write_document_refs(
    out: &mut XmlOut,
    names: &[String],
    main: Option<&str>,
) -> Result<(), LineageError> {
    if names.is_empty() {
        return Ok(());
    }
    out.open(PICTURES, &Vec::new())?;
    for name in names {
        let mut attrs: Attrs = vec![(ATTR_NAME, name.clone())];
        if main == Some(name.as_str()) {
            attrs.push((ATTR_MAIN, "true".to_string()));
        }
        out.empty(PICTURE, &attrs)?;
    }
    out.close(PICTURES)
}

fn write_notes_and_sources(
    out: &mut XmlOut,
    notes: Option<&str>,
    sources: &[String],
) -> Result<(), LineageError> {
    if let Some(notes) = notes {
        out.text(NOTES, notes)?;
    }
    if !sources.is_empty() {
        out.open(SOURCES, &Vec::new())?;
        for source in sources {
            out.text(SOURCE, source)?;
        }
        out.close(SOURCES)?;
    }
    Ok(())
}

// =============================================================================
// PERSONS
// =============================================================================

fn write_names(out: &mut XmlOut, tag: &str, names: &[String]) -> Result<(), LineageError> {
    if names.is_empty() {
        return Ok(());
    }
    out.open(tag, &Vec::new())?;
    for name in names {
        out.value(NAME, name)?;
    }
    out.close(tag)
}

fn write_person(out: &mut XmlOut, person: &Person, indices: &Indices) -> Result<(), LineageError> {
    out.open(PERSON, &Vec::new())?;

    if let Some(id) = person.disambiguation_id {
        out.value(DISAMBIGUATION_ID, id)?;
    }
    out.value(LIFE_STATUS, person.life_status().ordinal())?;
    if let Some(name) = &person.legal_last_name {
        out.value(LEGAL_LAST_NAME, name)?;
    }
    if let Some(name) = &person.public_last_name {
        out.value(PUBLIC_LAST_NAME, name)?;
    }
    write_names(out, LEGAL_FIRST_NAMES, &person.legal_first_names)?;
    write_names(out, PUBLIC_FIRST_NAMES, &person.public_first_names)?;
    write_names(out, NICKNAMES, &person.nicknames)?;
    if let Some(key) = person.gender() {
        out.empty(GENDER, &vec![(ATTR_KEY, key.to_string())])?;
    }
    if let Some(key) = person.assigned_gender_at_birth() {
        out.empty(ASSIGNED_GENDER_AT_BIRTH, &vec![(ATTR_KEY, key.to_string())])?;
    }
    if let Some(occupation) = &person.main_occupation {
        out.value(MAIN_OCCUPATION, occupation)?;
    }

    let mut parents: Attrs = Vec::new();
    for (slot, attr) in [(ParentSlot::First, ATTR_ID1), (ParentSlot::Second, ATTR_ID2)] {
        if let Some(parent) = person.parent(slot) {
            parents.push((attr, indices.of(parent)?.to_string()));
        }
    }
    if !parents.is_empty() {
        out.empty(PARENTS, &parents)?;
    }

    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (kind, relative) in person.relatives() {
        groups
            .entry(kind.ordinal())
            .or_default()
            .push(indices.of(relative)?);
    }
    if !groups.is_empty() {
        out.open(RELATIVES, &Vec::new())?;
        for (ordinal, mut members) in groups {
            members.sort_unstable();
            out.open(GROUP, &vec![(ATTR_TYPE, ordinal.to_string())])?;
            for index in members {
                out.empty(RELATIVE, &vec![(ATTR_ID, index.to_string())])?;
            }
            out.close(GROUP)?;
        }
        out.close(RELATIVES)?;
    }

    write_document_refs(out, person.documents(), person.main_picture())?;
    write_notes_and_sources(out, person.notes.as_deref(), &person.sources)?;

    out.close(PERSON)
}

// =============================================================================
// LIFE EVENTS
// =============================================================================

/// Distinct events in first-reference order: persons in index order, each
/// person's events in handle order.
fn collect_life_events<'a>(tree: &'a FamilyTree, persons: &[&Person]) -> Vec<&'a LifeEvent> {
    let mut seen: BTreeSet<LifeEventId> = BTreeSet::new();
    let mut events = Vec::new();
    for person in persons {
        for id in person.life_events() {
            if seen.insert(id) {
                if let Some(event) = tree.life_event(id) {
                    events.push(event);
                }
            }
        }
    }
    events
}

fn write_person_refs(
    out: &mut XmlOut,
    tag: &str,
    persons: &BTreeSet<PersonId>,
    indices: &Indices,
) -> Result<(), LineageError> {
    if persons.is_empty() {
        return Ok(());
    }
    let mut refs = persons
        .iter()
        .map(|id| indices.of(*id))
        .collect::<Result<Vec<_>, _>>()?;
    refs.sort_unstable();

    out.open(tag, &Vec::new())?;
    for index in refs {
        out.empty(PERSON, &vec![(ATTR_ID, index.to_string())])?;
    }
    out.close(tag)
}

fn write_life_event(out: &mut XmlOut, event: &LifeEvent, indices: &Indices) -> Result<(), LineageError> {
    out.open(LIFE_EVENT, &Vec::new())?;

    write_date(out, &event.date)?;
    out.empty(TYPE, &vec![(ATTR_KEY, event.event_type().to_string())])?;
    if let Some(place) = &event.place {
        let mut attrs: Attrs = vec![(ATTR_ADDRESS, place.address.clone())];
        if let Some(latlon) = place.latlon {
            attrs.push((ATTR_LATLON, latlon.to_string()));
        }
        out.empty(PLACE, &attrs)?;
    }
    write_person_refs(out, ACTORS, event.actors(), indices)?;
    write_person_refs(out, WITNESSES, event.witnesses(), indices)?;
    write_document_refs(out, event.documents(), None)?;
    write_notes_and_sources(out, event.notes.as_deref(), &event.sources)?;

    out.close(LIFE_EVENT)
}
