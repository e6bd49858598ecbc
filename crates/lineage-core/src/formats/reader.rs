//! # Tree Reader
//!
//! Rebuilds a `FamilyTree` from the version 1 XML document.
//!
//! Person references in the document are positional indices into a list
//! that is still being built while persons are parsed, so loading runs in
//! two passes:
//!
//! 1. Every `Person` is created and its plain attributes applied. Raw
//!    parent and relative indices are kept aside.
//! 2. Once all persons exist, the indices are resolved to handles. The root
//!    and then the life events (whose actor and witness lists can be
//!    resolved immediately) follow.
//!
//! Any failure aborts the load with a single `LineageError::Load`; the
//! in-progress tree is dropped and never returned.

use super::dom::{self, XmlElement};
use super::schema::*;
use crate::calendar::{CalendarSpecificDateTime, DatePrecision, DateTime};
use crate::document::{validate_document_name, DocumentProvider, MetadataDocuments};
use crate::life_event::{LatLon, Place};
use crate::primitives::{FORMAT_VERSION, MAX_DOCUMENT_SIZE};
use crate::registry::{Color, LifeEventGroup, LifeEventTypeArgs, RegistryEntryKey};
use crate::tree::FamilyTree;
use crate::{LifeStatus, LineageError, ParentSlot, PersonId, RelativeType};
use std::collections::BTreeSet;
use std::num::NonZeroU32;

/// Load a tree, materializing attached documents through `provider`.
pub fn read_tree<P>(input: &str, provider: &mut P) -> Result<FamilyTree, LineageError>
where
    P: DocumentProvider + ?Sized,
{
    let tree = read_document(input, provider).map_err(|e| {
        tracing::warn!(error = %e, "tree load failed");
        e.into_load()
    })?;
    tracing::info!(
        tree = tree.name(),
        persons = tree.person_count(),
        events = tree.life_event_count(),
        "tree loaded"
    );
    Ok(tree)
}

/// Load a tree, building documents from their recorded metadata.
pub fn read_tree_with_metadata(input: &str) -> Result<FamilyTree, LineageError> {
    read_tree(input, &mut MetadataDocuments)
}

fn read_document<P>(input: &str, provider: &mut P) -> Result<FamilyTree, LineageError>
where
    P: DocumentProvider + ?Sized,
{
    if input.len() > MAX_DOCUMENT_SIZE {
        return Err(LineageError::format(format!(
            "document of {} bytes exceeds the {MAX_DOCUMENT_SIZE} byte limit",
            input.len()
        )));
    }

    let root = dom::parse(input)?;
    if root.name != FAMILY_TREE {
        return Err(LineageError::format(format!(
            "root element is <{}>, expected <{FAMILY_TREE}>",
            root.name
        )));
    }

    let version = root.required_attr(ATTR_VERSION)?.trim();
    if version != FORMAT_VERSION.to_string() {
        return Err(LineageError::UnsupportedVersion {
            found: version.to_string(),
            expected: FORMAT_VERSION,
        });
    }

    let mut tree = FamilyTree::new(root.attr(ATTR_NAME).unwrap_or_default());

    for unknown in root
        .children
        .iter()
        .filter(|c| ![REGISTRIES, PICTURES, PEOPLE, LIFE_EVENTS].contains(&c.name.as_str()))
    {
        tracing::warn!(element = %unknown.name, "ignoring unknown section");
    }

    if let Some(registries) = root.child(REGISTRIES) {
        read_registries(&mut tree, registries)?;
        tracing::debug!(
            user_genders = tree.genders().user_entries().len(),
            user_life_event_types = tree.life_event_types().user_entries().len(),
            "registries read"
        );
    }

    let mut documents = DocumentCache::new(provider);
    if let Some(pictures) = root.child(PICTURES) {
        for picture in pictures.children_named(PICTURE) {
            let name = picture.required_attr(ATTR_NAME)?;
            let description = picture.child(DESCRIPTION).map(|d| d.text.as_str());
            let date = picture.child(DATE).map(read_date).transpose()?;
            documents.ensure(&mut tree, name, description, date.as_ref())?;
        }
        tracing::debug!(documents = tree.documents().count(), "documents read");
    }

    // Pass 1: persons and their raw links.
    let person_elements: Vec<&XmlElement> = root
        .child(PEOPLE)
        .map(|people| people.children_named(PERSON).collect())
        .unwrap_or_default();
    let mut ids = Vec::with_capacity(person_elements.len());
    let mut pending = Vec::with_capacity(person_elements.len());
    for element in &person_elements {
        let id = tree.add_person();
        read_person(&mut tree, id, element, &mut documents)?;
        pending.push(PendingLinks::collect(element)?);
        ids.push(id);
    }
    tracing::debug!(persons = ids.len(), "people read");

    // Pass 2: resolve indices now that every person exists.
    let persons = PersonIndex(&ids);
    for (&id, links) in ids.iter().zip(pending) {
        for (slot, index) in links.parents {
            tree.set_parent(id, slot, Some(persons.resolve(index)?))?;
        }
        for (kind, index) in links.relatives {
            tree.add_relative(id, persons.resolve(index)?, kind)?;
        }
    }
    tracing::debug!("person references resolved");

    match root.attr(ATTR_ROOT) {
        Some(raw) => {
            let index = parse_index(raw)?;
            tree.set_root(persons.resolve(index)?)?;
        }
        None if ids.is_empty() => {}
        None => return Err(LineageError::MissingRoot),
    }

    if let Some(events) = root.child(LIFE_EVENTS) {
        for element in events.children_named(LIFE_EVENT) {
            read_life_event(&mut tree, &persons, element, &mut documents)?;
        }
        tracing::debug!(events = tree.life_event_count(), "life events read");
    }

    Ok(tree)
}

// =============================================================================
// REFERENCES
// =============================================================================

struct PersonIndex<'a>(&'a [PersonId]);

impl PersonIndex<'_> {
    fn resolve(&self, index: usize) -> Result<PersonId, LineageError> {
        self.0
            .get(index)
            .copied()
            .ok_or(LineageError::DanglingReference {
                kind: "person",
                index,
                count: self.0.len(),
            })
    }

    fn resolve_refs(&self, list: Option<&XmlElement>) -> Result<Vec<PersonId>, LineageError> {
        list.into_iter()
            .flat_map(|l| l.children_named(PERSON))
            .map(|r| self.resolve(r.parse_required_attr(ATTR_ID)?))
            .collect()
    }
}

fn parse_index(raw: &str) -> Result<usize, LineageError> {
    raw.trim()
        .parse()
        .map_err(|_| LineageError::format(format!("'{raw}' is not a person index")))
}

/// Raw indices recorded in pass 1.
struct PendingLinks {
    parents: Vec<(ParentSlot, usize)>,
    relatives: Vec<(RelativeType, usize)>,
}

impl PendingLinks {
    fn collect(person: &XmlElement) -> Result<Self, LineageError> {
        let mut parents = Vec::new();
        if let Some(element) = person.child(PARENTS) {
            for (slot, attr) in [(ParentSlot::First, ATTR_ID1), (ParentSlot::Second, ATTR_ID2)] {
                if let Some(index) = element.parse_attr(attr)? {
                    parents.push((slot, index));
                }
            }
        }

        let mut relatives = Vec::new();
        if let Some(element) = person.child(RELATIVES) {
            for group in element.children_named(GROUP) {
                let kind = RelativeType::from_ordinal(group.parse_required_attr(ATTR_TYPE)?)?;
                for relative in group.children_named(RELATIVE) {
                    relatives.push((kind, relative.parse_required_attr(ATTR_ID)?));
                }
            }
        }

        Ok(Self { parents, relatives })
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Per-load cache: the provider is asked once per distinct file name.
struct DocumentCache<'p, P: ?Sized> {
    provider: &'p mut P,
    provided: BTreeSet<String>,
}

impl<'p, P: DocumentProvider + ?Sized> DocumentCache<'p, P> {
    fn new(provider: &'p mut P) -> Self {
        Self {
            provider,
            provided: BTreeSet::new(),
        }
    }

    fn ensure(
        &mut self,
        tree: &mut FamilyTree,
        name: &str,
        description: Option<&str>,
        date: Option<&DateTime>,
    ) -> Result<(), LineageError> {
        if self.provided.contains(name) {
            return Ok(());
        }
        validate_document_name(name)?;
        let mut document = self.provider.provide(name, description, date)?;
        document.name = name.to_string();
        tree.insert_loaded_document(document);
        self.provided.insert(name.to_string());
        Ok(())
    }

    /// Ensure a document referenced by a person or event. Names missing
    /// from the tree-level list are tolerated without metadata.
    fn ensure_referenced(&mut self, tree: &mut FamilyTree, name: &str) -> Result<(), LineageError> {
        if !self.provided.contains(name) {
            tracing::warn!(document = name, "picture not listed in tree pictures");
        }
        self.ensure(tree, name, None, None)
    }
}

/// Names listed under a `Pictures` child, with their `main` flag.
fn document_refs(element: &XmlElement) -> Result<Vec<(&str, bool)>, LineageError> {
    element
        .child(PICTURES)
        .into_iter()
        .flat_map(|p| p.children_named(PICTURE))
        .map(|picture| {
            let main = picture.parse_attr::<bool>(ATTR_MAIN)?.unwrap_or(false);
            Ok((picture.required_attr(ATTR_NAME)?, main))
        })
        .collect()
}

// =============================================================================
// REGISTRIES
// =============================================================================

/// Label of a user entry, falling back to the key name.
fn label_of(entry: &XmlElement, key: &RegistryEntryKey) -> String {
    match entry.attr(ATTR_LABEL) {
        Some(label) => label.to_string(),
        None => {
            tracing::warn!(key = %key, "registry entry has no label, using its name");
            key.name().to_string()
        }
    }
}

fn read_registries(tree: &mut FamilyTree, registries: &XmlElement) -> Result<(), LineageError> {
    if let Some(genders) = registries.child(GENDERS) {
        for entry in genders.children_named(ENTRY) {
            let key: RegistryEntryKey = entry.required_attr(ATTR_KEY)?.parse()?;
            let color: Color = entry.required_attr(ATTR_COLOR)?.parse()?;
            if key.is_builtin() {
                if !tree.genders().is_builtin(&key) {
                    return Err(LineageError::UndefinedBuiltinKey(key));
                }
                tree.set_gender_color(&key, color)?;
            } else {
                let label = label_of(entry, &key);
                tree.register_gender(key, label, color)?;
            }
        }
    }

    if let Some(types) = registries.child(LIFE_EVENT_TYPES) {
        for entry in types.children_named(ENTRY) {
            let key: RegistryEntryKey = entry.required_attr(ATTR_KEY)?.parse()?;
            if key.is_builtin() {
                // Builtin event types have no mutable fields to replay.
                if !tree.life_event_types().is_builtin(&key) {
                    return Err(LineageError::UndefinedBuiltinKey(key));
                }
                tracing::warn!(key = %key, "ignoring builtin life event type entry");
                continue;
            }
            let args = LifeEventTypeArgs {
                group: LifeEventGroup::from_ordinal(entry.parse_required_attr(ATTR_GROUP)?)?,
                indicates_death: entry.parse_attr(ATTR_INDICATES_DEATH)?.unwrap_or(false),
                indicates_union: entry.parse_attr(ATTR_INDICATES_UNION)?.unwrap_or(false),
                min_actors: entry.parse_required_attr(ATTR_MIN_ACTORS)?,
                max_actors: entry.parse_required_attr(ATTR_MAX_ACTORS)?,
                unique: entry.parse_attr(ATTR_UNIQUE)?.unwrap_or(false),
            };
            let label = label_of(entry, &key);
            tree.register_life_event_type(key, label, args)?;
        }
    }

    Ok(())
}

// =============================================================================
// DATES
// =============================================================================

fn wire_date(element: &XmlElement, attr: &str) -> Result<CalendarSpecificDateTime, LineageError> {
    CalendarSpecificDateTime::parse_wire(element.required_attr(attr)?)
}

fn read_date(element: &XmlElement) -> Result<DateTime, LineageError> {
    match element.required_attr(ATTR_TYPE)? {
        DATE_WITH_PRECISION => {
            let precision = DatePrecision::from_ordinal(element.parse_required_attr(ATTR_PRECISION)?)?;
            Ok(DateTime::with_precision(wire_date(element, ATTR_DATE)?, precision))
        }
        DATE_RANGE => DateTime::range(
            wire_date(element, ATTR_START)?,
            wire_date(element, ATTR_END)?,
        ),
        DATE_ALTERNATIVE => {
            let dates = element
                .children_named(DATE)
                .map(|candidate| wire_date(candidate, ATTR_DATE))
                .collect::<Result<Vec<_>, _>>()?;
            DateTime::alternative(dates)
        }
        other => Err(LineageError::format(format!("unknown date type '{other}'"))),
    }
}

// =============================================================================
// PERSONS
// =============================================================================

fn value_of<'a>(element: &'a XmlElement, tag: &str) -> Result<Option<&'a str>, LineageError> {
    element
        .child(tag)
        .map(|child| child.required_attr(ATTR_VALUE))
        .transpose()
}

fn names_of(element: &XmlElement, tag: &str) -> Result<Vec<String>, LineageError> {
    element
        .child(tag)
        .into_iter()
        .flat_map(|list| list.children_named(NAME))
        .map(|name| name.required_attr(ATTR_VALUE).map(str::to_string))
        .collect()
}

fn key_of(element: &XmlElement, tag: &str) -> Result<Option<RegistryEntryKey>, LineageError> {
    element
        .child(tag)
        .map(|child| child.required_attr(ATTR_KEY)?.parse())
        .transpose()
}

fn notes_of(element: &XmlElement) -> Option<String> {
    element.child(NOTES).map(|notes| notes.text.clone())
}

fn sources_of(element: &XmlElement) -> Vec<String> {
    element
        .child(SOURCES)
        .into_iter()
        .flat_map(|sources| sources.children_named(SOURCE))
        .map(|source| source.text.clone())
        .collect()
}

fn read_person<P>(
    tree: &mut FamilyTree,
    id: PersonId,
    element: &XmlElement,
    documents: &mut DocumentCache<'_, P>,
) -> Result<(), LineageError>
where
    P: DocumentProvider + ?Sized,
{
    if let Some(status) = element.child(LIFE_STATUS) {
        let status = LifeStatus::from_ordinal(status.parse_required_attr(ATTR_VALUE)?)?;
        tree.set_life_status(id, status)?;
    }
    tree.set_gender(id, key_of(element, GENDER)?)?;
    tree.set_assigned_gender_at_birth(id, key_of(element, ASSIGNED_GENDER_AT_BIRTH)?)?;

    let disambiguation_id = match element.child(DISAMBIGUATION_ID) {
        Some(child) => Some(child.parse_required_attr::<NonZeroU32>(ATTR_VALUE)?),
        None => None,
    };
    let legal_last_name = value_of(element, LEGAL_LAST_NAME)?.map(str::to_string);
    let public_last_name = value_of(element, PUBLIC_LAST_NAME)?.map(str::to_string);
    let main_occupation = value_of(element, MAIN_OCCUPATION)?.map(str::to_string);
    let legal_first_names = names_of(element, LEGAL_FIRST_NAMES)?;
    let public_first_names = names_of(element, PUBLIC_FIRST_NAMES)?;
    let nicknames = names_of(element, NICKNAMES)?;

    let person = tree
        .person_mut(id)
        .ok_or(LineageError::PersonNotFound(id))?;
    person.disambiguation_id = disambiguation_id;
    person.legal_last_name = legal_last_name;
    person.public_last_name = public_last_name;
    person.legal_first_names = legal_first_names;
    person.public_first_names = public_first_names;
    person.nicknames = nicknames;
    person.main_occupation = main_occupation;
    person.notes = notes_of(element);
    person.sources = sources_of(element);

    for (name, main) in document_refs(element)? {
        documents.ensure_referenced(tree, name)?;
        tree.attach_document_to_person(id, name, main)?;
    }

    Ok(())
}

// =============================================================================
// LIFE EVENTS
// =============================================================================

fn read_life_event<P>(
    tree: &mut FamilyTree,
    persons: &PersonIndex<'_>,
    element: &XmlElement,
    documents: &mut DocumentCache<'_, P>,
) -> Result<(), LineageError>
where
    P: DocumentProvider + ?Sized,
{
    let date = read_date(element.required_child(DATE)?)?;
    let kind = key_of(element, TYPE)?
        .ok_or_else(|| LineageError::format(format!("<{LIFE_EVENT}> is missing child <{TYPE}>")))?;
    let actors = persons.resolve_refs(element.child(ACTORS))?;
    let witnesses = persons.resolve_refs(element.child(WITNESSES))?;

    let place = match element.child(PLACE) {
        Some(place) => {
            let mut parsed = Place::new(place.required_attr(ATTR_ADDRESS)?);
            if let Some(latlon) = place.attr(ATTR_LATLON) {
                parsed = parsed.with_latlon(latlon.parse::<LatLon>()?);
            }
            Some(parsed)
        }
        None => None,
    };

    let event = tree.add_life_event(date, kind, actors)?;
    for witness in witnesses {
        tree.add_witness(event, witness)?;
    }

    let record = tree
        .life_event_mut(event)
        .ok_or(LineageError::LifeEventNotFound(event))?;
    record.place = place;
    record.notes = notes_of(element);
    record.sources = sources_of(element);

    for (name, _) in document_refs(element)? {
        documents.ensure_referenced(tree, name)?;
        tree.attach_document_to_event(event, name)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AttachedDocument;
    use crate::registry::RegistryEntry;

    fn wrap(body: &str, root: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <FamilyTree version=\"1\" name=\"T\"{root}>\n{body}\n</FamilyTree>"
        )
    }

    #[test]
    fn rejects_other_versions() {
        let err = read_tree_with_metadata("<FamilyTree version=\"2\" name=\"x\"/>").expect_err("version");
        assert!(matches!(err, LineageError::Load(_)));
        assert!(matches!(
            err.cause(),
            LineageError::UnsupportedVersion { expected: 1, .. }
        ));
    }

    #[test]
    fn rejects_wrong_root_element() {
        let err = read_tree_with_metadata("<Tree version=\"1\"/>").expect_err("root element");
        assert!(matches!(err.cause(), LineageError::Format(_)));
    }

    #[test]
    fn parents_resolve_forward_references() {
        // The first person's parent appears later in the list.
        let xml = wrap(
            r#"<People>
  <Person><LegalFirstNames><Name value="Child"/></LegalFirstNames><Parents id1="1"/></Person>
  <Person><LegalFirstNames><Name value="Parent"/></LegalFirstNames></Person>
</People>"#,
            " root=\"0\"",
        );
        let tree = read_tree_with_metadata(&xml).expect("load");
        let child = tree.persons().next().expect("child");
        let parent = child.parent(ParentSlot::First).expect("parent");
        assert_eq!(
            tree.person(parent).map(|p| p.display_name()).as_deref(),
            Some("Parent")
        );
    }

    #[test]
    fn tolerated_anomalies_still_load() {
        let xml = wrap(
            r##"<Extensions><Anything/></Extensions>
<Registries>
  <Genders><Entry key="user:teal" color="#008080"/></Genders>
  <LifeEventTypes><Entry key="builtin:birth"/></LifeEventTypes>
</Registries>
<People>
  <Person><Pictures><Picture name="unlisted.png" main="true"/></Pictures></Person>
</People>"##,
            " root=\"0\"",
        );
        let tree = read_tree_with_metadata(&xml).expect("load");
        let teal = tree
            .genders()
            .get(&"user:teal".parse().expect("key"))
            .expect("teal");
        assert_eq!(teal.label(), Some("teal"));
        assert!(tree.document("unlisted.png").is_some());
        let person = tree.persons().next().expect("person");
        assert_eq!(person.main_picture(), Some("unlisted.png"));
    }

    #[test]
    fn dangling_parent_index_aborts() {
        let xml = wrap(r#"<People><Person><Parents id2="7"/></Person></People>"#, " root=\"0\"");
        let err = read_tree_with_metadata(&xml).expect_err("dangling");
        assert!(matches!(
            err.cause(),
            LineageError::DanglingReference { index: 7, count: 1, .. }
        ));
    }

    #[test]
    fn missing_root_only_allowed_when_empty() {
        assert!(read_tree_with_metadata(&wrap("", "")).is_ok());

        let xml = wrap("<People><Person/></People>", "");
        let err = read_tree_with_metadata(&xml).expect_err("no root");
        assert!(matches!(err.cause(), LineageError::MissingRoot));
    }

    #[test]
    fn undefined_builtin_key_rejected() {
        let xml = wrap(
            r##"<Registries><Genders><Entry key="builtin:nonexistent" color="#000000"/></Genders></Registries>"##,
            "",
        );
        let err = read_tree_with_metadata(&xml).expect_err("builtin");
        assert!(matches!(err.cause(), LineageError::UndefinedBuiltinKey(_)));
    }

    #[test]
    fn bad_group_ordinal_is_invalid_argument() {
        let xml = wrap(
            r#"<Registries><LifeEventTypes><Entry key="user:x" label="X" group="99" min_actors="1" max_actors="1"/></LifeEventTypes></Registries>"#,
            "",
        );
        let err = read_tree_with_metadata(&xml).expect_err("group");
        assert!(matches!(err.cause(), LineageError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_gender_reference_rejected() {
        let xml = wrap(r#"<People><Person><Gender key="user:crimson"/></Person></People>"#, " root=\"0\"");
        let err = read_tree_with_metadata(&xml).expect_err("gender");
        assert!(matches!(err.cause(), LineageError::UnknownRegistryKey(_)));
    }

    #[test]
    fn provider_called_once_per_name() {
        let xml = wrap(
            r#"<Pictures><Picture name="a.png"><Description>Portrait</Description></Picture></Pictures>
<People>
  <Person><Pictures><Picture name="a.png" main="true"/><Picture name="b.png"/></Pictures></Person>
  <Person><Pictures><Picture name="b.png"/></Pictures></Person>
</People>"#,
            " root=\"0\"",
        );
        let mut calls: Vec<String> = Vec::new();
        let mut provider = |name: &str,
                            description: Option<&str>,
                            _: Option<&DateTime>|
         -> Result<AttachedDocument, LineageError> {
            calls.push(name.to_string());
            let mut document = AttachedDocument::new(name);
            document.description = description.map(str::to_string);
            Ok(document)
        };

        let tree = read_tree(&xml, &mut provider).expect("load");
        assert_eq!(calls, vec!["a.png".to_string(), "b.png".to_string()]);
        assert_eq!(
            tree.document("a.png").and_then(|d| d.description.as_deref()),
            Some("Portrait")
        );
        let first = tree.persons().next().expect("first");
        assert_eq!(first.main_picture(), Some("a.png"));
    }

    #[test]
    fn path_like_document_names_rejected() {
        let xml = wrap(r#"<Pictures><Picture name="../etc/passwd"/></Pictures>"#, "");
        let err = read_tree_with_metadata(&xml).expect_err("path");
        assert!(matches!(err.cause(), LineageError::InvalidArgument(_)));
    }

    #[test]
    fn event_witness_that_is_actor_rejected() {
        let xml = wrap(
            r#"<People><Person/></People>
<LifeEvents>
  <LifeEvent>
    <Date type="with_precision" date="1900-01-01;gregorian" precision="0"/>
    <Type key="builtin:birth"/>
    <Actors><Person id="0"/></Actors>
    <Witnesses><Person id="0"/></Witnesses>
  </LifeEvent>
</LifeEvents>"#,
            " root=\"0\"",
        );
        let err = read_tree_with_metadata(&xml).expect_err("witness");
        assert!(matches!(err.cause(), LineageError::InvalidArgument(_)));
    }
}
