//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the model is INVALID.
//!
//! ## Tiers
//! - T0: Date Integrity
//! - T1: Registry Integrity
//! - T2: Entity Graph Invariants
//! - T3: Persistence Round Trip

use lineage_core::{
    read_tree_with_metadata, write_tree, CalendarSpecificDateTime, Color, DatePrecision, DateTime,
    FamilyTree, LatLon, LifeEventGroup, LifeEventTypeArgs, LifeStatus, LineageError, ParentSlot,
    PersonId, Place, RegistryEntryKey, RelativeType,
};

fn key(s: &str) -> RegistryEntryKey {
    s.parse().expect("key")
}

fn gregorian(y: i32, m: u32, d: u32) -> CalendarSpecificDateTime {
    CalendarSpecificDateTime::gregorian(y, m, d).expect("date")
}

// =============================================================================
// TIER T0: DATE INTEGRITY
// =============================================================================

mod t0_date_integrity {
    use super::*;
    use lineage_core::calendar::julian;
    use lineage_core::primitives::MAX_DATES;

    /// T0.1: Alternative arity is bounded on both sides.
    #[test]
    fn alternative_arity() {
        let d = gregorian(1850, 1, 1);
        assert!(matches!(
            DateTime::alternative(vec![d]),
            Err(LineageError::InvalidArgument(_))
        ));
        assert!(DateTime::alternative(vec![d, d]).is_ok());
        assert!(matches!(
            DateTime::alternative(vec![d; MAX_DATES + 1]),
            Err(LineageError::InvalidArgument(_))
        ));
    }

    /// T0.2: Range start must precede end.
    #[test]
    fn range_ordering() {
        let early = gregorian(1850, 1, 1);
        let late = gregorian(1851, 1, 1);
        assert!(DateTime::range(early, late).is_ok());
        assert!(DateTime::range(late, early).is_err());
        assert!(DateTime::range(early, early).is_err());
    }

    /// T0.3: Wire format errors map to distinct kinds.
    #[test]
    fn wire_errors() {
        assert!(matches!(
            CalendarSpecificDateTime::parse_wire("1850-03-12"),
            Err(LineageError::Format(_))
        ));
        assert!(matches!(
            CalendarSpecificDateTime::parse_wire("1850-03-12;hebrew"),
            Err(LineageError::UnknownCalendar(_))
        ));
    }

    /// T0.4: Dates in different calendars compare on one timeline.
    #[test]
    fn cross_calendar_ordering() {
        let julian_date =
            DateTime::exact(CalendarSpecificDateTime::new(julian(), 1700, 1, 1).expect("julian"));
        let gregorian_date = DateTime::exact(gregorian(1700, 1, 5));
        // Julian 1700-01-01 is Gregorian 1700-01-11.
        assert!(gregorian_date.cmp_chronological(&julian_date).is_lt());
    }
}

// =============================================================================
// TIER T1: REGISTRY INTEGRITY
// =============================================================================

mod t1_registry_integrity {
    use super::*;

    /// T1.1: Builtin keys cannot be registered again or removed.
    #[test]
    fn builtins_are_protected() {
        let mut tree = FamilyTree::new("t");
        assert!(matches!(
            tree.register_gender(key("builtin:female"), "F", Color::rgb(0, 0, 0)),
            Err(LineageError::DuplicateKey(_))
        ));
        assert!(matches!(
            tree.remove_gender(&key("builtin:female")),
            Err(LineageError::BuiltinProtected(_))
        ));
        assert!(matches!(
            tree.remove_life_event_type(&key("builtin:birth")),
            Err(LineageError::BuiltinProtected(_))
        ));
    }

    /// T1.2: Two trees never share user entries.
    #[test]
    fn registries_are_per_tree() {
        let mut a = FamilyTree::new("a");
        let b = FamilyTree::new("b");
        a.register_gender(key("user:crimson"), "Crimson", Color::rgb(0xAA, 0, 0xAA))
            .expect("register");

        assert!(a.genders().contains(&key("user:crimson")));
        assert!(!b.genders().contains(&key("user:crimson")));
    }

    /// T1.3: Unused user types can be removed.
    #[test]
    fn unused_user_type_removable() {
        let mut tree = FamilyTree::new("t");
        let knighting = key("user:knighting");
        tree.register_life_event_type(
            knighting.clone(),
            "Knighting",
            LifeEventTypeArgs::single(LifeEventGroup::Distinction),
        )
        .expect("register");
        tree.remove_life_event_type(&knighting).expect("remove");
        assert!(tree.life_event_type(&knighting).is_none());
    }
}

// =============================================================================
// TIER T2: ENTITY GRAPH INVARIANTS
// =============================================================================

mod t2_entity_graph {
    use super::*;

    /// T2.1: A person is never its own parent or relative.
    #[test]
    fn no_self_edges() {
        let mut tree = FamilyTree::new("t");
        let a = tree.add_person();
        assert!(matches!(
            tree.set_parent(a, ParentSlot::First, Some(a)),
            Err(LineageError::SelfReference(_))
        ));
        assert!(matches!(
            tree.add_relative(a, a, RelativeType::Godparent),
            Err(LineageError::SelfReference(_))
        ));
    }

    /// T2.1b: Links to persons outside the tree are refused when made, so
    /// the tree stays saveable.
    #[test]
    fn non_member_links_refused() {
        let mut tree = FamilyTree::new("t");
        let a = tree.add_person();
        tree.set_root(a).expect("root");

        assert!(matches!(
            tree.set_parent(a, ParentSlot::First, Some(PersonId(99))),
            Err(LineageError::NotMember(PersonId(99)))
        ));
        assert!(matches!(
            tree.add_relative(a, PersonId(77), RelativeType::Godparent),
            Err(LineageError::NotMember(PersonId(77)))
        ));

        let person = tree.require_person(a).expect("a");
        assert_eq!(person.parents(), [None, None]);
        assert_eq!(person.relatives().count(), 0);
        assert!(write_tree(&tree).is_ok());
    }

    /// T2.2: A builtin type with max one actor rejects two.
    #[test]
    fn actor_count_bounds() {
        let mut tree = FamilyTree::new("t");
        let a = tree.add_person();
        let b = tree.add_person();
        let result = tree.add_life_event(DateTime::exact(gregorian(1900, 1, 1)), key("builtin:death"), [a, b]);
        assert!(matches!(result, Err(LineageError::ActorCount { max: 1, count: 2, .. })));

        // Nothing changed on failure.
        assert_eq!(tree.life_event_count(), 0);
        assert_eq!(tree.require_person(a).expect("a").life_status(), LifeStatus::Living);
    }

    /// T2.3: Removing the sole actor of a unique event removes the event
    /// from the tree and from every witness.
    #[test]
    fn cascade_removes_orphaned_event() {
        let mut tree = FamilyTree::new("t");
        let subject = tree.add_person();
        let w1 = tree.add_person();
        let w2 = tree.add_person();
        let birth = tree
            .add_life_event(DateTime::exact(gregorian(1900, 1, 1)), key("builtin:birth"), [subject])
            .expect("birth");
        tree.add_witness(birth, w1).expect("w1");
        tree.add_witness(birth, w2).expect("w2");

        tree.remove_person(subject).expect("remove");

        assert!(tree.life_event(birth).is_none());
        assert_eq!(tree.life_event_count(), 0);
        for witness in [w1, w2] {
            assert!(tree.life_events_of(witness).is_empty());
        }
    }

    /// T2.4: An event keeping enough actors survives a removal.
    #[test]
    fn cascade_keeps_valid_event() {
        let mut tree = FamilyTree::new("t");
        let a = tree.add_person();
        let b = tree.add_person();
        let c = tree.add_person();
        let residence = tree
            .add_life_event(DateTime::exact(gregorian(1900, 1, 1)), key("builtin:residence"), [a, b, c])
            .expect("residence");

        tree.remove_person(b).expect("remove");
        let event = tree.life_event(residence).expect("event");
        assert_eq!(event.actors().len(), 2);
    }

    /// T2.5: Events of a person come back oldest first.
    #[test]
    fn life_events_are_chronological() {
        let mut tree = FamilyTree::new("t");
        let a = tree.add_person();
        let death = tree
            .add_life_event(DateTime::exact(gregorian(1950, 1, 1)), key("builtin:death"), [a])
            .expect("death");
        let birth = tree
            .add_life_event(DateTime::exact(gregorian(1880, 1, 1)), key("builtin:birth"), [a])
            .expect("birth");

        let ids: Vec<_> = tree.life_events_of(a).iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![birth, death]);
    }
}

// =============================================================================
// TIER T3: PERSISTENCE ROUND TRIP
// =============================================================================

mod t3_persistence {
    use super::*;

    fn family() -> FamilyTree {
        let mut tree = FamilyTree::new("Schmidt family");
        tree.register_gender(key("user:crimson"), "Crimson", "#AA00AA".parse().expect("color"))
            .expect("gender");

        let father = tree.add_person();
        let mother = tree.add_person();
        let child = tree.add_person();
        let godmother = tree.add_person();

        let p = tree.person_mut(father).expect("father");
        p.legal_first_names = vec!["Johann".to_string(), "Georg".to_string()];
        p.legal_last_name = Some("Schmidt".to_string());
        p.main_occupation = Some("Smith".to_string());
        tree.set_gender(father, Some(key("builtin:male"))).expect("gender");

        let p = tree.person_mut(mother).expect("mother");
        p.legal_first_names = vec!["Anna".to_string()];
        p.nicknames = vec!["Anni".to_string()];
        tree.set_gender(mother, Some(key("user:crimson"))).expect("gender");

        tree.person_mut(child).expect("child").legal_first_names = vec!["Karl".to_string()];
        tree.set_parent(child, ParentSlot::First, Some(father)).expect("p1");
        tree.set_parent(child, ParentSlot::Second, Some(mother)).expect("p2");
        tree.add_relative(child, godmother, RelativeType::Godparent)
            .expect("godparent");
        tree.set_root(child).expect("root");

        let birth = tree
            .add_life_event(
                DateTime::with_precision(gregorian(1850, 3, 12), DatePrecision::About),
                key("builtin:birth"),
                [child],
            )
            .expect("birth");
        tree.add_witness(birth, godmother).expect("witness");
        let event = tree.life_event_mut(birth).expect("event");
        event.place = Some(Place::new("Leipzig").with_latlon(LatLon::new(51.34, 12.37).expect("latlon")));
        event.sources = vec!["Parish register".to_string()];

        tree.add_life_event(
            DateTime::range(gregorian(1845, 1, 1), gregorian(1846, 1, 1)).expect("range"),
            key("builtin:marriage"),
            [father, mother],
        )
        .expect("marriage");
        tree.add_life_event(
            DateTime::alternative(vec![gregorian(1900, 1, 1), gregorian(1901, 1, 1)]).expect("alternative"),
            key("builtin:death"),
            [father],
        )
        .expect("death");

        tree
    }

    /// T3.1: Structure survives a round trip.
    #[test]
    fn round_trip_preserves_structure() {
        let tree = family();
        let restored = read_tree_with_metadata(&write_tree(&tree).expect("write")).expect("read");

        assert_eq!(restored.name(), "Schmidt family");
        assert_eq!(restored.person_count(), tree.person_count());
        assert_eq!(restored.life_event_count(), tree.life_event_count());

        let root = restored.require_person(restored.root().expect("root")).expect("root person");
        assert_eq!(root.display_name(), "Karl");
        let father = restored
            .require_person(root.parent(ParentSlot::First).expect("father"))
            .expect("father");
        assert_eq!(father.display_name(), "Johann Georg Schmidt");
        assert_eq!(father.life_status(), LifeStatus::Deceased);
        assert_eq!(root.relatives().count(), 1);

        let birth = restored
            .life_events()
            .find(|e| e.event_type() == &key("builtin:birth"))
            .expect("birth");
        assert_eq!(birth.witnesses().len(), 1);
        assert_eq!(birth.place.as_ref().map(|p| p.address.as_str()), Some("Leipzig"));
        assert!(matches!(birth.date, DateTime::WithPrecision(ref d) if d.precision == DatePrecision::About));
    }

    /// T3.2: Write, read, write produces identical bytes.
    #[test]
    fn output_is_byte_stable() {
        let first = write_tree(&family()).expect("write");
        let second = write_tree(&read_tree_with_metadata(&first).expect("read")).expect("write");
        assert_eq!(first, second);
    }

    /// T3.3: A user gender keeps its exact key and color.
    #[test]
    fn user_gender_round_trip() {
        let restored = read_tree_with_metadata(&write_tree(&family()).expect("write")).expect("read");
        let crimson = restored.genders().get(&key("user:crimson")).expect("crimson");
        assert_eq!(crimson.color().to_string(), "#AA00AA");
    }

    /// T3.4: Root index out of range fails without a partial tree.
    #[test]
    fn dangling_root_rejected() {
        let xml = write_tree(&family()).expect("write").replace("root=\"2\"", "root=\"9\"");
        let err = read_tree_with_metadata(&xml).expect_err("dangling root");
        assert!(matches!(err, LineageError::Load(_)));
        assert!(matches!(err.cause(), LineageError::DanglingReference { index: 9, count: 4, .. }));
    }

    /// T3.5: A hand-edited file with two actors on a one-actor type fails.
    #[test]
    fn hand_edited_actor_count_rejected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<FamilyTree version="1" name="edited" root="0">
  <People>
    <Person/>
    <Person/>
  </People>
  <LifeEvents>
    <LifeEvent>
      <Date type="with_precision" date="1900-01-01;gregorian" precision="0"/>
      <Type key="builtin:birth"/>
      <Actors>
        <Person id="0"/>
        <Person id="1"/>
      </Actors>
    </LifeEvent>
  </LifeEvents>
</FamilyTree>"#;
        let err = read_tree_with_metadata(xml).expect_err("actor count");
        assert!(matches!(err.cause(), LineageError::ActorCount { count: 2, .. }));
    }

    /// T3.6: Unknown type keys in events are rejected.
    #[test]
    fn unknown_event_type_rejected() {
        let xml = write_tree(&family())
            .expect("write")
            .replace("builtin:marriage", "user:handfasting");
        let err = read_tree_with_metadata(&xml).expect_err("unknown type");
        assert!(matches!(err.cause(), LineageError::UnknownRegistryKey(_)));
    }

    /// T3.7: Documents and their references survive.
    #[test]
    fn documents_round_trip() {
        let mut tree = family();
        let root = tree.root().expect("root");
        let mut portrait = lineage_core::AttachedDocument::new("portrait.jpg");
        portrait.description = Some("Studio portrait".to_string());
        portrait.date = Some(DateTime::exact(gregorian(1870, 6, 1)));
        tree.add_document(portrait, None).expect("document");
        tree.attach_document_to_person(root, "portrait.jpg", true)
            .expect("attach");

        let first = write_tree(&tree).expect("write");
        let restored = read_tree_with_metadata(&first).expect("read");
        let document = restored.document("portrait.jpg").expect("document");
        assert_eq!(document.description.as_deref(), Some("Studio portrait"));
        assert!(document.date.is_some());
        let root = restored.require_person(restored.root().expect("root")).expect("root");
        assert_eq!(root.main_picture(), Some("portrait.jpg"));
        assert_eq!(write_tree(&restored).expect("write"), first);
    }

    /// T3.8: A registry section listing the same user key twice fails.
    #[test]
    fn duplicate_registry_key_rejected() {
        let xml = r##"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<FamilyTree version="1" name="edited">
  <Registries>
    <Genders>
      <Entry key="user:teal" label="Teal" color="#008080"/>
      <Entry key="user:teal" label="Teal again" color="#008081"/>
    </Genders>
  </Registries>
</FamilyTree>"##;
        let err = read_tree_with_metadata(xml).expect_err("duplicate key");
        assert!(matches!(err, LineageError::Load(_)));
        assert!(matches!(err.cause(), LineageError::DuplicateKey(k) if k == &key("user:teal")));
    }

    /// T3.9: Both parent slots naming the same person fails.
    #[test]
    fn identical_parents_rejected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<FamilyTree version="1" name="edited" root="0">
  <People>
    <Person>
      <Parents id1="1" id2="1"/>
    </Person>
    <Person/>
  </People>
</FamilyTree>"#;
        let err = read_tree_with_metadata(xml).expect_err("identical parents");
        assert!(matches!(err, LineageError::Load(_)));
        assert!(matches!(err.cause(), LineageError::IdenticalParents(_)));
    }

    /// T3.10: Two parents plus a genetic donor exceed the genetic limit.
    #[test]
    fn genetic_parent_limit_rejected() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<FamilyTree version="1" name="edited" root="0">
  <People>
    <Person>
      <Parents id1="1" id2="2"/>
      <Relatives>
        <Group type="3">
          <Relative id="3"/>
        </Group>
      </Relatives>
    </Person>
    <Person/>
    <Person/>
    <Person/>
  </People>
</FamilyTree>"#;
        let err = read_tree_with_metadata(xml).expect_err("genetic limit");
        assert!(matches!(err, LineageError::Load(_)));
        assert!(matches!(err.cause(), LineageError::GeneticParentLimit(_)));
    }

    /// T3.11: Whitespace-only notes and sources come back unchanged.
    #[test]
    fn whitespace_text_round_trip() {
        let mut tree = family();
        let root = tree.root().expect("root");
        let person = tree.person_mut(root).expect("root person");
        person.notes = Some("   ".to_string());
        person.sources = vec!["\n".to_string(), String::new()];

        let first = write_tree(&tree).expect("write");
        let restored = read_tree_with_metadata(&first).expect("read");
        let person = restored.require_person(restored.root().expect("root")).expect("root");
        assert_eq!(person.notes.as_deref(), Some("   "));
        assert_eq!(person.sources, vec!["\n".to_string(), String::new()]);
        assert_eq!(write_tree(&restored).expect("write"), first);
    }
}
