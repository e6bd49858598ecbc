//! Element and attribute names of the tree document, version 1.
//!
//! Renaming anything here is a format change and requires bumping
//! `FORMAT_VERSION`.

// Root
pub const FAMILY_TREE: &str = "FamilyTree";
pub const ATTR_VERSION: &str = "version";
pub const ATTR_NAME: &str = "name";
pub const ATTR_ROOT: &str = "root";

// Registries
pub const REGISTRIES: &str = "Registries";
pub const GENDERS: &str = "Genders";
pub const LIFE_EVENT_TYPES: &str = "LifeEventTypes";
pub const ENTRY: &str = "Entry";
pub const ATTR_KEY: &str = "key";
pub const ATTR_LABEL: &str = "label";
pub const ATTR_COLOR: &str = "color";
pub const ATTR_GROUP: &str = "group";
pub const ATTR_MIN_ACTORS: &str = "min_actors";
pub const ATTR_MAX_ACTORS: &str = "max_actors";
pub const ATTR_INDICATES_DEATH: &str = "indicates_death";
pub const ATTR_INDICATES_UNION: &str = "indicates_union";
pub const ATTR_UNIQUE: &str = "unique";

// Documents
pub const PICTURES: &str = "Pictures";
pub const PICTURE: &str = "Picture";
pub const ATTR_MAIN: &str = "main";
pub const DESCRIPTION: &str = "Description";

// Dates
pub const DATE: &str = "Date";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_DATE: &str = "date";
pub const ATTR_PRECISION: &str = "precision";
pub const ATTR_START: &str = "start";
pub const ATTR_END: &str = "end";
pub const DATE_WITH_PRECISION: &str = "with_precision";
pub const DATE_RANGE: &str = "range";
pub const DATE_ALTERNATIVE: &str = "alternative";

// Persons
pub const PEOPLE: &str = "People";
pub const PERSON: &str = "Person";
pub const DISAMBIGUATION_ID: &str = "DisambiguationID";
pub const LIFE_STATUS: &str = "LifeStatus";
pub const LEGAL_LAST_NAME: &str = "LegalLastName";
pub const PUBLIC_LAST_NAME: &str = "PublicLastName";
pub const LEGAL_FIRST_NAMES: &str = "LegalFirstNames";
pub const PUBLIC_FIRST_NAMES: &str = "PublicFirstNames";
pub const NICKNAMES: &str = "Nicknames";
pub const NAME: &str = "Name";
pub const GENDER: &str = "Gender";
pub const ASSIGNED_GENDER_AT_BIRTH: &str = "AssignedGenderAtBirth";
pub const MAIN_OCCUPATION: &str = "MainOccupation";
pub const PARENTS: &str = "Parents";
pub const ATTR_ID1: &str = "id1";
pub const ATTR_ID2: &str = "id2";
pub const RELATIVES: &str = "Relatives";
pub const GROUP: &str = "Group";
pub const RELATIVE: &str = "Relative";
pub const ATTR_ID: &str = "id";
pub const ATTR_VALUE: &str = "value";

// Shared by persons and events
pub const NOTES: &str = "Notes";
pub const SOURCES: &str = "Sources";
pub const SOURCE: &str = "Source";

// Life events
pub const LIFE_EVENTS: &str = "LifeEvents";
pub const LIFE_EVENT: &str = "LifeEvent";
pub const TYPE: &str = "Type";
pub const PLACE: &str = "Place";
pub const ATTR_ADDRESS: &str = "address";
pub const ATTR_LATLON: &str = "latlon";
pub const ACTORS: &str = "Actors";
pub const WITNESSES: &str = "Witnesses";
