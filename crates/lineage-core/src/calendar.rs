//! # Calendar and Date Model
//!
//! Pure value types for dates in a genealogy record.
//!
//! A `CalendarSpecificDateTime` is a point in time expressed in the fields of
//! one calendar system. Every such value converts to a canonical instant in
//! the proleptic Gregorian calendar, which is what ordering uses across
//! calendars.
//!
//! A `DateTime` adds imprecision on top of that, as a closed sum type:
//! - `WithPrecision`: one date qualified as exact, about, possibly, before or after
//! - `Range`: a start strictly before an end
//! - `Alternative`: 2..=`MAX_DATES` mutually exclusive candidates
//!
//! ## Wire Form
//!
//! A single date serializes as `<calendar value>;<calendar name>`, for example
//! `1850-03-12;gregorian` or `1701-02-28T14:30;julian`.

use crate::primitives::{CALENDAR_SEPARATOR, MAX_DATES, MIN_ALTERNATIVE_DATES};
use crate::LineageError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Offset between a Julian Day Number and chrono's days-from-CE count.
const JDN_CE_OFFSET: i64 = 1_721_425;

// =============================================================================
// CALENDAR SYSTEMS
// =============================================================================

/// A calendar system able to validate its own fields and map them onto the
/// canonical timeline.
pub trait CalendarSystem: Send + Sync + fmt::Debug {
    /// Stable name used in the wire form.
    fn name(&self) -> &'static str;

    /// Number of days in `month` of `year`, or `None` for an invalid month.
    fn days_in_month(&self, year: i32, month: u32) -> Option<u32>;

    /// Convert a validated year/month/day to a proleptic Gregorian date.
    fn to_iso_date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate>;
}

/// The proleptic Gregorian calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gregorian;

/// The proleptic Julian calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Julian;

static GREGORIAN: Gregorian = Gregorian;
static JULIAN: Julian = Julian;

/// Every calendar system known to this build, in lookup order.
static CALENDARS: [&dyn CalendarSystem; 2] = [&GREGORIAN, &JULIAN];

fn month_length(month: u32, leap: bool) -> Option<u32> {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => Some(31),
        4 | 6 | 9 | 11 => Some(30),
        2 if leap => Some(29),
        2 => Some(28),
        _ => None,
    }
}

impl CalendarSystem for Gregorian {
    fn name(&self) -> &'static str {
        "gregorian"
    }

    fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
        let leap = year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0);
        month_length(month, leap)
    }

    fn to_iso_date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl CalendarSystem for Julian {
    fn name(&self) -> &'static str {
        "julian"
    }

    fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
        month_length(month, year.rem_euclid(4) == 0)
    }

    fn to_iso_date(&self, year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        // Julian Day Number, integer form.
        let a = (14 - i64::from(month)) / 12;
        let y = i64::from(year) + 4800 - a;
        let m = i64::from(month) + 12 * a - 3;
        let jdn = i64::from(day) + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32_083;
        let days = i32::try_from(jdn - JDN_CE_OFFSET).ok()?;
        NaiveDate::from_num_days_from_ce_opt(days)
    }
}

/// The default calendar for new dates.
#[must_use]
pub fn gregorian() -> &'static dyn CalendarSystem {
    &GREGORIAN
}

/// The Julian calendar.
#[must_use]
pub fn julian() -> &'static dyn CalendarSystem {
    &JULIAN
}

/// Look up a calendar system by its wire name.
pub fn calendar_by_name(name: &str) -> Result<&'static dyn CalendarSystem, LineageError> {
    CALENDARS
        .iter()
        .copied()
        .find(|calendar| calendar.name() == name)
        .ok_or_else(|| LineageError::UnknownCalendar(name.to_string()))
}

// =============================================================================
// CALENDAR SPECIFIC DATE TIME
// =============================================================================

/// A date, optionally with a time of day, expressed in one calendar system.
#[derive(Debug, Clone, Copy)]
pub struct CalendarSpecificDateTime {
    calendar: &'static dyn CalendarSystem,
    year: i32,
    month: u32,
    day: u32,
    time: Option<(u32, u32)>,
    instant: NaiveDateTime,
}

impl CalendarSpecificDateTime {
    /// Create a date from calendar fields.
    ///
    /// Fails with `InvalidArgument` if the day does not exist in that calendar.
    pub fn new(
        calendar: &'static dyn CalendarSystem,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Self, LineageError> {
        Self::build(calendar, year, month, day, None)
    }

    /// Create a Gregorian date.
    pub fn gregorian(year: i32, month: u32, day: u32) -> Result<Self, LineageError> {
        Self::new(gregorian(), year, month, day)
    }

    /// Return a copy with a time of day attached.
    pub fn with_time(self, hour: u32, minute: u32) -> Result<Self, LineageError> {
        Self::build(self.calendar, self.year, self.month, self.day, Some((hour, minute)))
    }

    fn build(
        calendar: &'static dyn CalendarSystem,
        year: i32,
        month: u32,
        day: u32,
        time: Option<(u32, u32)>,
    ) -> Result<Self, LineageError> {
        let invalid = || {
            LineageError::InvalidArgument(format!(
                "{}-{month:02}-{day:02} is not a valid {} date",
                format_year(year),
                calendar.name()
            ))
        };

        let max_day = calendar.days_in_month(year, month).ok_or_else(invalid)?;
        if day == 0 || day > max_day {
            return Err(invalid());
        }
        let date = calendar.to_iso_date(year, month, day).ok_or_else(invalid)?;

        let clock = match time {
            Some((hour, minute)) => NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
                LineageError::InvalidArgument(format!("{hour:02}:{minute:02} is not a valid time"))
            })?,
            None => NaiveTime::MIN,
        };

        Ok(Self {
            calendar,
            year,
            month,
            day,
            time,
            instant: date.and_time(clock),
        })
    }

    #[must_use]
    pub fn calendar(&self) -> &'static dyn CalendarSystem {
        self.calendar
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }

    /// Hour and minute, if a time of day was recorded.
    #[must_use]
    pub const fn time(&self) -> Option<(u32, u32)> {
        self.time
    }

    /// The canonical instant on the proleptic Gregorian timeline.
    #[must_use]
    pub const fn to_iso(&self) -> NaiveDateTime {
        self.instant
    }

    /// Calendar-specific value without the calendar name.
    #[must_use]
    pub fn calendar_value(&self) -> String {
        let mut value = format!("{}-{:02}-{:02}", format_year(self.year), self.month, self.day);
        if let Some((hour, minute)) = self.time {
            value.push_str(&format!("T{hour:02}:{minute:02}"));
        }
        value
    }

    /// Serialize as `<calendar value>;<calendar name>`.
    #[must_use]
    pub fn to_wire(&self) -> String {
        format!("{}{}{}", self.calendar_value(), CALENDAR_SEPARATOR, self.calendar.name())
    }

    /// Parse the `<calendar value>;<calendar name>` form.
    ///
    /// - Missing separator or unparsable value: `Format`
    /// - Unknown calendar name: `UnknownCalendar`
    /// - Non-existent day: `InvalidArgument`
    pub fn parse_wire(wire: &str) -> Result<Self, LineageError> {
        let (value, name) = wire
            .rsplit_once(CALENDAR_SEPARATOR)
            .ok_or_else(|| LineageError::format(format!("date '{wire}' has no calendar separator")))?;
        let calendar = calendar_by_name(name.trim())?;
        let malformed = || LineageError::format(format!("malformed date value '{value}'"));

        let (date_part, time_part) = match value.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (value, None),
        };

        let (negative, unsigned) = match date_part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, date_part),
        };
        let mut fields = unsigned.splitn(3, '-');
        let year: i32 = parse_field(fields.next()).ok_or_else(malformed)?;
        let month: u32 = parse_field(fields.next()).ok_or_else(malformed)?;
        let day: u32 = parse_field(fields.next()).ok_or_else(malformed)?;
        let year = if negative { -year } else { year };

        let date = Self::new(calendar, year, month, day)?;
        match time_part {
            Some(time) => {
                let (hour, minute) = time.split_once(':').ok_or_else(malformed)?;
                let hour: u32 = parse_field(Some(hour)).ok_or_else(malformed)?;
                let minute: u32 = parse_field(Some(minute)).ok_or_else(malformed)?;
                date.with_time(hour, minute)
            }
            None => Ok(date),
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>) -> Option<T> {
    let field = field?;
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn format_year(year: i32) -> String {
    if year < 0 {
        format!("-{:04}", year.unsigned_abs())
    } else {
        format!("{year:04}")
    }
}

impl PartialEq for CalendarSpecificDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.calendar.name() == other.calendar.name()
            && self.year == other.year
            && self.month == other.month
            && self.day == other.day
            && self.time == other.time
    }
}

impl Eq for CalendarSpecificDateTime {}

impl Hash for CalendarSpecificDateTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.calendar.name().hash(state);
        self.year.hash(state);
        self.month.hash(state);
        self.day.hash(state);
        self.time.hash(state);
    }
}

impl fmt::Display for CalendarSpecificDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.calendar_value(), self.calendar.name())
    }
}

// =============================================================================
// DATE PRECISION
// =============================================================================

/// Qualifier of a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DatePrecision {
    #[default]
    Exact,
    About,
    Possibly,
    Before,
    After,
}

impl DatePrecision {
    pub const ALL: [Self; 5] = [
        Self::Exact,
        Self::About,
        Self::Possibly,
        Self::Before,
        Self::After,
    ];

    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn from_ordinal(ordinal: u32) -> Result<Self, LineageError> {
        Self::ALL
            .get(ordinal as usize)
            .copied()
            .ok_or_else(|| LineageError::InvalidArgument(format!("date precision ordinal {ordinal}")))
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::About => "about",
            Self::Possibly => "possibly",
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

// =============================================================================
// DATE TIME
// =============================================================================

/// A single date with a precision qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateWithPrecision {
    pub date: CalendarSpecificDateTime,
    pub precision: DatePrecision,
}

/// A date range. `start` is strictly before `end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: CalendarSpecificDateTime,
    end: CalendarSpecificDateTime,
}

impl DateRange {
    pub fn new(start: CalendarSpecificDateTime, end: CalendarSpecificDateTime) -> Result<Self, LineageError> {
        if start.to_iso() >= end.to_iso() {
            return Err(LineageError::InvalidArgument(format!(
                "range start {start} is not before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> &CalendarSpecificDateTime {
        &self.start
    }

    #[must_use]
    pub const fn end(&self) -> &CalendarSpecificDateTime {
        &self.end
    }
}

/// Mutually exclusive candidate dates. Duplicates are permitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateAlternative {
    dates: Vec<CalendarSpecificDateTime>,
}

impl DateAlternative {
    pub fn new(dates: Vec<CalendarSpecificDateTime>) -> Result<Self, LineageError> {
        if !(MIN_ALTERNATIVE_DATES..=MAX_DATES).contains(&dates.len()) {
            return Err(LineageError::InvalidArgument(format!(
                "alternative takes {MIN_ALTERNATIVE_DATES}..={MAX_DATES} dates, got {}",
                dates.len()
            )));
        }
        Ok(Self { dates })
    }

    /// Candidates in insertion order.
    #[must_use]
    pub fn dates(&self) -> &[CalendarSpecificDateTime] {
        &self.dates
    }

    /// Candidates sorted by canonical instant.
    #[must_use]
    pub fn sorted(&self) -> Vec<CalendarSpecificDateTime> {
        let mut dates = self.dates.clone();
        dates.sort_by_key(CalendarSpecificDateTime::to_iso);
        dates
    }

    #[must_use]
    pub fn earliest(&self) -> &CalendarSpecificDateTime {
        // Construction guarantees at least two candidates.
        self.dates
            .iter()
            .min_by_key(|date| date.to_iso())
            .unwrap_or(&self.dates[0])
    }
}

/// A possibly imprecise date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateTime {
    WithPrecision(DateWithPrecision),
    Range(DateRange),
    Alternative(DateAlternative),
}

impl DateTime {
    #[must_use]
    pub const fn with_precision(date: CalendarSpecificDateTime, precision: DatePrecision) -> Self {
        Self::WithPrecision(DateWithPrecision { date, precision })
    }

    #[must_use]
    pub const fn exact(date: CalendarSpecificDateTime) -> Self {
        Self::with_precision(date, DatePrecision::Exact)
    }

    /// Fails with `InvalidArgument` unless `start < end`.
    pub fn range(start: CalendarSpecificDateTime, end: CalendarSpecificDateTime) -> Result<Self, LineageError> {
        DateRange::new(start, end).map(Self::Range)
    }

    /// Fails with `InvalidArgument` unless `2 <= dates.len() <= MAX_DATES`.
    pub fn alternative(dates: Vec<CalendarSpecificDateTime>) -> Result<Self, LineageError> {
        DateAlternative::new(dates).map(Self::Alternative)
    }

    /// Variant tag used in the file format.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::WithPrecision(_) => "with_precision",
            Self::Range(_) => "range",
            Self::Alternative(_) => "alternative",
        }
    }

    /// The date that stands for this value when ordering.
    #[must_use]
    pub fn representative(&self) -> &CalendarSpecificDateTime {
        match self {
            Self::WithPrecision(d) => &d.date,
            Self::Range(r) => r.start(),
            Self::Alternative(a) => a.earliest(),
        }
    }

    /// Chronological ordering by representative instant.
    #[must_use]
    pub fn cmp_chronological(&self, other: &Self) -> Ordering {
        self.representative()
            .to_iso()
            .cmp(&other.representative().to_iso())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithPrecision(d) if d.precision == DatePrecision::Exact => write!(f, "{}", d.date),
            Self::WithPrecision(d) => write!(f, "{} {}", d.precision.label(), d.date),
            Self::Range(r) => write!(f, "between {} and {}", r.start(), r.end()),
            Self::Alternative(a) => {
                let parts: Vec<String> = a.dates().iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" or "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> CalendarSpecificDateTime {
        CalendarSpecificDateTime::gregorian(y, m, d).expect("valid date")
    }

    #[test]
    fn julian_reform_day_maps_to_gregorian() {
        // The day after Julian 1582-10-04 was Gregorian 1582-10-15.
        let julian_date = CalendarSpecificDateTime::new(julian(), 1582, 10, 5).expect("julian");
        assert_eq!(julian_date.to_iso(), date(1582, 10, 15).to_iso());
    }

    #[test]
    fn julian_leap_day_exists_where_gregorian_does_not() {
        assert!(CalendarSpecificDateTime::new(julian(), 1900, 2, 29).is_ok());
        assert!(matches!(
            CalendarSpecificDateTime::gregorian(1900, 2, 29),
            Err(LineageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn wire_form_parses_back() {
        let original = date(1850, 3, 12).with_time(14, 5).expect("time");
        assert_eq!(original.to_wire(), "1850-03-12T14:05;gregorian");

        let parsed = CalendarSpecificDateTime::parse_wire(&original.to_wire()).expect("parse");
        assert_eq!(parsed, original);
    }

    #[test]
    fn negative_years_survive_the_wire() {
        let bc = CalendarSpecificDateTime::new(julian(), -44, 3, 15).expect("ides");
        assert_eq!(bc.to_wire(), "-0044-03-15;julian");
        let parsed = CalendarSpecificDateTime::parse_wire("-0044-03-15;julian").expect("parse");
        assert_eq!(parsed, bc);
    }

    #[test]
    fn missing_separator_is_format_error() {
        assert!(matches!(
            CalendarSpecificDateTime::parse_wire("1850-03-12"),
            Err(LineageError::Format(_))
        ));
        assert!(matches!(
            CalendarSpecificDateTime::parse_wire("1850-3x-12;gregorian"),
            Err(LineageError::Format(_))
        ));
    }

    #[test]
    fn unknown_calendar_is_reported() {
        assert!(matches!(
            CalendarSpecificDateTime::parse_wire("1850-03-12;mayan"),
            Err(LineageError::UnknownCalendar(name)) if name == "mayan"
        ));
    }

    #[test]
    fn every_calendar_found_by_name() {
        for calendar in CALENDARS {
            let found = calendar_by_name(calendar.name()).expect("known calendar");
            assert_eq!(found.name(), calendar.name());
        }
        assert_eq!(calendar_by_name(julian().name()).expect("julian").name(), julian().name());
    }

    #[test]
    fn range_requires_strict_order() {
        let a = date(1900, 1, 1);
        let b = date(1901, 1, 1);
        assert!(DateTime::range(a, b).is_ok());
        assert!(matches!(DateTime::range(b, a), Err(LineageError::InvalidArgument(_))));
        assert!(matches!(DateTime::range(a, a), Err(LineageError::InvalidArgument(_))));
    }

    #[test]
    fn alternative_arity_bounds() {
        let one = vec![date(1900, 1, 1)];
        assert!(matches!(DateTime::alternative(one), Err(LineageError::InvalidArgument(_))));

        let two = vec![date(1900, 1, 1), date(1900, 1, 1)];
        assert!(DateTime::alternative(two).is_ok());

        let max: Vec<_> = (0..MAX_DATES as i32).map(|i| date(1900 + i, 1, 1)).collect();
        assert!(DateTime::alternative(max).is_ok());

        let too_many: Vec<_> = (0..=MAX_DATES as i32).map(|i| date(1900 + i, 1, 1)).collect();
        assert!(matches!(
            DateTime::alternative(too_many),
            Err(LineageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn comparison_uses_representative_instant() {
        let alt = DateTime::alternative(vec![date(1910, 1, 1), date(1890, 6, 1)]).expect("alt");
        let exact = DateTime::exact(date(1900, 1, 1));
        let range = DateTime::range(date(1895, 1, 1), date(1920, 1, 1)).expect("range");

        assert_eq!(alt.representative(), &date(1890, 6, 1));
        assert_eq!(alt.cmp_chronological(&exact), Ordering::Less);
        assert_eq!(range.cmp_chronological(&exact), Ordering::Less);
        assert_eq!(alt.cmp_chronological(&range), Ordering::Less);
    }

    #[test]
    fn comparison_crosses_calendars() {
        let julian_date = DateTime::exact(CalendarSpecificDateTime::new(julian(), 1700, 1, 1).expect("julian"));
        let gregorian_date = DateTime::exact(date(1700, 1, 5));
        // Julian 1700-01-01 is Gregorian 1700-01-11.
        assert_eq!(julian_date.cmp_chronological(&gregorian_date), Ordering::Greater);
    }

    #[test]
    fn sorted_alternatives_are_ascending() {
        let DateTime::Alternative(alt) =
            DateTime::alternative(vec![date(1910, 1, 1), date(1890, 6, 1), date(1900, 1, 1)]).expect("alt")
        else {
            return;
        };
        let years: Vec<i32> = alt.sorted().iter().map(CalendarSpecificDateTime::year).collect();
        assert_eq!(years, vec![1890, 1900, 1910]);
    }

    #[test]
    fn display_is_human_readable() {
        let about = DateTime::with_precision(date(1850, 3, 12), DatePrecision::About);
        assert_eq!(about.to_string(), "about 1850-03-12 (gregorian)");
    }
}
