//! Compiled date layouts and the matcher that applies them.
//!
//! Layouts use a strftime-flavoured notation. Most directives are handed to
//! `chrono::format` as-is; the rest cover shapes chrono's parser has no item
//! for:
//!
//! | Directive | Matches |
//! |-----------|---------|
//! | `%Y` | four-digit year |
//! | `%y` / `%-y` | two-digit year, pivot at 69 |
//! | `%m` / `%-m` | month number |
//! | `%b` / `%B` | abbreviated / full month name, any case |
//! | `%d` / `%-d` / `%e` | day of month |
//! | `%H` | hour 0-23 |
//! | `%I` / `%-I` | hour 1-12 |
//! | `%M` / `%-M` | minute |
//! | `%S` / `%-S` | second, plus an optional `.fraction` |
//! | `%f` | `.fraction` |
//! | `%p` | `AM`, `PM`, `a.m.`, `p.m.`, any case |
//! | `%a` / `%A` | abbreviated / full weekday name, any case |
//! | `%z` | `-0700` |
//! | `%:z` | `-07:00` |
//! | `%::z` | `-07:00:00` (whole minutes only) |
//! | `%#z` / `%:Z` | `Z`, `-07` or `-07:00` |
//! | `%Z` | zone abbreviation such as `PST`, `CEST` or `GMT+2` |
//! | `%%` | a literal `%` |
//!
//! Other numeric fields take one digit up to their natural width. A space in the
//! layout matches one or more spaces. Everything else is matched literally.
//! The weekday is checked to be a weekday name but never cross-checked
//! against the date, since feeds get it wrong often enough to matter.

use chrono::format::{self, Item, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    /// Items chrono parses directly, as a chrono format string.
    Chrono(&'static str),
    Year,
    /// A weekday name, parsed and then discarded.
    Weekday(&'static str),
    Meridiem,
    Zone,
}

/// Directive table, longest spellings first so prefixes never shadow them.
const DIRECTIVES: &[(&str, Directive)] = &[
    ("::z", Directive::Chrono("%:z:00")),
    (":z", Directive::Chrono("%:z")),
    (":Z", Directive::Chrono("%#z")),
    ("#z", Directive::Chrono("%#z")),
    ("-y", Directive::Chrono("%-y")),
    ("-m", Directive::Chrono("%-m")),
    ("-d", Directive::Chrono("%-d")),
    ("-I", Directive::Chrono("%-I")),
    ("-M", Directive::Chrono("%-M")),
    ("-S", Directive::Chrono("%-S%.f")),
    ("Y", Directive::Year),
    ("y", Directive::Chrono("%y")),
    ("m", Directive::Chrono("%m")),
    ("b", Directive::Chrono("%b")),
    ("B", Directive::Chrono("%B")),
    ("d", Directive::Chrono("%d")),
    ("e", Directive::Chrono("%e")),
    ("H", Directive::Chrono("%H")),
    ("I", Directive::Chrono("%I")),
    ("M", Directive::Chrono("%M")),
    ("S", Directive::Chrono("%S%.f")),
    ("f", Directive::Chrono("%.f")),
    ("p", Directive::Meridiem),
    ("a", Directive::Weekday("%a")),
    ("A", Directive::Weekday("%A")),
    ("z", Directive::Chrono("%z")),
    ("Z", Directive::Zone),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// A run of items handed to `chrono::format::parse_and_remainder`.
    Chrono(Vec<Item<'static>>),
    /// One or more spaces.
    Space,
    /// Four digits must follow; consumes nothing.
    FourDigits,
    Weekday(&'static str),
    Meridiem,
    Zone,
}

/// A date layout compiled once and matched many times.
#[derive(Debug, Clone)]
pub struct Layout {
    source: String,
    steps: Vec<Step>,
    unknown_directive: bool,
}

impl Layout {
    /// Compiles a layout string.
    ///
    /// Compilation never fails: an unknown directive is kept as literal text
    /// and flagged, see [`Layout::has_unknown_directive`].
    pub fn compile(source: &str) -> Self {
        let mut builder = StepBuilder::default();
        let mut unknown_directive = false;
        let mut rest = source;

        while let Some(c) = rest.chars().next() {
            if c == ' ' {
                builder.push(Step::Space);
                rest = &rest[1..];
                continue;
            }

            if c != '%' {
                builder.literal.push(c);
                rest = &rest[c.len_utf8()..];
                continue;
            }

            let spec = &rest[1..];
            if let Some(tail) = spec.strip_prefix('%') {
                builder.literal.push('%');
                rest = tail;
                continue;
            }

            match DIRECTIVES.iter().find(|(key, _)| spec.starts_with(key)) {
                Some((key, directive)) => {
                    match *directive {
                        Directive::Chrono(fmt) => builder.chrono(StrftimeItems::new(fmt)),
                        Directive::Year => {
                            builder.push(Step::FourDigits);
                            builder.chrono(StrftimeItems::new("%Y"));
                        }
                        Directive::Weekday(fmt) => builder.push(Step::Weekday(fmt)),
                        Directive::Meridiem => builder.push(Step::Meridiem),
                        Directive::Zone => builder.push(Step::Zone),
                    }
                    rest = &spec[key.len()..];
                }
                None => {
                    unknown_directive = true;
                    builder.literal.push('%');
                    rest = spec;
                }
            }
        }

        Self {
            source: source.to_owned(),
            steps: builder.finish(),
            unknown_directive,
        }
    }

    /// The layout as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether compilation met a `%` directive it did not recognise.
    pub fn has_unknown_directive(&self) -> bool {
        self.unknown_directive
    }

    /// Matches the whole of `input` against this layout.
    pub fn parse(&self, input: &str) -> Option<DateTime<Utc>> {
        let mut parsed = Parsed::new();
        let mut zone = None;
        let mut rest = input;

        for step in &self.steps {
            rest = match step {
                Step::Chrono(items) => format::parse_and_remainder(&mut parsed, rest, items.iter()).ok()?,
                Step::Space => {
                    if !rest.starts_with(' ') {
                        return None;
                    }
                    rest.trim_start_matches(' ')
                }
                Step::FourDigits => {
                    let digits = rest.as_bytes().get(..4)?;
                    if !digits.iter().all(u8::is_ascii_digit) {
                        return None;
                    }
                    rest
                }
                Step::Weekday(fmt) => {
                    format::parse_and_remainder(&mut Parsed::new(), rest, StrftimeItems::new(fmt)).ok()?
                }
                Step::Meridiem => meridiem(&mut parsed, rest)?,
                Step::Zone => {
                    let (len, offset) = zone_abbreviation(rest)?;
                    zone = Some(offset);
                    &rest[len..]
                }
            };
        }

        if !rest.is_empty() {
            return None;
        }
        resolve(parsed, zone)
    }
}

/// Collects literal text and chrono items into steps.
#[derive(Default)]
struct StepBuilder {
    steps: Vec<Step>,
    items: Vec<Item<'static>>,
    literal: String,
}

impl StepBuilder {
    fn chrono(&mut self, items: impl Iterator<Item = Item<'static>>) {
        self.flush_literal();
        self.items.extend(items);
    }

    fn push(&mut self, step: Step) {
        self.flush_items();
        if step == Step::Space && self.steps.last() == Some(&Step::Space) {
            return;
        }
        self.steps.push(step);
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            let literal = std::mem::take(&mut self.literal);
            self.items.push(Item::OwnedLiteral(literal.into_boxed_str()));
        }
    }

    fn flush_items(&mut self) {
        self.flush_literal();
        if !self.items.is_empty() {
            self.steps.push(Step::Chrono(std::mem::take(&mut self.items)));
        }
    }

    fn finish(mut self) -> Vec<Step> {
        self.flush_items();
        self.steps
    }
}

/// Matches `AM`/`PM` in any case, and the dotted `a.m.`/`p.m.`.
fn meridiem<'a>(parsed: &mut Parsed, s: &'a str) -> Option<&'a str> {
    for (dotted, pm) in [("a.m.", false), ("p.m.", true)] {
        if s.get(..dotted.len()).is_some_and(|head| head.eq_ignore_ascii_case(dotted)) {
            parsed.set_ampm(pm).ok()?;
            return Some(&s[dotted.len()..]);
        }
    }
    format::parse_and_remainder(parsed, s, StrftimeItems::new("%p")).ok()
}

/// Fills the gaps chrono leaves open and converts to UTC.
///
/// A two-digit year pivots at 69, a missing year is year 0, a missing
/// month or day is 1, and a missing time is midnight. A numeric offset wins
/// over a zone abbreviation.
fn resolve(mut parsed: Parsed, zone: Option<i32>) -> Option<DateTime<Utc>> {
    if parsed.year().is_none() {
        match parsed.year_mod_100() {
            Some(yy) => parsed.set_year_div_100(if yy >= 69 { 19 } else { 20 }).ok()?,
            None => parsed.set_year(0).ok()?,
        }
    }
    if parsed.month().is_none() {
        parsed.set_month(1).ok()?;
    }
    if parsed.day().is_none() {
        parsed.set_day(1).ok()?;
    }
    if parsed.hour_mod_12().is_some() && parsed.hour_div_12().is_none() {
        parsed.set_ampm(false).ok()?;
    }

    let date = parsed.to_naive_date().ok()?;
    let time = match parsed.hour_mod_12() {
        Some(_) => parsed.to_naive_time().ok()?,
        None => NaiveTime::MIN,
    };
    let offset = FixedOffset::east_opt(parsed.offset().or(zone).unwrap_or(0))?;
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Recognises a zone abbreviation, returning its length and UTC offset.
///
/// Accepts three upper-case letters, four or five ending in `T`, the odd
/// mixed-case `ChST`/`MeST`, `GMT` with an optional signed hour, and bare
/// signed hours such as `+03`. Abbreviations without a known offset are
/// treated as UTC.
fn zone_abbreviation(s: &str) -> Option<(usize, i32)> {
    if s.len() < 3 {
        return None;
    }
    if s.starts_with("ChST") || s.starts_with("MeST") {
        return Some((4, known_zone_offset(&s[..4]).unwrap_or(0)));
    }
    if let Some(after) = s.strip_prefix("GMT") {
        return Some(match signed_hours(after) {
            Some((hours, len)) => (3 + len, hours * 3600),
            None => (3, 0),
        });
    }
    if s.starts_with(['+', '-']) {
        let (hours, len) = signed_hours(s)?;
        return Some((len, hours * 3600));
    }

    let upper = s.bytes().take(6).take_while(u8::is_ascii_uppercase).count();
    let bytes = s.as_bytes();
    let len = match upper {
        3 => 3,
        4 if bytes[3] == b'T' || &s[..4] == "WITA" => 4,
        5 if bytes[4] == b'T' => 5,
        _ => return None,
    };
    Some((len, known_zone_offset(&s[..len]).unwrap_or(0)))
}

/// Parses `+h`/`-hh` returning signed hours and the consumed length.
fn signed_hours(s: &str) -> Option<(i32, usize)> {
    let sign = match s.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let len = s[1..].bytes().take(2).take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return None;
    }
    let hours: i32 = s[1..=len].parse().ok()?;
    if hours > 23 {
        return None;
    }
    Some((sign * hours, 1 + len))
}

fn known_zone_offset(abbr: &str) -> Option<i32> {
    let hours: f32 = match abbr {
        "UTC" | "GMT" | "WET" => 0.0,
        "EST" => -5.0,
        "EDT" => -4.0,
        "CST" => -6.0,
        "CDT" => -5.0,
        "MST" => -7.0,
        "MDT" => -6.0,
        "PST" => -8.0,
        "PDT" => -7.0,
        "AKST" => -9.0,
        "AKDT" => -8.0,
        "HST" => -10.0,
        "AST" => -4.0,
        "ADT" => -3.0,
        "NST" => -3.5,
        "NDT" => -2.5,
        "BST" | "CET" | "WEST" => 1.0,
        "CEST" | "EET" => 2.0,
        "EEST" | "MSK" => 3.0,
        "IST" => 5.5,
        "WIB" => 7.0,
        "WITA" | "AWST" | "HKT" => 8.0,
        "JST" | "KST" => 9.0,
        "ACST" => 9.5,
        "AEST" | "ChST" => 10.0,
        "ACDT" => 10.5,
        "AEDT" => 11.0,
        "NZST" => 12.0,
        "NZDT" => 13.0,
        _ => return None,
    };
    Some((hours * 3600.0) as i32)
}
