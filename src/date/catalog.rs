//! The built-in list of date layouts seen in the wild.
//!
//! Order matters: the first layout that matches wins.

use super::layout::Layout;

/// Layouts tried in order. See [`super::layout`] for the notation.
pub const BUILTIN_LAYOUTS: &[&str] = &[
    "%m-%d-%Y",
    "%m/%d/%Y",
    "%m/%d/%Y - %H:%M",
    "%m/%d/%Y %H:%M:%S %Z",
    "%m/%d/%Y %-I:%M %p",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y %z",
    "%d/%m/%Y - %H:%M",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S %Z",
    "%d %b %Y",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %Z",
    "%d %b %Y %H:%M:%S UT",
    "%d %b %Y %H:%M %Z",
    "%y-%-m-%-d %H:%M",
    "%y/%-m/%-d %H:%M",
    "%-m/%-d/%Y",
    "%-m/%-d/%Y %H:%M:%S %Z",
    "%-m/%-d/%Y %-I:%M:%S %p",
    "%-m/%-d/%Y %-I:%M:%S %p %Z",
    "%H:%M %d.%m.%Y %z",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y-%m-%d 00:00:00.0 %H:%M:%S%f %z",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %Z",
    "%Y-%m-%d %H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S:00",
    "%Y-%m-%dT%H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S:%z",
    "%Y-%m-%dT%H:%M:%S%::z",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%MZ",
    "%Y-%-m-%dT%H:%M:%SZ",
    "%Y-%-m-%-d",
    "%Y-%-m-%-d %H:%M:%S",
    "%Y-%-m-%-dT%H:%M:%SZ",
    "%Y %B %d",
    "%-d-%-m-%Y",
    "%-d/%-m/%Y",
    "%-d.%-m.%Y %H:%M:%S",
    "%-d %b %Y",
    "%-d %b %Y %H:%M:%S %z",
    "%-d %b %Y %H:%M:%S %Z",
    "%-d %b %Y %H:%M:%S Z",
    "%-d %B %Y",
    "%-d %B %Y %H:%M:%S %z",
    "%-d %B %Y %H:%M:%S %Z",
    "%-y-%-m-%-d %H:%M",
    "%-y/%-m/%-d %H:%M",
    "%b %d, %Y",
    "%b %d %Y %I:%M:%S%p",
    "%b %-d, %Y",
    "%b %-d, %Y %H:%M:%S %Z",
    "%b %-d, %Y %-I:%M:%S %p",
    "%b %-d, %Y %-I:%M:%S %p %Z",
    "%B %d, %Y",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %H:%M:%S %Z",
    "%B %-d, %Y",
    "%B %-d, %Y %I:%M %p",
    "%B %-d, %Y %H:%M:%S",
    "%B %-d, %Y %H:%M:%S %Z",
    "%B %-d, %Y, %-I:%M %p",
    "%B %-d, %Y %-I:%M %p",
    "%a, %d %b %y %H:%M:%S %Z",
    "%a, %d %b %Y",
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S 00",
    "%a, %d %b %Y %H:%M:%S %#z",
    "%a %d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S -%z",
    "%a, %d %b %Y %H:%M:%S %:z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%a,%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S GMT%z",
    "%a , %d %b %Y %H:%M:%S %Z",
    "%a, %d %b %Y %H:%M:%S %Z",
    "%a, %d %b %Y %H:%M:%S%Z",
    "%a, %d %b %Y %H:%M:%S %Z %z",
    "%a, %d %b %Y %H:%M:%S %Z%:z",
    "%a, %d %b %Y %H:%M:%S UT",
    "%a, %d %b %Y %H:%M:%S Z",
    "%a, %d %b %Y %H:%M %z",
    "%a, %d %b %Y %H:%M %Z",
    "%a,%d %b %Y %H:%M %Z",
    "%a, %d %b %Y %-I:%M:%S %p %Z",
    "%a, %d %B %Y",
    "%a,%d %B %Y %H:%M:%S %Z",
    "%a, %Y-%m-%d %H:%M",
    "%a, %-d %b %y %H:%M:%S %z",
    "%a, %-d %b %y %H:%M:%S %Z",
    "%a, %-d %b %H:%M:%S %Z",
    "%a, %-d %b %Y",
    "%a,%-d %b %Y",
    "%a, %-d %b %Y %H:%M",
    "%a, %-d %b %Y %H:%M:%S",
    "%a, %-d %b %Y %H:%M:%S %z",
    "%a, %-d %b %Y %H:%M:%S%z",
    "%a, %-d %b %Y %H:%M:%S %z %Z",
    "%a,%-d %b %Y %H:%M:%S %Z",
    "%a %-d %b %Y %H:%M:%S %Z",
    "%a, %-d %b %Y %H:%M:%S %Z",
    "%a, %-d %b %Y %H:%M:%S%Z",
    "%a, %-d %b %Y %H:%M:%S UT",
    "%a, %-d %b %Y %H:%M %z",
    "%a, %-d %b %Y, %H:%M %z",
    "%a, %-d %b %Y %H:%M %Z",
    "%a, %-d, %b %Y %H:%-M",
    "%a, %-d %b %Y %H:%-M:%-S %z GMT",
    "%a, %-d %b %Y %H:%-M:%-S %Z",
    "%a, %-d %b %Y %-I:%M:%S %p %z",
    "%a, %-d %B %Y %H:%M:%S %z",
    "%a, %-d %B %Y %H:%M:%S %Z",
    "%a, %-d %B %Y, %H:%M:%S %Z",
    "%a, %-d %B %Y, %H:%M %z",
    "%a, %-d %B %Y %H:%M %Z",
    "%A, %d %B %Y %H:%M:%S",
    "%A, %d %B %Y %H:%M:%S %z",
    "%A, %d %B %Y %H:%M:%S %Z",
    "%A, %-d %b %Y %H:%M:%S %z",
    "%A, %-d %b %Y %H:%M:%S %Z",
    "%A, %-d %B %Y %H:%M:%S %z",
    "%A, %-d %B %Y %H:%M:%S %Z",
    "%A, %B %d, %Y",
    "%A, %B %-d, %Y",
    "%A, %B %-d, %Y %I:%M %p",
    "%A, %B %-d, %Y %H:%M:%S %Z",
    "%a %b %d %Y %H:%M:%S %z",
    "%a, %b %d,%Y %H:%M:%S %Z",
    "%a %b %d, %Y %-I:%M %p",
    "%a %b %-d %H:%M:%S %Y %Z",
    "%a %b %-d %H:%M %Y",
    "%a, %b %-d %Y %H:%M:%S %z",
    "%a, %b %-d %Y %H:%M:%S -700",
    "%a, %b %-d, %Y %H:%M:%S %Z",
    "%a, %B %d, %Y %H:%M:%S %Z",
    "%a, %B %d, %Y, %H:%M:%S %Z",
    "%a, %B %-d %Y %H:%M:%S %z",
    // ANSI C asctime
    "%a %b %e %H:%M:%S %Y",
    // RFC 1123, with zone name then numeric offset
    "%a, %d %b %Y %H:%M:%S %Z",
    "%a, %d %b %Y %H:%M:%S %z",
    // RFC 3339
    "%Y-%m-%dT%H:%M:%S%:Z",
    // RFC 822, with zone name then numeric offset
    "%d %b %y %H:%M %Z",
    "%d %b %y %H:%M %z",
    // RFC 850
    "%A, %d-%b-%y %H:%M:%S %Z",
    // Ruby
    "%a %b %d %H:%M:%S %z %Y",
    // Unix date(1)
    "%a %b %e %H:%M:%S %Z %Y",
    "Updated %B %-d, %Y",
];

/// An ordered, compiled set of layouts.
#[derive(Debug, Clone)]
pub struct DateCatalog {
    layouts: Vec<Layout>,
}

impl DateCatalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self::from_layouts(BUILTIN_LAYOUTS.iter().copied())
    }

    /// The built-in catalog followed by `extra` layouts.
    ///
    /// Extra layouts with unknown directives are kept (they may still match
    /// literally) but logged so a typo in configuration is noticed.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::builtin();
        for source in extra {
            let layout = Layout::compile(source.as_ref());
            if layout.has_unknown_directive() {
                tracing::warn!(
                    layout = layout.as_str(),
                    "Date layout contains an unknown directive"
                );
            }
            catalog.layouts.push(layout);
        }
        catalog
    }

    fn from_layouts<'a>(sources: impl Iterator<Item = &'a str>) -> Self {
        Self {
            layouts: sources.map(Layout::compile).collect(),
        }
    }

    /// Number of layouts.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Whether the catalog has no layouts.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// The compiled layouts in match order.
    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }
}

impl Default for DateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
