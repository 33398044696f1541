//! Link resolution against document and entry base URIs, and Atom
//! best-link selection.

use url::Url;

/// Parses a base URI.
///
/// An empty, relative or unparsable base is no base at all.
pub fn parse_base(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Url::parse(raw).ok()
}

/// Computes an entry-level base from its `xml:base` attribute.
///
/// The entry's own base is resolved against the parent's; if that fails the
/// parent base is used unchanged.
pub fn child_base(parent: Option<&Url>, raw: Option<&str>) -> Option<Url> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return parent.cloned(),
    };
    let resolved = match parent {
        Some(parent) => parent.join(raw),
        None => Url::parse(raw),
    };
    resolved.ok().or_else(|| parent.cloned())
}

/// Resolves `link` against `base`.
///
/// Without a base the link is returned unchanged, relative or not.
///
/// # Errors
///
/// Returns the URL parse error when `link` cannot be joined onto `base`.
pub fn resolve(base: Option<&Url>, link: &str) -> Result<String, url::ParseError> {
    match base {
        Some(base) => base.join(link).map(String::from),
        None => Ok(link.to_owned()),
    }
}

/// Resolves `link` against `base`, keeping the original on failure.
pub fn resolve_or_keep(base: Option<&Url>, link: &str) -> String {
    match resolve(base, link) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::warn!(link = %link, error = %e, "Unable to resolve link");
            link.to_owned()
        }
    }
}

/// An Atom `<link>` candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomLink {
    pub href: String,
    pub rel: String,
    pub kind: String,
}

/// Ranks a link by how likely it points at the human-readable page.
pub fn link_score(link: &AtomLink) -> u8 {
    match (link.rel.as_str(), link.kind.as_str()) {
        ("hub", _) => 0,
        ("alternate", "text/html") => 4,
        (_, "text/html") => 3,
        (rel, _) if rel != "self" => 2,
        _ => 1,
    }
}

/// Picks the highest scoring link; the first one wins ties.
pub fn pick_best_link(links: &[AtomLink]) -> Option<&AtomLink> {
    let mut best: Option<(&AtomLink, u8)> = None;
    for link in links {
        let score = link_score(link);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((link, score));
        }
    }
    best.map(|(link, _)| link)
}
