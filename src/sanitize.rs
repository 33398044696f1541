//! Content sanitizing.
//!
//! [`BasicSanitizer`] parses story bodies with `scraper` (html5ever) and
//! re-serializes the tree without active content: script-like elements,
//! comments, event-handler attributes and `javascript:` URLs are dropped.
//! Plain text for summaries and titles comes from `html2text`.

use html2text::render::text_renderer::TrivialDecorator;
use scraper::{ElementRef, Html, Node};
use url::Url;

use crate::feed::link;
use crate::util::{collapse_whitespace, strip_control_chars, truncate_to_width};

/// Elements removed together with everything inside them.
const BLOCKED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "base",
    "link", "meta",
];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "hr", "img", "input", "param", "source", "track", "wbr",
];

/// Attributes holding a URL: checked for script schemes and resolved
/// against the story link.
const URL_ATTRIBUTES: &[&str] = &[
    "href", "src", "action", "formaction", "poster", "background", "cite", "longdesc", "lowsrc",
];

/// URL schemes that run code when followed.
const SCRIPT_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

/// Width handed to the text renderer; large enough that it never wraps a
/// snippet-sized paragraph.
const RENDER_WIDTH: usize = 10_000;

/// Cleans story bodies and produces plain-text summaries.
pub trait Sanitizer: Send + Sync {
    /// Returns the cleaned content and the text a summary should be cut from.
    ///
    /// `base` is the story's own link, when it is an absolute URL, for
    /// resolving relative media references.
    fn sanitize(&self, content: &str, base: Option<&Url>) -> (String, String);

    /// Shortens plain text to at most `max` display columns.
    fn snip(&self, text: &str, max: usize) -> String;

    /// Removes markup tags, leaving their text.
    fn strip_tags(&self, text: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BasicSanitizer;

impl Sanitizer for BasicSanitizer {
    fn sanitize(&self, content: &str, base: Option<&Url>) -> (String, String) {
        let fragment = Html::parse_fragment(content);
        let mut clean = String::with_capacity(content.len());
        write_children(&mut clean, fragment.root_element(), base);
        let snippet = plain_text(&clean);
        (clean, snippet)
    }

    fn snip(&self, text: &str, max: usize) -> String {
        truncate_to_width(&collapse_whitespace(text), max).into_owned()
    }

    fn strip_tags(&self, text: &str) -> String {
        plain_text(text)
    }
}

/// Renders HTML as a single line of text.
fn plain_text(html: &str) -> String {
    let text =
        html2text::from_read_with_decorator(html.as_bytes(), RENDER_WIDTH, TrivialDecorator::new());
    collapse_whitespace(&strip_control_chars(&text))
}

fn write_children(out: &mut String, parent: ElementRef<'_>, base: Option<&Url>) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
            Node::Element(element) => {
                let name = element.name();
                if BLOCKED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };

                out.push('<');
                out.push_str(name);
                for (attr, value) in element.attrs() {
                    if let Some(value) = clean_attribute(attr, value, base) {
                        out.push(' ');
                        out.push_str(attr);
                        out.push_str("=\"");
                        out.push_str(&html_escape::encode_double_quoted_attribute(&value));
                        out.push('"');
                    }
                }
                out.push('>');

                if !VOID_ELEMENTS.contains(&name) {
                    write_children(out, child, base);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            // Comments, doctypes and processing instructions.
            _ => {}
        }
    }
}

/// The value to keep for an attribute, or `None` to drop it.
fn clean_attribute(name: &str, value: &str, base: Option<&Url>) -> Option<String> {
    if name.starts_with("on") || name == "srcdoc" {
        return None;
    }
    if !URL_ATTRIBUTES.contains(&name) {
        return Some(value.to_owned());
    }
    if is_script_url(value) {
        return None;
    }
    Some(link::resolve_or_keep(base, value.trim()))
}

/// Whether a URL uses a code-running scheme, ignoring case and the
/// whitespace and control characters browsers skip.
fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    SCRIPT_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_scripts_and_comments() {
        let (clean, _) = BasicSanitizer.sanitize(
            "<p>Hi<!-- note --></p><SCRIPT type=\"x\">alert(1)</script><p>there</p>",
            None,
        );
        assert_eq!(clean, "<p>Hi</p><p>there</p>");
    }

    #[test]
    fn test_embed_without_close() {
        let (clean, _) = BasicSanitizer.sanitize("<p>a<embed src=\"x.swf\">b</p>", None);
        assert_eq!(clean, "<p>ab</p>");
    }

    #[test]
    fn test_unterminated_script_drops_rest() {
        let (clean, _) = BasicSanitizer.sanitize("<p>ok</p><script>bad", None);
        assert_eq!(clean, "<p>ok</p>");
    }

    #[test]
    fn test_event_handlers_and_script_urls_removed() {
        let (clean, _) = BasicSanitizer.sanitize(
            r#"<img src=x onerror="alert(1)"><a href="javascript:alert(2)">x</a><a href=" JaVa&#10;Script:alert(3)">y</a>"#,
            None,
        );
        assert!(!clean.contains("onerror"));
        assert!(!clean.to_ascii_lowercase().contains("script:"));
        assert!(!clean.contains("alert"));
        assert!(clean.starts_with("<img src=\"x\">"));
        assert!(clean.contains("<a>x</a>"));
    }

    #[test]
    fn test_relative_urls_resolved_against_story_link() {
        let base = Url::parse("http://a.com/posts/1.html").unwrap();
        let (clean, _) = BasicSanitizer.sanitize(
            r#"<p><img src="../img/cat.png" alt="cat"> <a href="/about" title="About">me</a></p>"#,
            Some(&base),
        );
        assert!(clean.contains(r#"src="http://a.com/img/cat.png""#));
        assert!(clean.contains(r#"alt="cat""#));
        assert!(clean.contains(r#"href="http://a.com/about""#));
        assert!(clean.ends_with(">me</a></p>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let (clean, _) = BasicSanitizer.sanitize("Tom &amp; Jerry <3", None);
        assert_eq!(clean, "Tom &amp; Jerry &lt;3");
    }

    #[test]
    fn test_snippet_is_plain_text() {
        let (_, snippet) = BasicSanitizer.sanitize(
            "<p>Hello   <b>bold</b>\n world &amp; friends</p><style>p{}</style>",
            None,
        );
        assert!(snippet.contains("Hello"));
        assert!(snippet.contains("world & friends"));
        assert!(!snippet.contains('<'));
        assert!(!snippet.contains("p{}"));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(BasicSanitizer.strip_tags("<b>Bold</b> move"), "Bold move");
        assert_eq!(BasicSanitizer.strip_tags("1 < 2 and <i>3</i>"), "1 < 2 and 3");
        assert_eq!(BasicSanitizer.strip_tags("cut <a href"), "cut");
    }

    #[test]
    fn test_snip() {
        assert_eq!(BasicSanitizer.snip("  short\ttext ", 100), "short text");
        let long = "word ".repeat(50);
        let snipped = BasicSanitizer.snip(&long, 20);
        assert!(crate::util::display_width(&snipped) <= 20);
        assert!(snipped.ends_with('…'));
    }
}
