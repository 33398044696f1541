use url::Url;

use super::{parse_with, wrong_root, DecodeContext, DecodeError, DecodeStrategy, Decoded};
use crate::feed::link::{self, AtomLink};
use crate::feed::model::{FeedDraft, FeedFormat, StoryDraft};
use crate::feed::xml::{Document, Element, Name, ATOM_NS};

fn atom(local: &str) -> Name<'_> {
    Name::In(ATOM_NS, local)
}

/// Atom 1.0 (`<feed xmlns="http://www.w3.org/2005/Atom">`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomDecoder;

impl DecodeStrategy for AtomDecoder {
    fn format(&self) -> FeedFormat {
        FeedFormat::Atom
    }

    fn decode(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        parse_with(bytes, |doc| {
            if !doc.root().is(atom("feed")) {
                return Err(wrong_root("feed", doc));
            }
            Ok(extract(doc, ctx))
        })
    }
}

fn extract(doc: &Document<'_>, ctx: &DecodeContext<'_>) -> Decoded {
    let root = doc.root();
    let feed_base = root.attr_qualified("xml:base").and_then(link::parse_base);

    let mut feed = FeedDraft {
        title: root.child_text(atom("title")).to_owned(),
        updated: ctx
            .dates
            .resolve(ctx.feed_url, &[root.child_text(atom("updated"))])
            .ok(),
        ..FeedDraft::default()
    };
    if let Some(best) = best_link(root) {
        feed.link = link::resolve_or_keep(feed_base.as_ref(), &best.href);
    }

    let stories = root
        .children(atom("entry"))
        .map(|entry| extract_entry(doc, entry, feed_base.as_ref(), ctx))
        .collect();

    Decoded {
        format: FeedFormat::Atom,
        feed,
        stories,
    }
}

fn extract_entry(
    doc: &Document<'_>,
    entry: &Element,
    feed_base: Option<&Url>,
    ctx: &DecodeContext<'_>,
) -> StoryDraft {
    let entry_base = link::child_base(feed_base, entry.attr_qualified("xml:base"));

    let mut story = StoryDraft {
        id: entry.child_text(atom("id")).to_owned(),
        title: entry.child_text(atom("title")).to_owned(),
        updated: ctx
            .dates
            .resolve(ctx.feed_url, &[entry.child_text(atom("updated"))])
            .ok(),
        published: ctx
            .dates
            .resolve(ctx.feed_url, &[entry.child_text(atom("published"))])
            .ok(),
        ..StoryDraft::default()
    };

    if let Some(best) = best_link(entry) {
        story.link = link::resolve_or_keep(entry_base.as_ref(), &best.href);
    }
    if let Some(author) = entry.child(atom("author")) {
        story.author = author.child_text(atom("name")).to_owned();
    }
    story.content = entry_content(doc, entry);
    story
}

/// Body text when it has any, else the raw inner markup (`type="xhtml"`),
/// else the summary.
fn entry_content(doc: &Document<'_>, entry: &Element) -> String {
    if let Some(content) = entry.child(atom("content")) {
        if !content.text().trim().is_empty() {
            return content.text().to_owned();
        }
        let inner = doc.inner_xml(content);
        if !inner.is_empty() {
            return inner.to_owned();
        }
    }
    entry.child_text(atom("summary")).to_owned()
}

fn best_link(parent: &Element) -> Option<AtomLink> {
    let links: Vec<AtomLink> = parent
        .children(atom("link"))
        .map(|l| AtomLink {
            href: l.attr("href").unwrap_or_default().to_owned(),
            rel: l.attr("rel").unwrap_or_default().to_owned(),
            kind: l.attr("type").unwrap_or_default().to_owned(),
        })
        .collect();
    link::pick_best_link(&links).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DateResolver;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn decode(xml: &str) -> Result<Decoded, DecodeError> {
        let dates = DateResolver::default();
        let ctx = DecodeContext {
            feed_url: "http://example.com/atom",
            dates: &dates,
        };
        AtomDecoder.decode(xml.as_bytes(), &ctx)
    }

    #[test]
    fn test_feed_and_entries() {
        let decoded = decode(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom" xml:base="http://example.com/blog/">
              <title>Example Blog</title>
              <updated>2024-01-02T03:04:05Z</updated>
              <link rel="self" type="application/atom+xml" href="/atom"/>
              <link rel="hub" href="http://hub.example.com/"/>
              <link rel="alternate" type="text/html" href="index.html"/>
              <entry xml:base="posts/">
                <id>tag:example.com,2024:1</id>
                <title>First</title>
                <link href="first.html"/>
                <published>2024-01-01T00:00:00Z</published>
                <author><name>Ann</name></author>
                <content type="html">&lt;p&gt;Hello&lt;/p&gt;</content>
              </entry>
            </feed>"#,
        )
        .unwrap();

        assert_eq!(decoded.feed.title, "Example Blog");
        assert_eq!(decoded.feed.link, "http://example.com/blog/index.html");
        assert_eq!(
            decoded.feed.updated,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );

        let story = &decoded.stories[0];
        assert_eq!(story.id, "tag:example.com,2024:1");
        assert_eq!(story.link, "http://example.com/blog/posts/first.html");
        assert_eq!(story.author, "Ann");
        assert_eq!(story.content, "<p>Hello</p>");
        assert_eq!(
            story.published,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(story.updated, None);
    }

    #[test]
    fn test_xhtml_content_uses_inner_markup() {
        let decoded = decode(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>1</id>
              <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><b>x</b></div></content>
            </entry></feed>"#,
        )
        .unwrap();
        assert_eq!(
            decoded.stories[0].content,
            r#"<div xmlns="http://www.w3.org/1999/xhtml"><b>x</b></div>"#
        );
    }

    #[test]
    fn test_summary_fallback() {
        let decoded = decode(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>1</id>
              <summary>Just a summary</summary></entry></feed>"#,
        )
        .unwrap();
        assert_eq!(decoded.stories[0].content, "Just a summary");
    }

    #[test]
    fn test_relative_feed_base_ignored() {
        let decoded = decode(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xml:base="/relative/">
              <link href="page.html"/></feed>"#,
        )
        .unwrap();
        assert_eq!(decoded.feed.link, "page.html");
    }

    #[test]
    fn test_wrong_namespace_rejected() {
        assert!(matches!(
            decode("<feed><title>x</title></feed>"),
            Err(DecodeError::WrongRoot { .. })
        ));
        assert!(matches!(
            decode(r#"<rss version="2.0"/>"#),
            Err(DecodeError::WrongRoot { .. })
        ));
    }
}
