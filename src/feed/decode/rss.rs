use super::{parse_with, wrong_root, DecodeContext, DecodeError, DecodeStrategy, Decoded};
use crate::feed::model::{FeedDraft, FeedFormat, StoryDraft};
use crate::feed::xml::{Document, Element, Name, CONTENT_NS, DC_NS, MEDIA_NS};

/// RSS 0.9x/2.0 (`<rss><channel>...`).
///
/// Core RSS elements carry no namespace, so only un-namespaced children
/// match them; `<atom:link>` in a channel never replaces `<link>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RssDecoder;

impl DecodeStrategy for RssDecoder {
    fn format(&self) -> FeedFormat {
        FeedFormat::Rss
    }

    fn decode(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        parse_with(bytes, |doc| {
            if doc.root().name() != "rss" {
                return Err(wrong_root("rss", doc));
            }
            Ok(extract(doc, ctx))
        })
    }
}

fn extract(doc: &Document<'_>, ctx: &DecodeContext<'_>) -> Decoded {
    let Some(channel) = doc.root().child(Name::Plain("channel")) else {
        return Decoded {
            format: FeedFormat::Rss,
            feed: FeedDraft::default(),
            stories: Vec::new(),
        };
    };

    let mut feed = FeedDraft {
        title: channel.child_text(Name::Plain("title")).to_owned(),
        link: channel.child_text(Name::Plain("link")).to_owned(),
        updated: None,
    };
    match ctx.dates.resolve(
        ctx.feed_url,
        &[
            channel.child_text(Name::Plain("lastBuildDate")),
            channel.child_text(Name::Plain("pubDate")),
        ],
    ) {
        Ok(date) => feed.updated = Some(date),
        Err(_) => {
            tracing::warn!(feed = %ctx.feed_url, link = %feed.link, "No RSS feed date");
        }
    }

    let stories = channel
        .children(Name::Plain("item"))
        .map(|item| extract_item(item, ctx))
        .collect();

    Decoded {
        format: FeedFormat::Rss,
        feed,
        stories,
    }
}

fn extract_item(item: &Element, ctx: &DecodeContext<'_>) -> StoryDraft {
    let title = item.child_text(Name::Plain("title"));
    let description = item.child_text(Name::Plain("description"));
    let encoded = item.child_text(Name::In(CONTENT_NS, "encoded"));

    let title = if title.is_empty() { description } else { title };
    let content = if !encoded.is_empty() {
        encoded
    } else if !title.is_empty() && !description.is_empty() {
        description
    } else {
        ""
    };

    let mut author = item.child_text(Name::Plain("author"));
    if author.is_empty() {
        author = item.child_text(Name::In(DC_NS, "creator"));
    }

    let date = ctx
        .dates
        .resolve(
            ctx.feed_url,
            &[
                item.child_text(Name::Plain("pubDate")),
                item.child_text(Name::In(DC_NS, "date")),
                item.child_text(Name::Any("published")),
            ],
        )
        .ok();

    StoryDraft {
        id: item.child_text(Name::Plain("guid")).to_owned(),
        title: title.to_owned(),
        link: item.child_text(Name::Plain("link")).to_owned(),
        author: author.to_owned(),
        published: date,
        updated: date,
        content: content.to_owned(),
        media_content: audio_media(item),
    }
}

/// URL of the first audio enclosure, else the first audio `media:content`.
fn audio_media(item: &Element) -> Option<String> {
    let is_audio = |el: &&Element| el.attr("type").is_some_and(|t| t.starts_with("audio/"));
    let url = |el: &Element| el.attr("url").unwrap_or_default().to_owned();

    if let Some(enclosure) = item.child(Name::Plain("enclosure")) {
        if is_audio(&enclosure) {
            return Some(url(enclosure));
        }
    }
    item.child(Name::In(MEDIA_NS, "content"))
        .filter(is_audio)
        .map(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::{DateCatalog, DateResolver, MemoryFailureSink};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn decode(xml: &str) -> Decoded {
        let dates = DateResolver::default();
        let ctx = DecodeContext {
            feed_url: "http://example.com/rss",
            dates: &dates,
        };
        RssDecoder.decode(xml.as_bytes(), &ctx).unwrap()
    }

    #[test]
    fn test_channel_and_item() {
        let decoded = decode(
            r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"
                  xmlns:dc="http://purl.org/dc/elements/1.1/">
              <channel>
                <title>News</title>
                <link>http://example.com/</link>
                <atom:link href="http://example.com/rss" rel="self"/>
                <lastBuildDate>not a date</lastBuildDate>
                <pubDate>Tue, 10 Jun 2003 04:00:00 GMT</pubDate>
                <item>
                  <title>Story</title>
                  <link>http://example.com/1</link>
                  <guid isPermaLink="false">abc-1</guid>
                  <dc:creator>Bob</dc:creator>
                  <description>Body</description>
                  <dc:date>2003-06-03T09:39:21Z</dc:date>
                </item>
              </channel>
            </rss>"#,
        );

        assert_eq!(decoded.feed.title, "News");
        assert_eq!(decoded.feed.link, "http://example.com/");
        assert_eq!(
            decoded.feed.updated,
            Some(Utc.with_ymd_and_hms(2003, 6, 10, 4, 0, 0).unwrap())
        );

        let story = &decoded.stories[0];
        assert_eq!(story.id, "abc-1");
        assert_eq!(story.title, "Story");
        assert_eq!(story.author, "Bob");
        assert_eq!(story.content, "Body");
        let expected = Some(Utc.with_ymd_and_hms(2003, 6, 3, 9, 39, 21).unwrap());
        assert_eq!(story.published, expected);
        assert_eq!(story.updated, expected);
    }

    #[test]
    fn test_description_only_item() {
        let decoded = decode(
            "<rss><channel><item><description>Only this</description></item></channel></rss>",
        );
        let story = &decoded.stories[0];
        assert_eq!(story.title, "Only this");
        assert_eq!(story.content, "Only this");
        assert_eq!(story.id, "");
    }

    #[test]
    fn test_content_encoded_preferred() {
        let decoded = decode(
            r#"<rss xmlns:content="http://purl.org/rss/1.0/modules/content/"><channel><item>
                <title>T</title><description>short</description>
                <content:encoded><![CDATA[<p>long</p>]]></content:encoded>
              </item></channel></rss>"#,
        );
        assert_eq!(decoded.stories[0].content, "<p>long</p>");
    }

    #[test]
    fn test_audio_media() {
        let decoded = decode(
            r#"<rss xmlns:media="http://search.yahoo.com/mrss/"><channel>
              <item><title>a</title><enclosure url="http://x/a.mp3" type="audio/mpeg"/></item>
              <item><title>b</title><enclosure url="http://x/b.jpg" type="image/jpeg"/>
                <media:content url="http://x/b.ogg" type="audio/ogg"/></item>
              <item><title>c</title><enclosure url="http://x/c.mp4" type="video/mp4"/></item>
            </channel></rss>"#,
        );
        let media: Vec<_> = decoded
            .stories
            .iter()
            .map(|s| s.media_content.as_deref())
            .collect();
        assert_eq!(media, vec![Some("http://x/a.mp3"), Some("http://x/b.ogg"), None]);
    }

    #[test]
    fn test_unparseable_item_date_sampled() {
        let sink = Arc::new(MemoryFailureSink::new());
        let dates = DateResolver::new(DateCatalog::builtin(), sink.clone(), 10);
        let ctx = DecodeContext {
            feed_url: "http://example.com/rss",
            dates: &dates,
        };
        let xml = "<rss><channel><pubDate>2020-01-01</pubDate>\
                   <item><title>t</title><pubDate>someday</pubDate></item></channel></rss>";
        let decoded = RssDecoder.decode(xml.as_bytes(), &ctx).unwrap();
        assert_eq!(decoded.stories[0].published, None);
        assert_eq!(sink.failures().len(), 1);
        assert_eq!(sink.failures()[0].value, "someday");
    }
}
