use super::{parse_with, wrong_root, DecodeContext, DecodeError, DecodeStrategy, Decoded};
use crate::feed::model::{FeedDraft, FeedFormat, StoryDraft};
use crate::feed::xml::{unescape, Document, Element, Name, CONTENT_NS, DC_NS, RDF_NS};

/// RDF Site Summary 1.0 (`<rdf:RDF>` with sibling `<channel>` and `<item>`s).
#[derive(Debug, Default, Clone, Copy)]
pub struct RdfDecoder;

impl DecodeStrategy for RdfDecoder {
    fn format(&self) -> FeedFormat {
        FeedFormat::Rdf
    }

    fn decode(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        parse_with(bytes, |doc| {
            if !doc.root().is(Name::In(RDF_NS, "RDF")) {
                return Err(wrong_root("rdf:RDF", doc));
            }
            Ok(extract(doc, ctx))
        })
    }
}

fn extract(doc: &Document<'_>, ctx: &DecodeContext<'_>) -> Decoded {
    let root = doc.root();

    let feed = match root.child(Name::Any("channel")) {
        Some(channel) => FeedDraft {
            title: channel.child_text(Name::Any("title")).to_owned(),
            link: channel.child_text(Name::Any("link")).to_owned(),
            updated: ctx
                .dates
                .resolve(ctx.feed_url, &[channel.child_text(Name::In(DC_NS, "date"))])
                .ok(),
        },
        None => FeedDraft::default(),
    };

    let stories = root
        .children(Name::Any("item"))
        .map(|item| extract_item(item, ctx))
        .collect();

    Decoded {
        format: FeedFormat::Rdf,
        feed,
        stories,
    }
}

fn extract_item(item: &Element, ctx: &DecodeContext<'_>) -> StoryDraft {
    let description = item.child_text(Name::Any("description"));
    let encoded = item.child_text(Name::In(CONTENT_NS, "encoded"));
    let content = if !description.is_empty() {
        unescape(description).into_owned()
    } else if !encoded.is_empty() {
        unescape(encoded).into_owned()
    } else {
        String::new()
    };

    let date = ctx
        .dates
        .resolve(ctx.feed_url, &[item.child_text(Name::In(DC_NS, "date"))])
        .ok();

    StoryDraft {
        id: item.attr("about").unwrap_or_default().to_owned(),
        title: item.child_text(Name::Any("title")).to_owned(),
        link: item.child_text(Name::Any("link")).to_owned(),
        author: item.child_text(Name::In(DC_NS, "creator")).to_owned(),
        published: date,
        updated: date,
        content,
        media_content: None,
    }
}
