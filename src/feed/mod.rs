//! Feed decoding and normalization.
//!
//! This module turns raw feed documents into normalized records:
//!
//! - **Charset**: bytes to UTF-8 via BOM or XML declaration
//! - **Decoding**: Atom, then RSS 2.0, then RDF/RSS 1.0 into drafts
//! - **Links**: `xml:base` handling and best-link selection
//! - **Normalization**: identity fallbacks, timestamps, sanitizing, icons
//!
//! # Example
//!
//! ```ignore
//! use feedmill::feed::FeedParser;
//!
//! let parser = FeedParser::from_config(&config, BasicSanitizer, NoIcons);
//! let parsed = parser.parse("http://example.com/feed.xml", &bytes).await?;
//! println!("{} stories", parsed.stories.len());
//! ```

pub mod charset;
pub mod decode;
pub mod link;
mod model;
mod normalize;
pub mod xml;

pub use decode::{DecodeContext, DecodeError, DecodeFailure, DecodeStrategy, Decoded, FormatDecoder};
pub use model::{Feed, FeedDraft, FeedFormat, Story, StoryDraft};
pub use normalize::{FeedNormalizer, StoryRejection};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::date::{DateCatalog, DateResolver, FailureSink, TracingFailureSink};
use crate::icon::IconResolver;
use crate::sanitize::Sanitizer;

/// Errors that reject a whole feed document.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No decoder accepted the document.
    #[error(transparent)]
    Decode(#[from] DecodeFailure),

    /// A story could not be identified.
    #[error("{0}")]
    Validation(String),
}

/// Result of a full parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub feed: Feed,
    pub stories: Vec<Story>,
}

/// Decode then normalize, with one shared date resolver.
pub struct FeedParser<S, I> {
    decoder: FormatDecoder,
    dates: DateResolver,
    normalizer: FeedNormalizer<S, I>,
}

impl<S: Sanitizer, I: IconResolver> FeedParser<S, I> {
    pub fn new(decoder: FormatDecoder, dates: DateResolver, normalizer: FeedNormalizer<S, I>) -> Self {
        Self {
            decoder,
            dates,
            normalizer,
        }
    }

    /// Builds the standard pipeline from configuration, logging date
    /// failures through `tracing`.
    pub fn from_config(config: &Config, sanitizer: S, icons: I) -> Self {
        Self::with_failure_sink(config, sanitizer, icons, Arc::new(TracingFailureSink))
    }

    /// Like [`Self::from_config`] with a custom date failure sink.
    pub fn with_failure_sink(
        config: &Config,
        sanitizer: S,
        icons: I,
        sink: Arc<dyn FailureSink>,
    ) -> Self {
        let catalog = DateCatalog::with_extra(&config.dates.extra_layouts);
        Self::new(
            FormatDecoder::default(),
            DateResolver::new(catalog, sink, config.dates.failure_buckets),
            FeedNormalizer::new(sanitizer, icons, config.normalize),
        )
    }

    /// Parses a document fetched from `source_url`, as of now.
    ///
    /// # Errors
    ///
    /// See [`Self::parse_at`].
    pub async fn parse(&self, source_url: &str, bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
        self.parse_at(source_url, bytes, Utc::now()).await
    }

    /// Parses a document fetched from `source_url`, as of `checked`.
    ///
    /// # Errors
    ///
    /// - `FeedError::Decode` if the bytes are not Atom, RSS or RDF
    /// - `FeedError::Validation` if a story has no id, link or title
    pub async fn parse_at(
        &self,
        source_url: &str,
        bytes: &[u8],
        checked: DateTime<Utc>,
    ) -> Result<ParsedFeed, FeedError> {
        let ctx = DecodeContext {
            feed_url: source_url,
            dates: &self.dates,
        };
        let decoded = self.decoder.decode(bytes, &ctx).inspect_err(|failure| {
            for (format, error) in &failure.errors {
                tracing::warn!(feed = %source_url, format = %format, error = %error, "Decoder rejected feed");
            }
        })?;

        tracing::debug!(
            feed = %source_url,
            format = %decoded.format,
            stories = decoded.stories.len(),
            "Decoded feed"
        );

        let (feed, stories) = self
            .normalizer
            .normalize_at(source_url, decoded.feed, decoded.stories, checked)
            .await?;

        Ok(ParsedFeed {
            format: decoded.format,
            feed,
            stories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::MemoryFailureSink;
    use crate::icon::NoIcons;
    use crate::sanitize::BasicSanitizer;

    fn parser() -> FeedParser<BasicSanitizer, NoIcons> {
        FeedParser::from_config(&Config::default(), BasicSanitizer, NoIcons)
    }

    #[tokio::test]
    async fn test_parse_rss() {
        let xml = br#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example</title>
  <link>http://example.com/</link>
  <item><title>One</title><link>/one</link><pubDate>Mon, 02 Jan 2006 15:04:05 GMT</pubDate></item>
</channel></rss>"#;
        let parsed = parser().parse("http://example.com/rss", xml).await.unwrap();
        assert_eq!(parsed.format, FeedFormat::Rss);
        assert_eq!(parsed.feed.title, "Example");
        assert_eq!(parsed.stories.len(), 1);
        assert_eq!(parsed.stories[0].link, "http://example.com/one");
        assert_eq!(parsed.stories[0].feed_url, "http://example.com/rss");
    }

    #[tokio::test]
    async fn test_parse_garbage_is_decode_error() {
        let err = parser().parse("http://example.com/x", b"{\"json\": true}").await.unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
        assert!(err.to_string().starts_with("could not parse feed data"));
    }

    #[tokio::test]
    async fn test_extra_layouts_and_failure_sink() {
        let sink = Arc::new(MemoryFailureSink::new());
        let config = Config::from_toml("[dates]\nextra_layouts = [\"%Y.%m.%d\"]\n").unwrap();
        let parser = FeedParser::with_failure_sink(&config, BasicSanitizer, NoIcons, sink.clone());
        let xml = br#"<rss><channel><title>T</title>
  <item><guid>a</guid><pubDate>2024.03.09</pubDate></item>
  <item><guid>b</guid><pubDate>sometime soon</pubDate></item>
</channel></rss>"#;
        let parsed = parser.parse("http://example.com/rss", xml).await.unwrap();
        assert_eq!(
            parsed.stories[0].published.format("%Y-%m-%d").to_string(),
            "2024-03-09"
        );
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].value, "sometime soon");
        assert_eq!(failures[0].feed_url, "http://example.com/rss");
    }
}
