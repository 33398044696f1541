//! Format decoding: Atom, then RSS 2.0, then RDF/RSS 1.0.
//!
//! Each [`DecodeStrategy`] performs its own charset conversion and full
//! structural parse, then extracts draft feed and story fields following
//! that format's fallback rules. [`FormatDecoder`] tries them in order and
//! stops at the first success.

mod atom;
mod rdf;
mod rss;

pub use atom::AtomDecoder;
pub use rdf::RdfDecoder;
pub use rss::RssDecoder;

use std::fmt;

use thiserror::Error;

use super::model::{FeedDraft, FeedFormat, StoryDraft};
use super::xml::Document;
use crate::date::DateResolver;

/// Why a single format decoder rejected a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported charset: {0}")]
    Charset(String),

    #[error("XML syntax error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("document has no root element")]
    MissingRoot,

    #[error("document ended before its root element was closed")]
    UnexpectedEof,

    #[error("elements nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("expected root element <{expected}>, found <{found}>")]
    WrongRoot { expected: &'static str, found: String },
}

/// Every decoder failed; one error per format, in the order tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub errors: Vec<(FeedFormat, DecodeError)>,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("could not parse feed data")?;
        for (i, (format, error)) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{format}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeFailure {}

/// Inputs shared by every strategy for one document.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Source URL of the document, used when reporting date failures.
    pub feed_url: &'a str,
    pub dates: &'a DateResolver,
}

/// Draft output of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub format: FeedFormat,
    pub feed: FeedDraft,
    pub stories: Vec<StoryDraft>,
}

/// One syndication format.
pub trait DecodeStrategy: Send + Sync {
    fn format(&self) -> FeedFormat;

    /// Decodes `bytes`, or explains why they are not this format.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeError` when the bytes do not form a document of
    /// this format.
    fn decode(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError>;
}

/// Tries a list of strategies in order.
pub struct FormatDecoder {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl Default for FormatDecoder {
    fn default() -> Self {
        Self::new(vec![
            Box::new(AtomDecoder),
            Box::new(RssDecoder),
            Box::new(RdfDecoder),
        ])
    }
}

impl fmt::Debug for FormatDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.format()))
            .finish()
    }
}

impl FormatDecoder {
    pub fn new(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Decodes with the first strategy that accepts the document.
    ///
    /// Later strategies are never tried once one succeeds.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeFailure` holding every strategy's error when none
    /// of them accepted the document.
    pub fn decode(&self, bytes: &[u8], ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeFailure> {
        let mut errors = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.decode(bytes, ctx) {
                Ok(decoded) => return Ok(decoded),
                Err(e) => errors.push((strategy.format(), e)),
            }
        }
        Err(DecodeFailure { errors })
    }
}

/// Converts to UTF-8 and parses, shared by all strategies.
fn parse_with<T>(
    bytes: &[u8],
    extract: impl FnOnce(&Document<'_>) -> Result<T, DecodeError>,
) -> Result<T, DecodeError> {
    let text = super::charset::decode_to_utf8(bytes)?;
    let doc = Document::parse(&text)?;
    extract(&doc)
}

fn wrong_root(expected: &'static str, doc: &Document<'_>) -> DecodeError {
    DecodeError::WrongRoot {
        expected,
        found: doc.root().name().to_owned(),
    }
}
