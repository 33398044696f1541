//! Feed and story records.
//!
//! Decoders produce [`FeedDraft`] and [`StoryDraft`] values straight from
//! the document. The normalizer turns them into [`Feed`] and [`Story`]
//! records with every invariant established.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Syndication format a document was decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Atom,
    Rss,
    Rdf,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Atom => "atom",
            Self::Rss => "rss",
            Self::Rdf => "rdf",
        };
        f.write_str(name)
    }
}

/// Feed-level fields exactly as a decoder found them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDraft {
    pub title: String,
    pub link: String,
    /// Document-level date, when one parsed.
    pub updated: Option<DateTime<Utc>>,
}

/// Story fields exactly as a decoder found them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryDraft {
    pub id: String,
    pub title: String,
    pub link: String,
    pub author: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Raw, unsanitized body.
    pub content: String,
    pub media_content: Option<String>,
}

/// A normalized feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    /// Source URL, the feed's identity.
    pub url: String,
    pub title: String,
    pub link: String,
    /// Date the document claims it was last updated.
    pub updated: Option<DateTime<Utc>>,
    /// Last time new content was seen.
    pub date: Option<DateTime<Utc>>,
    /// When this record was parsed.
    pub checked: DateTime<Utc>,
    /// Smoothed interval between content updates.
    #[serde(serialize_with = "serialize_secs")]
    pub average: Duration,
    pub next_update: Option<DateTime<Utc>>,
    /// Icon URL, empty when none could be resolved.
    pub image: String,
    /// Nobody has looked at this feed in a long time.
    pub not_viewed: bool,
}

impl Feed {
    /// A feed with no content and no scheduling history.
    pub fn new(url: impl Into<String>, checked: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            link: String::new(),
            updated: None,
            date: None,
            checked,
            average: Duration::ZERO,
            next_update: None,
            image: String::new(),
            not_viewed: false,
        }
    }

    /// Carries scheduling state over from the previously stored record.
    ///
    /// A fresh parse knows nothing about the feed's history; callers merge
    /// the old `average`, `date`, `next_update` and `not_viewed` back in
    /// before scheduling.
    pub fn inherit_schedule(&mut self, previous: &Feed) {
        self.average = previous.average;
        self.date = previous.date;
        self.next_update = previous.next_update;
        self.not_viewed = previous.not_viewed;
    }
}

/// A normalized story, owned by the feed whose `url` is `feed_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    pub id: String,
    pub feed_url: String,
    pub created: DateTime<Utc>,
    pub title: String,
    pub link: String,
    pub author: String,
    pub published: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    /// Epoch seconds used for ordering.
    pub date: i64,
    pub content: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_content: Option<String>,
}

impl Story {
    /// Storage key for this story, also used to bound identifier length.
    pub fn persistence_key(feed_url: &str, id: &str) -> String {
        format!("/Feed,{feed_url}/Story,{id}")
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_schedule_keeps_content_fields() {
        let now = Utc::now();
        let mut previous = Feed::new("http://example.com/feed", now);
        previous.average = Duration::from_secs(3600);
        previous.date = Some(now);
        previous.next_update = Some(now);
        previous.not_viewed = true;
        previous.title = "Old".into();

        let mut fresh = Feed::new("http://example.com/feed", now);
        fresh.title = "New".into();
        fresh.inherit_schedule(&previous);

        assert_eq!(fresh.title, "New");
        assert_eq!(fresh.average, Duration::from_secs(3600));
        assert_eq!(fresh.date, Some(now));
        assert!(fresh.not_viewed);
    }

    #[test]
    fn test_persistence_key_shape() {
        assert_eq!(
            Story::persistence_key("http://a.com/f", "42"),
            "/Feed,http://a.com/f/Story,42"
        );
    }

    #[test]
    fn test_feed_serializes_average_as_seconds() {
        let mut feed = Feed::new("u", Utc::now());
        feed.average = Duration::from_millis(90_500);
        let json = serde_json::to_value(&feed).unwrap();
        assert_eq!(json["average"], 90);
    }
}
