//! Turns decoder drafts into finished [`Feed`] and [`Story`] records.

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use super::link;
use super::model::{Feed, FeedDraft, Story, StoryDraft};
use super::FeedError;
use crate::config::NormalizeConfig;
use crate::icon::IconResolver;
use crate::sanitize::Sanitizer;

/// Why a single story was left out of an otherwise good feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryRejection {
    #[error("story has no id, link or title")]
    MissingIdentity,

    #[error("persistence key is {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },
}

pub struct FeedNormalizer<S, I> {
    sanitizer: S,
    icons: I,
    config: NormalizeConfig,
}

impl<S: Sanitizer, I: IconResolver> FeedNormalizer<S, I> {
    pub fn new(sanitizer: S, icons: I, config: NormalizeConfig) -> Self {
        Self {
            sanitizer,
            icons,
            config,
        }
    }

    /// Normalizes with `checked` set to the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::normalize_at`].
    pub async fn normalize(
        &self,
        source_url: &str,
        draft: FeedDraft,
        stories: Vec<StoryDraft>,
    ) -> Result<(Feed, Vec<Story>), FeedError> {
        self.normalize_at(source_url, draft, stories, Utc::now()).await
    }

    /// Builds the feed record and its stories as of `checked`.
    ///
    /// Stories keep their document order. A story whose persistence key is
    /// too long is dropped with a warning.
    ///
    /// # Arguments
    ///
    /// * `source_url` - URL the document was fetched from; the feed's identity
    /// * `draft` - Feed fields from the decoder
    /// * `stories` - Story fields from the decoder, in document order
    /// * `checked` - Time of this parse
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Validation` when any story has no id, link or
    /// title. No stories are returned for the feed in that case.
    pub async fn normalize_at(
        &self,
        source_url: &str,
        draft: FeedDraft,
        stories: Vec<StoryDraft>,
        checked: DateTime<Utc>,
    ) -> Result<(Feed, Vec<Story>), FeedError> {
        let mut feed = Feed::new(source_url, checked);
        feed.updated = draft.updated;
        feed.title = html_escape::decode_html_entities(&draft.title).into_owned();

        let raw_link = draft.link.trim();
        let source_base = link::parse_base(source_url);
        feed.link = link::resolve(source_base.as_ref(), raw_link)
            .unwrap_or_else(|_| raw_link.to_owned());
        let story_base = link::parse_base(&feed.link);
        if story_base.is_none() {
            tracing::warn!(feed = %source_url, link = %feed.link, "Unable to parse feed link");
        }

        let icon_page = if feed.link.is_empty() {
            source_url
        } else {
            feed.link.as_str()
        };
        feed.image = self.icons.resolve(icon_page).await.unwrap_or_default();

        let mut out = Vec::with_capacity(stories.len());
        for draft in stories {
            match self.story(&feed, story_base.as_ref(), draft) {
                Ok(story) => out.push(story),
                Err(StoryRejection::MissingIdentity) => {
                    tracing::error!(feed = %source_url, "Story has no id");
                    return Err(FeedError::Validation(format!(
                        "bad item data in feed {source_url}: {}",
                        StoryRejection::MissingIdentity
                    )));
                }
                Err(e @ StoryRejection::KeyTooLong { .. }) => {
                    tracing::warn!(feed = %source_url, error = %e, "Dropping story");
                }
            }
        }

        Ok((feed, out))
    }

    fn story(
        &self,
        feed: &Feed,
        base: Option<&Url>,
        draft: StoryDraft,
    ) -> Result<Story, StoryRejection> {
        let checked = feed.checked;
        let mut link = draft.link.trim().to_owned();

        let mut published = draft.published.or(draft.updated).unwrap_or(checked);
        if published > checked {
            published = checked;
        }
        let date = draft.updated.unwrap_or(published).timestamp();

        let id = [&draft.id, &link, &draft.title]
            .into_iter()
            .find(|candidate| !candidate.is_empty())
            .cloned()
            .ok_or(StoryRejection::MissingIdentity)?;

        if link.is_empty() {
            if let Ok(url) = Url::parse(&id) {
                link = url.to_string();
            }
        }
        if !link.is_empty() {
            link = link::resolve_or_keep(base, &link);
        }

        let key_len = Story::persistence_key(&feed.url, &id).len();
        if key_len > self.config.max_key_len {
            return Err(StoryRejection::KeyTooLong {
                len: key_len,
                max: self.config.max_key_len,
            });
        }

        let story_url = Url::parse(&link).ok();
        let (content, snippet) = self.sanitizer.sanitize(&draft.content, story_url.as_ref());
        let summary = self.sanitizer.snip(&snippet, self.config.summary_len);
        let title =
            html_escape::decode_html_entities(&self.sanitizer.strip_tags(&draft.title)).into_owned();

        Ok(Story {
            id,
            feed_url: feed.url.clone(),
            created: checked,
            title,
            link,
            author: draft.author,
            published,
            updated: draft.updated,
            date,
            content,
            summary,
            media_content: draft.media_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::NoIcons;
    use crate::sanitize::BasicSanitizer;
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;

    fn checked() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn normalizer() -> FeedNormalizer<BasicSanitizer, NoIcons> {
        FeedNormalizer::new(BasicSanitizer, NoIcons, NormalizeConfig::default())
    }

    fn feed_draft() -> FeedDraft {
        FeedDraft {
            title: "Tom &amp; Jerry".into(),
            link: "  /blog/  ".into(),
            updated: None,
        }
    }

    async fn run(stories: Vec<StoryDraft>) -> Result<(Feed, Vec<Story>), FeedError> {
        normalizer()
            .normalize_at("http://a.com/feed.xml", feed_draft(), stories, checked())
            .await
    }

    #[tokio::test]
    async fn test_feed_fields() {
        let (feed, stories) = run(vec![]).await.unwrap();
        assert_eq!(feed.url, "http://a.com/feed.xml");
        assert_eq!(feed.title, "Tom & Jerry");
        assert_eq!(feed.link, "http://a.com/blog/");
        assert_eq!(feed.checked, checked());
        assert_eq!(feed.image, "");
        assert!(stories.is_empty());
    }

    #[tokio::test]
    async fn test_identity_falls_back_to_title() {
        let (_, stories) = run(vec![StoryDraft {
            title: "Example".into(),
            ..StoryDraft::default()
        }])
        .await
        .unwrap();
        assert_eq!(stories[0].id, "Example");
        assert_eq!(stories[0].link, "");
    }

    #[tokio::test]
    async fn test_identity_prefers_link_over_title() {
        let (_, stories) = run(vec![StoryDraft {
            title: "T".into(),
            link: " ../post.html ".into(),
            ..StoryDraft::default()
        }])
        .await
        .unwrap();
        assert_eq!(stories[0].id, "../post.html");
        assert_eq!(stories[0].link, "http://a.com/post.html");
    }

    #[tokio::test]
    async fn test_unidentifiable_story_aborts_feed() {
        let result = run(vec![
            StoryDraft {
                id: "fine".into(),
                ..StoryDraft::default()
            },
            StoryDraft::default(),
        ])
        .await;
        assert!(matches!(result, Err(FeedError::Validation(_))));
    }

    #[tokio::test]
    async fn test_id_used_as_link_when_absolute_url() {
        let (_, stories) = run(vec![
            StoryDraft {
                id: "http://a.com/p/1".into(),
                ..StoryDraft::default()
            },
            StoryDraft {
                id: "tag:a.com,2024:2".into(),
                ..StoryDraft::default()
            },
            StoryDraft {
                id: "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a".into(),
                ..StoryDraft::default()
            },
            StoryDraft {
                id: "post-4".into(),
                ..StoryDraft::default()
            },
        ])
        .await
        .unwrap();
        assert_eq!(stories[0].link, "http://a.com/p/1");
        assert_eq!(stories[1].link, "tag:a.com,2024:2");
        assert_eq!(stories[2].link, "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a");
        assert_eq!(stories[3].link, "");
        assert_eq!(stories[1].id, "tag:a.com,2024:2");
    }

    #[tokio::test]
    async fn test_timestamps() {
        let past = checked() - TimeDelta::days(1);
        let future = checked() + TimeDelta::days(1);
        let (_, stories) = run(vec![
            StoryDraft {
                id: "updated-only".into(),
                updated: Some(past),
                ..StoryDraft::default()
            },
            StoryDraft {
                id: "future".into(),
                published: Some(future),
                ..StoryDraft::default()
            },
            StoryDraft {
                id: "none".into(),
                ..StoryDraft::default()
            },
        ])
        .await
        .unwrap();

        assert_eq!(stories[0].published, past);
        assert_eq!(stories[0].date, past.timestamp());
        assert_eq!(stories[1].published, checked());
        assert_eq!(stories[1].date, checked().timestamp());
        assert_eq!(stories[2].published, checked());
        assert_eq!(stories[2].created, checked());
    }

    #[tokio::test]
    async fn test_long_key_drops_only_that_story() {
        let (_, stories) = run(vec![
            StoryDraft {
                id: "x".repeat(600),
                ..StoryDraft::default()
            },
            StoryDraft {
                id: "short".into(),
                ..StoryDraft::default()
            },
        ])
        .await
        .unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, "short");
    }

    #[tokio::test]
    async fn test_content_and_summary() {
        let (_, stories) = run(vec![StoryDraft {
            id: "1".into(),
            title: "<b>Big</b> &amp; bold".into(),
            content: format!("<p>{}</p><script>x()</script>", "lorem ipsum ".repeat(30)),
            ..StoryDraft::default()
        }])
        .await
        .unwrap();
        let story = &stories[0];
        assert_eq!(story.title, "Big & bold");
        assert!(!story.content.contains("script"));
        assert!(story.summary.starts_with("lorem ipsum"));
        assert!(crate::util::display_width(&story.summary) <= 100);
    }

    struct FixedIcon;

    #[async_trait]
    impl IconResolver for FixedIcon {
        async fn resolve(&self, page_url: &str) -> Option<String> {
            Some(format!("icon-for:{page_url}"))
        }
    }

    #[tokio::test]
    async fn test_icon_uses_link_or_source() {
        let normalizer = FeedNormalizer::new(BasicSanitizer, FixedIcon, NormalizeConfig::default());
        let (feed, _) = normalizer
            .normalize_at("http://a.com/feed.xml", feed_draft(), vec![], checked())
            .await
            .unwrap();
        assert_eq!(feed.image, "icon-for:http://a.com/blog/");

        let (feed, _) = normalizer
            .normalize_at("http://a.com/feed.xml", FeedDraft::default(), vec![], checked())
            .await
            .unwrap();
        assert_eq!(feed.image, "icon-for:http://a.com/feed.xml");
    }
}
