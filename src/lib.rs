//! Tolerant Atom/RSS/RDF feed normalization and adaptive poll scheduling.
//!
//! [`feed::FeedParser`] turns raw documents into normalized
//! [`feed::Feed`]/[`feed::Story`] records; [`schedule::PollScheduler`]
//! decides when each feed should be fetched next.

pub mod config;
pub mod date;
pub mod feed;
pub mod icon;
pub mod sanitize;
pub mod schedule;
pub mod util;
