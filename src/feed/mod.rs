use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use time::OffsetDateTime;

use crate::config::themes::ThemeRegistry;

pub mod format;
pub mod loader;

pub use loader::{FeedLoader, LoadCompletion, LoadTicket};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "profile_image")]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostImage {
    pub url: String,
    #[serde(default)]
    pub media_key: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub reply_count: u64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub retweet_count: u64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub like_count: u64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub quote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub images: Vec<PostImage>,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub score_reason: String,
    #[serde(default)]
    pub theme_hint: Option<String>,
}

/// Read-only scored posts keyed by theme id, in file order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    themes: IndexMap<String, Arc<[Post]>>,
}

impl Dataset {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: IndexMap<String, Vec<Post>> =
            serde_json::from_str(raw).context("parsing scored posts json")?;
        let themes = parsed
            .into_iter()
            .map(|(theme, posts)| {
                validate_posts(&theme, &posts);
                (theme, Arc::from(posts))
            })
            .collect();
        Ok(Self { themes })
    }

    /// Missing file yields an empty dataset so every theme renders its empty state.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "dataset not found, starting with empty feeds");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading dataset {}", path.display()))
            }
        };
        let dataset = Self::from_json_str(&raw)
            .with_context(|| format!("loading dataset {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            themes = dataset.themes.len(),
            posts = dataset.total_posts(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    pub fn from_themes<I>(themes: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<Post>)>,
    {
        Self {
            themes: themes
                .into_iter()
                .map(|(theme, posts)| (theme, Arc::from(posts)))
                .collect(),
        }
    }

    /// Posts for `theme_id`; an unknown key is an empty feed, not an error.
    pub fn posts_for(&self, theme_id: &str) -> Arc<[Post]> {
        self.themes
            .get(theme_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn theme_ids(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn total_posts(&self) -> usize {
        self.themes.values().map(|posts| posts.len()).sum()
    }

    pub fn report_unregistered(&self, registry: &ThemeRegistry) {
        let orphans: Vec<&str> = self
            .theme_ids()
            .filter(|theme| !registry.contains(theme))
            .collect();
        if !orphans.is_empty() {
            tracing::info!(?orphans, "dataset contains themes without a registry entry");
        }
    }
}

fn validate_posts(theme: &str, posts: &[Post]) {
    let mut seen = HashSet::with_capacity(posts.len());
    for post in posts {
        if !seen.insert(post.id.as_str()) {
            tracing::warn!(theme = %theme, post_id = %post.id, "duplicate post id in theme");
        }
        if !(0.0..=10.0).contains(&post.score) {
            tracing::warn!(theme = %theme, post_id = %post.id, score = post.score, "score outside 0..=10");
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use time::macros::datetime;

    pub fn post(id: &str, likes: u64) -> Post {
        Post {
            id: id.to_string(),
            author: Author {
                id: Some("7".into()),
                name: "Ada".into(),
                username: "ada".into(),
                profile_image_url: None,
            },
            text: format!("post {id}"),
            created_at: datetime!(2025-01-10 12:00 UTC),
            images: Vec::new(),
            metrics: Metrics {
                like_count: likes,
                ..Metrics::default()
            },
            score: 8.0,
            score_reason: "on theme".into(),
            theme_hint: None,
        }
    }

    pub fn dataset() -> Dataset {
        Dataset::from_themes([
            (
                "productivity".to_string(),
                vec![post("p1", 10), post("p2", 0), post("p3", 999)],
            ),
            ("memes".to_string(), vec![post("m1", 1_500_000), post("m2", 3)]),
        ])
    }
}
