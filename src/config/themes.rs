use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};

/// A named feed bucket plus the keywords that route free-text queries to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    /// Lower-cased, trimmed, in declaration order (order matters for matching).
    pub keywords: Vec<String>,
}

impl Theme {
    fn new(id: &str, display_name: &str, description: &str, icon: &str, keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
        }
    }
}

/// Theme declaration as it appears under `[[themes]]` in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThemeSpec {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: IndexMap<String, Theme>,
}

impl ThemeRegistry {
    /// Built-in themes followed by any valid extras, in that order.
    pub fn with_extra(extra: &[ThemeSpec]) -> Self {
        let mut registry = Self::default();
        for spec in extra {
            registry.register(spec);
        }
        registry.warn_on_overlap();
        registry
    }

    pub fn contains(&self, id: &str) -> bool {
        self.themes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> FeedResult<&Theme> {
        self.themes
            .get(id)
            .ok_or_else(|| FeedError::UnknownTheme(id.to_string()))
    }

    pub fn list_themes(&self) -> impl Iterator<Item = &Theme> {
        self.themes.values()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.themes.get_index_of(id)
    }

    pub fn by_index(&self, index: usize) -> Option<&Theme> {
        self.themes.get_index(index).map(|(_, theme)| theme)
    }

    pub fn first(&self) -> Option<&Theme> {
        self.by_index(0)
    }

    fn register(&mut self, spec: &ThemeSpec) {
        let id = spec.id.trim();
        if id.is_empty() {
            tracing::warn!("skipping configured theme without an id");
            return;
        }
        if self.themes.contains_key(id) {
            tracing::warn!(theme = %id, "skipping configured theme with duplicate id");
            return;
        }
        let mut keywords: Vec<String> = Vec::with_capacity(spec.keywords.len());
        for raw in &spec.keywords {
            let keyword = raw.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        if keywords.is_empty() {
            tracing::warn!(theme = %id, "skipping configured theme without keywords");
            return;
        }
        let display_name = if spec.display_name.trim().is_empty() {
            id.to_string()
        } else {
            spec.display_name.trim().to_string()
        };
        self.themes.insert(
            id.to_string(),
            Theme {
                id: id.to_string(),
                display_name,
                description: spec.description.trim().to_string(),
                icon: spec.icon.trim().to_string(),
                keywords,
            },
        );
    }

    // Resolution stays deterministic (first registered wins); this only
    // surfaces configs where a later theme can never be reached by a keyword.
    fn warn_on_overlap(&self) {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for theme in self.themes.values() {
            for keyword in &theme.keywords {
                if let Some(owner) = owners.get(keyword.as_str()) {
                    tracing::warn!(
                        keyword = %keyword,
                        first = %owner,
                        shadowed = %theme.id,
                        "keyword registered by more than one theme"
                    );
                } else {
                    owners.insert(keyword.as_str(), theme.id.as_str());
                }
            }
        }
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let themes = [
            Theme::new(
                "productivity",
                "Productivity & Work-Life Balance",
                "Helpful takes about productivity, burnout, and work–life balance",
                "💼",
                &[
                    "productivity",
                    "productive",
                    "burnout",
                    "work life balance",
                    "work-life balance",
                    "focus",
                ],
            ),
            Theme::new(
                "memes",
                "Funny Memes",
                "Funny memes and humorous content",
                "😂",
                &["meme", "funny", "humor", "humour", "lol", "joke"],
            ),
        ]
        .into_iter()
        .map(|theme| (theme.id.clone(), theme))
        .collect();
        Self { themes }
    }
}
