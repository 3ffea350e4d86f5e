use crate::config::themes::ThemeRegistry;

/// Outcome of routing a free-text query to a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched { theme_id: String, keyword: String },
    NoMatch,
}

impl Resolution {
    pub fn theme_id(&self) -> Option<&str> {
        match self {
            Resolution::Matched { theme_id, .. } => Some(theme_id),
            Resolution::NoMatch => None,
        }
    }
}

pub fn normalize_query(input: &str) -> String {
    input.trim().to_lowercase()
}

/// First theme (registry order) with a keyword contained in the query wins.
pub fn resolve(registry: &ThemeRegistry, raw_query: &str) -> Resolution {
    let query = normalize_query(raw_query);
    if query.is_empty() {
        return Resolution::NoMatch;
    }
    for theme in registry.list_themes() {
        if let Some(keyword) = theme
            .keywords
            .iter()
            .find(|keyword| query.contains(keyword.as_str()))
        {
            return Resolution::Matched {
                theme_id: theme.id.clone(),
                keyword: keyword.clone(),
            };
        }
    }
    Resolution::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::themes::ThemeSpec;
    use assert_matches::assert_matches;

    #[test]
    fn resolves_case_insensitive_substrings() {
        let registry = ThemeRegistry::default();
        assert_eq!(
            resolve(&registry, "need more funny stuff").theme_id(),
            Some("memes")
        );
        assert_eq!(
            resolve(&registry, "   Fighting BURNOUT lately  ").theme_id(),
            Some("productivity")
        );
        // substring, not word match
        assert_eq!(resolve(&registry, "memestock").theme_id(), Some("memes"));
    }

    #[test]
    fn reports_the_keyword_that_matched() {
        let registry = ThemeRegistry::default();
        assert_matches!(
            resolve(&registry, "Work-Life Balance tips"),
            Resolution::Matched { theme_id, keyword }
                if theme_id == "productivity" && keyword == "work-life balance"
        );
    }

    #[test]
    fn unmatched_and_blank_queries_are_no_match() {
        let registry = ThemeRegistry::default();
        assert_eq!(resolve(&registry, "gardening"), Resolution::NoMatch);
        assert_eq!(resolve(&registry, ""), Resolution::NoMatch);
        assert_eq!(resolve(&registry, " \t "), Resolution::NoMatch);
    }

    #[test]
    fn earlier_theme_wins_on_overlap() {
        let registry = ThemeRegistry::with_extra(&[ThemeSpec {
            id: "standup".into(),
            keywords: vec!["lol".into(), "comedy".into()],
            ..ThemeSpec::default()
        }]);
        assert_eq!(resolve(&registry, "lol").theme_id(), Some("memes"));
        assert_eq!(
            resolve(&registry, "late night comedy").theme_id(),
            Some("standup")
        );
        // both themes match; registry order decides
        assert_eq!(
            resolve(&registry, "comedy for focus").theme_id(),
            Some("productivity")
        );
    }
}
