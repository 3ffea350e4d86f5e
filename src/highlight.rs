use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher for the given keywords, longest first so
/// "work-life balance" wins over any shorter overlapping keyword.
pub fn keyword_regex<S: AsRef<str>>(keywords: &[S]) -> Option<Regex> {
    let mut unique: Vec<String> = Vec::new();
    for keyword in keywords {
        let lowered = keyword.as_ref().trim().to_lowercase();
        if !lowered.is_empty() && !unique.contains(&lowered) {
            unique.push(lowered);
        }
    }
    if unique.is_empty() {
        return None;
    }
    unique.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = unique
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(segment, is_match)` runs covering the whole input.
pub fn split_matches<'t>(text: &'t str, regex: Option<&Regex>) -> Vec<(&'t str, bool)> {
    let Some(regex) = regex else {
        return vec![(text, false)];
    };
    let mut parts = Vec::new();
    let mut last = 0;
    for found in regex.find_iter(text) {
        if found.start() > last {
            parts.push((&text[last..found.start()], false));
        }
        parts.push((found.as_str(), true));
        last = found.end();
    }
    if last < text.len() || parts.is_empty() {
        parts.push((&text[last..], false));
    }
    parts
}
