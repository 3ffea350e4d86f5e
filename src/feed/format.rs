use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::{Author, Post, PostImage};

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

/// Compact age label ("42s", "5m", "3h", "12d"). Future timestamps clamp to "0s".
pub fn format_relative_time(timestamp: OffsetDateTime, now: OffsetDateTime) -> String {
    let delta = (now - timestamp).whole_seconds();
    format_elapsed_seconds(delta)
}

pub fn format_elapsed_seconds(delta: i64) -> String {
    let n = delta.max(0);
    if n < MINUTE {
        format!("{n}s")
    } else if n < HOUR {
        format!("{}m", n / MINUTE)
    } else if n < DAY {
        format!("{}h", n / HOUR)
    } else {
        format!("{}d", n / DAY)
    }
}

/// Engagement counter label. The band is picked from the raw value and the
/// band value is rounded half-up to one decimal, so 999_999 renders "1000.0K".
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format_scaled(n, 1_000_000, 'M')
    } else if n >= 1_000 {
        format_scaled(n, 1_000, 'K')
    } else {
        n.to_string()
    }
}

fn format_scaled(n: u64, unit: u64, suffix: char) -> String {
    let tenths = (u128::from(n) * 10 + u128::from(unit) / 2) / u128::from(unit);
    format!("{}.{}{suffix}", tenths / 10, tenths % 10)
}

pub fn avatar_url<'a>(author: &'a Author, fallback: &'a str) -> &'a str {
    author
        .profile_image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(fallback)
}

pub fn score_badge(post: &Post) -> String {
    let score = post.score.clamp(0.0, 10.0);
    if score.fract() == 0.0 {
        format!("AI: {score:.0}/10")
    } else {
        format!("AI: {score:.1}/10")
    }
}

pub fn post_count_label(count: usize) -> String {
    if count == 1 {
        "1 post".to_string()
    } else {
        format!("{count} posts")
    }
}

pub fn visible_images(post: &Post, max: usize) -> &[PostImage] {
    let end = post.images.len().min(max);
    &post.images[..end]
}

/// Cuts `text` to at most `max_width` display columns on a grapheme boundary.
pub fn truncate_display(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let budget = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = grapheme.width();
        if used + width > budget {
            break;
        }
        out.push_str(grapheme);
        used += width;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::fixtures;
    use time::macros::datetime;
    use time::Duration;

    #[test]
    fn relative_time_band_boundaries() {
        let now = datetime!(2025-01-10 12:00 UTC);
        let ago = |secs: i64| format_relative_time(now - Duration::seconds(secs), now);
        assert_eq!(ago(0), "0s");
        assert_eq!(ago(59), "59s");
        assert_eq!(ago(60), "1m");
        assert_eq!(ago(3_599), "59m");
        assert_eq!(ago(3_600), "1h");
        assert_eq!(ago(86_399), "23h");
        assert_eq!(ago(86_400), "1d");
        assert_eq!(ago(86_400 * 40), "40d");
    }

    #[test]
    fn future_timestamps_clamp_to_zero() {
        let now = datetime!(2025-01-10 12:00 UTC);
        assert_eq!(format_relative_time(now + Duration::hours(2), now), "0s");
    }

    #[test]
    fn sub_second_differences_round_down() {
        let now = datetime!(2025-01-10 12:00:59.900 UTC);
        let then = datetime!(2025-01-10 12:00 UTC);
        assert_eq!(format_relative_time(then, now), "59s");
    }

    #[test]
    fn count_band_boundaries() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1.0K");
        assert_eq!(format_count(1_050), "1.1K");
        assert_eq!(format_count(12_345), "12.3K");
        assert_eq!(format_count(999_950), "1000.0K");
        assert_eq!(format_count(999_999), "1000.0K");
        assert_eq!(format_count(1_000_000), "1.0M");
        insta::assert_snapshot!(format_count(1_500_000), @"1.5M");
        insta::assert_snapshot!(format_count(u64::MAX), @"18446744073709.6M");
    }

    #[test]
    fn avatar_falls_back_when_missing_or_blank() {
        let mut author = fixtures::post("p", 0).author;
        assert_eq!(avatar_url(&author, "fallback"), "fallback");
        author.profile_image_url = Some("  ".into());
        assert_eq!(avatar_url(&author, "fallback"), "fallback");
        author.profile_image_url = Some("https://img/a.png".into());
        assert_eq!(avatar_url(&author, "fallback"), "https://img/a.png");
    }

    #[test]
    fn badge_and_labels() {
        let mut post = fixtures::post("p", 0);
        assert_eq!(score_badge(&post), "AI: 8/10");
        post.score = 7.5;
        assert_eq!(score_badge(&post), "AI: 7.5/10");
        post.score = 14.0;
        assert_eq!(score_badge(&post), "AI: 10/10");
        assert_eq!(post_count_label(0), "0 posts");
        assert_eq!(post_count_label(1), "1 post");
        assert_eq!(post_count_label(2), "2 posts");
    }

    #[test]
    fn images_are_capped() {
        let mut post = fixtures::post("p", 0);
        post.images = (0..6)
            .map(|idx| PostImage {
                url: format!("https://img/{idx}.jpg"),
                media_key: None,
            })
            .collect();
        assert_eq!(visible_images(&post, 4).len(), 4);
        assert_eq!(visible_images(&post, 4)[3].url, "https://img/3.jpg");
        post.images.truncate(1);
        assert_eq!(visible_images(&post, 4).len(), 1);
    }

    #[test]
    fn truncation_respects_graphemes() {
        assert_eq!(truncate_display("short", 10), "short");
        assert_eq!(truncate_display("héllo wörld", 6), "héllo…");
        assert_eq!(truncate_display("😂😂😂", 5), "😂😂…");
    }
}
