use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use time::OffsetDateTime;

use crate::app::{App, FeedController};
use crate::config::themes::ThemeRegistry;
use crate::config::AppConfig;
use crate::error::FeedError;
use crate::feed::format::{
    avatar_url, format_count, format_relative_time, post_count_label, score_badge,
    visible_images,
};
use crate::feed::{Dataset, Post};
use crate::search::{self, Resolution};

const FEED_WAIT: Duration = Duration::from_secs(5);

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Free-text query, e.g. "need more funny stuff"
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Theme id to print (defaults to the configured default theme)
    #[arg(long, conflicts_with = "query")]
    pub theme: Option<String>,
    /// Resolve a free-text query to a theme first
    #[arg(long)]
    pub query: Option<String>,
    /// Limit the number of posts printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn list_themes(config: &AppConfig, dataset: &Dataset) -> Result<()> {
    let registry = config.theme_registry();
    dataset.report_unregistered(&registry);
    print!("{}", format_theme_list(&registry, dataset));
    Ok(())
}

fn format_theme_list(registry: &ThemeRegistry, dataset: &Dataset) -> String {
    let mut out = String::new();
    for theme in registry.list_themes() {
        let count = dataset.posts_for(&theme.id).len();
        let _ = writeln!(
            &mut out,
            "{}  {} {}  ({})",
            theme.id,
            theme.icon,
            theme.display_name,
            post_count_label(count)
        );
        if !theme.description.is_empty() {
            let _ = writeln!(&mut out, "    {}", theme.description);
        }
        let _ = writeln!(&mut out, "    keywords {}", theme.keywords.join(", "));
    }
    out
}

pub fn resolve_query(config: &AppConfig, args: ResolveArgs) -> Result<()> {
    let registry = config.theme_registry();
    let query = args.query.join(" ");
    print!("{}", format_resolution(&search::resolve(&registry, &query), &query));
    Ok(())
}

fn format_resolution(resolution: &Resolution, query: &str) -> String {
    match resolution {
        Resolution::Matched { theme_id, keyword } => {
            format!("{theme_id}  (matched \"{keyword}\")\n")
        }
        Resolution::NoMatch => format!(
            "{}\n",
            FeedError::NoMatch(search::normalize_query(query))
        ),
    }
}

pub fn print_feed(config: &AppConfig, dataset: Arc<Dataset>, args: FeedArgs) -> Result<()> {
    let output = run_feed(config, dataset, &args, OffsetDateTime::now_utc())?;
    if let Some(notice) = &output.notice {
        eprintln!("{notice}");
    }
    print!("{}", output.body);
    Ok(())
}

struct FeedOutput {
    /// Why the requested theme was not used; the selection stays put.
    notice: Option<String>,
    body: String,
}

fn run_feed(
    config: &AppConfig,
    dataset: Arc<Dataset>,
    args: &FeedArgs,
    now: OffsetDateTime,
) -> Result<FeedOutput> {
    let registry = Arc::new(config.theme_registry());
    let mut controller = FeedController::new(
        registry,
        dataset,
        Duration::ZERO,
        &config.default_theme,
    )?;

    let mut notice = None;
    if let Some(theme) = &args.theme {
        if let Err(err) = controller.registry().get(theme) {
            notice = Some(format!(
                "{err}; showing '{}'",
                controller.state().selected_theme_id()
            ));
        }
        controller.select_theme(theme);
    } else if let Some(query) = &args.query {
        if let Resolution::NoMatch = controller.submit_query(query) {
            let err = FeedError::NoMatch(search::normalize_query(query));
            notice = Some(format!(
                "{err}; showing '{}'",
                controller.state().selected_theme_id()
            ));
        }
    }

    if !controller.wait_until_loaded(FEED_WAIT) {
        bail!("feed did not finish loading within {}s", FEED_WAIT.as_secs());
    }
    Ok(FeedOutput {
        notice,
        body: format_feed(&controller, config, args.limit, now),
    })
}

fn format_feed(
    controller: &FeedController,
    config: &AppConfig,
    limit: usize,
    now: OffsetDateTime,
) -> String {
    let state = controller.state();
    let mut out = String::new();
    let heading = controller
        .registry()
        .get(state.selected_theme_id())
        .map(|theme| format!("{} {}", theme.icon, theme.display_name))
        .unwrap_or_else(|_| state.selected_theme_id().to_string());
    let _ = writeln!(&mut out, "{heading}  ({})\n", post_count_label(state.len()));

    if state.is_empty() {
        out.push_str("No posts found for this theme\n");
        out.push_str("Try running the scoring script first!\n");
        return out;
    }

    for post in state.posts().iter().take(limit) {
        write_post(&mut out, post, config, now);
    }
    if state.len() > limit {
        let _ = writeln!(&mut out, "… {} more", state.len() - limit);
    }
    out
}

fn write_post(out: &mut String, post: &Post, config: &AppConfig, now: OffsetDateTime) {
    let _ = writeln!(
        out,
        "{} @{} · {}  [{}]",
        post.author.name,
        post.author.username,
        format_relative_time(post.created_at, now),
        score_badge(post)
    );
    for line in post.text.lines().filter(|line| !line.trim().is_empty()) {
        let _ = writeln!(out, "    {}", line.trim_end());
    }
    for image in visible_images(post, config.display.max_images) {
        let _ = writeln!(out, "    image  {}", image.url);
    }
    let _ = writeln!(
        out,
        "    replies {}  reposts {}  likes {}",
        format_count(post.metrics.reply_count),
        format_count(post.metrics.retweet_count),
        format_count(post.metrics.like_count)
    );
    if config.display.show_score_reason && !post.score_reason.is_empty() {
        let _ = writeln!(out, "    why    {}", post.score_reason);
    }
    let _ = writeln!(
        out,
        "    avatar {}",
        avatar_url(&post.author, &config.display.fallback_avatar_url)
    );
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::fixtures;
    use std::fs;
    use tempfile::TempDir;
    use time::macros::datetime;

    type TestResult<T = ()> = Result<T>;

    const DATASET: &str = r#"{
        "memes": [
            {
                "id": "m1",
                "author": {"id": "1", "name": "Cat Poster", "username": "cats", "profile_image": ""},
                "text": "when the build is green\nfunny how that works",
                "created_at": "2025-01-10T12:59:30Z",
                "images": [{"url": "https://img.example/1.jpg"}],
                "metrics": {"reply_count": 4, "retweet_count": null, "like_count": 1500000, "quote_count": 2},
                "score": 9,
                "score_reason": "peak relatable"
            }
        ]
    }"#;

    fn now() -> OffsetDateTime {
        datetime!(2025-01-10 13:00 UTC)
    }

    fn feed_args() -> FeedArgs {
        FeedArgs {
            theme: None,
            query: None,
            limit: 20,
        }
    }

    fn load_dataset() -> TestResult<(TempDir, Arc<Dataset>)> {
        let temp = TempDir::new()?;
        let path = temp.path().join("scored_tweets.json");
        fs::write(&path, DATASET)?;
        let dataset = Dataset::load(&path)?;
        Ok((temp, Arc::new(dataset)))
    }

    #[test]
    fn feed_query_prints_resolved_theme() -> TestResult {
        let (_temp, dataset) = load_dataset()?;
        let args = FeedArgs {
            query: Some("need more funny stuff".into()),
            ..feed_args()
        };
        let output = run_feed(&AppConfig::default(), dataset, &args, now())?;

        assert!(output.notice.is_none());
        let output = output.body;
        assert!(output.contains("Funny Memes  (1 post)"));
        assert!(output.contains("Cat Poster @cats · 30s  [AI: 9/10]"));
        assert!(output.contains("likes 1.5M"));
        assert!(output.contains("reposts 0"));
        assert!(output.contains("image  https://img.example/1.jpg"));
        assert!(output.contains("default_profile_normal.png"));
        Ok(())
    }

    #[test]
    fn feed_for_unscored_theme_shows_empty_state() -> TestResult {
        let (_temp, dataset) = load_dataset()?;
        let output = run_feed(&AppConfig::default(), dataset, &feed_args(), now())?.body;
        assert!(output.contains("(0 posts)"));
        assert!(output.contains("No posts found for this theme"));
        Ok(())
    }

    #[test]
    fn unknown_theme_keeps_default_feed_with_notice() -> TestResult {
        let args = FeedArgs {
            theme: Some("gardening".into()),
            ..feed_args()
        };
        let output = run_feed(
            &AppConfig::default(),
            Arc::new(fixtures::dataset()),
            &args,
            now(),
        )?;
        let notice = output.notice.expect("notice for unknown theme");
        assert!(notice.contains("gardening"));
        assert!(notice.contains("showing 'productivity'"));
        assert!(output.body.contains("(3 posts)"));
        assert!(output.body.contains("post p1"));
        Ok(())
    }

    #[test]
    fn unmatched_query_keeps_default_feed_with_notice() -> TestResult {
        let args = FeedArgs {
            query: Some("quantum physics".into()),
            ..feed_args()
        };
        let output = run_feed(
            &AppConfig::default(),
            Arc::new(fixtures::dataset()),
            &args,
            now(),
        )?;
        let notice = output.notice.expect("notice for unmatched query");
        assert!(notice.contains("quantum physics"));
        assert!(output.body.contains("post p1"));
        Ok(())
    }

    #[test]
    fn feed_limit_truncates_output() -> TestResult {
        let args = FeedArgs {
            limit: 1,
            ..feed_args()
        };
        let output = run_feed(
            &AppConfig::default(),
            Arc::new(fixtures::dataset()),
            &args,
            now(),
        )?
        .body;
        assert!(output.contains("post p1"));
        assert!(!output.contains("post p2"));
        assert!(output.contains("… 2 more"));
        Ok(())
    }

    #[test]
    fn theme_list_includes_counts_and_keywords() {
        let output = format_theme_list(&ThemeRegistry::default(), &fixtures::dataset());
        assert!(output.contains("productivity  💼 Productivity & Work-Life Balance  (3 posts)"));
        assert!(output.contains("memes  😂 Funny Memes  (2 posts)"));
        assert!(output.contains("keywords meme, funny"));
    }

    #[test]
    fn resolution_output_names_keyword() {
        let registry = ThemeRegistry::default();
        let query = "Fighting burnout";
        let output = format_resolution(&search::resolve(&registry, query), query);
        assert_eq!(output, "productivity  (matched \"burnout\")\n");
        let output = format_resolution(&search::resolve(&registry, "cooking"), "cooking");
        assert!(output.contains("cooking"));
    }
}
