use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::app::actions::{ActionOutcome, FeedAction};
use crate::app::state::{AppState, Engagement, FocusPane};
use crate::config::themes::ThemeRegistry;
use crate::error::FeedError;
use crate::feed::{Dataset, FeedLoader, LoadCompletion, LoadTicket};
use crate::search::{self, Resolution};

/// Owns the session state and routes every user action through the
/// registry, resolver, loader and engagement book.
pub struct FeedController {
    registry: Arc<ThemeRegistry>,
    loader: FeedLoader,
    state: AppState,
    pending: Option<LoadTicket>,
}

impl FeedController {
    /// Selects `default_theme` and issues the initial load.
    pub fn new(
        registry: Arc<ThemeRegistry>,
        dataset: Arc<Dataset>,
        load_delay: Duration,
        default_theme: &str,
    ) -> Result<Self> {
        let theme_id = registry
            .get(default_theme)
            .or_else(|_| {
                registry
                    .first()
                    .ok_or_else(|| FeedError::UnknownTheme(default_theme.to_string()))
            })
            .map(|theme| theme.id.clone())
            .context("selecting initial theme")?;
        let mut controller = Self {
            registry,
            loader: FeedLoader::new(dataset, load_delay),
            state: AppState::new(&theme_id),
            pending: None,
        };
        controller.issue_load(&theme_id);
        Ok(controller)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn registry(&self) -> &ThemeRegistry {
        &self.registry
    }

    pub fn dispatch(&mut self, action: FeedAction) -> ActionOutcome {
        match action {
            FeedAction::SelectTheme(theme_id) => {
                if self.select_theme(&theme_id) {
                    ActionOutcome::LoadIssued
                } else {
                    ActionOutcome::Unchanged
                }
            }
            FeedAction::SubmitQuery(raw) => match self.submit_query(&raw) {
                Resolution::Matched { theme_id, .. } => ActionOutcome::Resolved(theme_id),
                Resolution::NoMatch => ActionOutcome::Unchanged,
            },
            FeedAction::ToggleLike(post_id) => match self.toggle_like(&post_id) {
                Some(engagement) => ActionOutcome::Engagement(engagement),
                None => ActionOutcome::Unchanged,
            },
            FeedAction::CycleTheme(delta) => {
                let Some(theme_id) = self.neighbour_theme(delta) else {
                    return ActionOutcome::Unchanged;
                };
                self.dispatch(FeedAction::SelectTheme(theme_id))
            }
        }
    }

    /// Returns whether a load was issued. Unknown ids and the current theme
    /// leave the selection untouched.
    pub fn select_theme(&mut self, theme_id: &str) -> bool {
        let display_name = match self.registry.get(theme_id) {
            Ok(theme) => theme.display_name.clone(),
            Err(err) => {
                tracing::debug!(%err, "ignoring theme selection");
                self.state
                    .set_status_message(Some(format!("Unknown theme '{theme_id}'")));
                return false;
            }
        };
        if self.state.selected_theme_id() == theme_id {
            return false;
        }
        tracing::info!(theme = %theme_id, "theme selected");
        self.issue_load(theme_id);
        self.state
            .set_status_message(Some(format!("Loading {display_name}…")));
        true
    }

    pub fn submit_query(&mut self, raw: &str) -> Resolution {
        let resolution = search::resolve(&self.registry, raw);
        match &resolution {
            Resolution::Matched { theme_id, keyword } => {
                tracing::debug!(theme = %theme_id, keyword = %keyword, "query resolved");
                self.state.query.set_last_keyword(keyword);
                if !self.select_theme(theme_id) {
                    self.state.set_status_message(Some(format!(
                        "Already showing '{theme_id}' (matched \"{keyword}\")"
                    )));
                }
            }
            Resolution::NoMatch => {
                let err = FeedError::NoMatch(search::normalize_query(raw));
                tracing::debug!(%err, "query left selection unchanged");
                self.state
                    .set_status_message(Some("No theme matches that search"));
            }
        }
        resolution
    }

    /// Resolves the typed query box; the box is cleared whatever the outcome.
    pub fn submit_query_input(&mut self) -> Resolution {
        let raw = self.state.query.take();
        self.state.query.active = false;
        self.state.focus = FocusPane::Feed;
        self.submit_query(&raw)
    }

    pub fn toggle_like(&mut self, post_id: &str) -> Option<Engagement> {
        if self.state.is_loading() {
            return None;
        }
        let post = self.state.selection.post(post_id)?.clone();
        let engagement = self.state.engagement.toggle(&post);
        tracing::debug!(
            post_id = %post_id,
            liked = engagement.liked,
            likes = engagement.displayed_like_count,
            "toggled like"
        );
        Some(engagement)
    }

    pub fn toggle_like_selected(&mut self) -> Option<Engagement> {
        let post_id = self.state.selected_post()?.id.clone();
        self.toggle_like(&post_id)
    }

    /// Applies every completion that has arrived; returns true if one committed.
    pub fn poll(&mut self) -> bool {
        let mut committed = false;
        while let Some(completion) = self.loader.try_next() {
            committed |= self.apply_completion(completion);
        }
        committed
    }

    /// Blocks until the in-flight load commits or `timeout` elapses.
    pub fn wait_until_loaded(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while self.pending.is_some() {
            let Some(completion) = self.loader.next_before(deadline) else {
                return false;
            };
            self.apply_completion(completion);
        }
        true
    }

    fn issue_load(&mut self, theme_id: &str) {
        self.state.begin_load(theme_id);
        self.pending = Some(self.loader.load(theme_id));
    }

    fn apply_completion(&mut self, completion: LoadCompletion) -> bool {
        let current = self
            .pending
            .as_ref()
            .map(|ticket| completion.matches(ticket))
            .unwrap_or(false);
        if !current || completion.theme_id != self.state.selected_theme_id() {
            tracing::debug!(
                request_id = completion.request_id,
                theme = %completion.theme_id,
                selected = %self.state.selected_theme_id(),
                "discarding stale feed load"
            );
            return false;
        }
        self.pending = None;
        let count = completion.posts.len();
        tracing::debug!(
            request_id = completion.request_id,
            theme = %completion.theme_id,
            posts = count,
            elapsed_ms = completion.issued_at.elapsed().as_millis() as u64,
            "feed load committed"
        );
        self.state.commit_posts(completion.posts);
        self.state.set_status_message(None::<String>);
        true
    }

    fn neighbour_theme(&self, delta: isize) -> Option<String> {
        let len = self.registry.len() as isize;
        if len == 0 {
            return None;
        }
        let current = self.registry.position(self.state.selected_theme_id())? as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.registry.by_index(next).map(|theme| theme.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::LoadPhase;
    use crate::feed::fixtures;
    use assert_matches::assert_matches;

    const WAIT: Duration = Duration::from_secs(5);

    fn controller(delay: Duration) -> FeedController {
        FeedController::new(
            Arc::new(ThemeRegistry::default()),
            Arc::new(fixtures::dataset()),
            delay,
            "productivity",
        )
        .expect("controller")
    }

    fn post_ids(controller: &FeedController) -> Vec<String> {
        controller.state().posts().iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn startup_issues_initial_load() {
        let mut controller = controller(Duration::ZERO);
        assert_eq!(controller.state().selected_theme_id(), "productivity");
        assert!(controller.state().is_loading());
        assert!(controller.state().is_empty());

        assert!(controller.poll());
        assert_eq!(controller.state().selection.phase, LoadPhase::Loaded);
        assert_eq!(post_ids(&controller), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn unknown_default_theme_falls_back_to_first() -> anyhow::Result<()> {
        let controller = FeedController::new(
            Arc::new(ThemeRegistry::default()),
            Arc::new(fixtures::dataset()),
            Duration::ZERO,
            "cats",
        )?;
        assert_eq!(controller.state().selected_theme_id(), "productivity");
        Ok(())
    }

    #[test]
    fn unknown_theme_selection_is_ignored() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        assert!(!controller.select_theme("gardening"));
        assert_eq!(controller.state().selected_theme_id(), "productivity");
        assert!(!controller.state().is_loading());
        assert_eq!(post_ids(&controller), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn reselecting_current_theme_does_not_reload() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        assert!(!controller.select_theme("productivity"));
        assert!(!controller.state().is_loading());
    }

    #[test]
    fn stale_load_is_discarded_when_theme_changes() {
        let mut controller = controller(Duration::from_millis(60));
        // productivity is in flight; switch before it completes
        assert!(controller.select_theme("memes"));
        assert!(controller.wait_until_loaded(WAIT));
        assert_eq!(controller.state().selected_theme_id(), "memes");
        assert_eq!(post_ids(&controller), vec!["m1", "m2"]);

        // a late productivity completion must never overwrite memes
        std::thread::sleep(Duration::from_millis(120));
        assert!(!controller.poll());
        assert_eq!(post_ids(&controller), vec!["m1", "m2"]);
    }

    #[test]
    fn switching_back_and_forth_keeps_only_latest_request() {
        let mut controller = controller(Duration::ZERO);
        controller.select_theme("memes");
        controller.select_theme("productivity");
        // three completions queued; only the last may commit
        assert!(controller.poll());
        assert_eq!(controller.state().selected_theme_id(), "productivity");
        assert_eq!(post_ids(&controller), vec!["p1", "p2", "p3"]);
        assert!(!controller.state().is_loading());
    }

    #[test]
    fn query_resolves_and_loads_theme() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        let resolution = controller.submit_query("need more funny stuff");
        assert_eq!(resolution.theme_id(), Some("memes"));
        assert!(controller.state().is_loading());
        assert!(controller.wait_until_loaded(WAIT));
        assert_eq!(post_ids(&controller), vec!["m1", "m2"]);
        assert_eq!(controller.state().query.last_keyword.as_deref(), Some("funny"));
        assert!(controller.state().query.highlight.is_some());
    }

    #[test]
    fn unmatched_query_leaves_selection_and_clears_input() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        controller.state_mut().begin_query();
        for ch in "gardening tips".chars() {
            controller.state_mut().query.push(ch);
        }
        assert_eq!(controller.submit_query_input(), Resolution::NoMatch);
        let state = controller.state();
        assert!(state.query.buffer.is_empty());
        assert!(!state.query.active);
        assert_eq!(state.selected_theme_id(), "productivity");
        assert!(!state.is_loading());
        assert_eq!(post_ids(&controller), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn likes_toggle_and_reset_on_theme_change() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        let liked = controller.toggle_like("p3").expect("p3 rendered");
        assert_eq!(liked, Engagement { liked: true, displayed_like_count: 1_000 });
        let unliked = controller.toggle_like("p3").expect("p3 rendered");
        assert_eq!(unliked, Engagement { liked: false, displayed_like_count: 999 });
        controller.toggle_like("p1");

        controller.select_theme("memes");
        assert_eq!(controller.toggle_like("m1"), None, "ignored while loading");
        controller.poll();
        controller.select_theme("productivity");
        controller.poll();
        let p1 = controller.state().posts()[0].clone();
        assert_eq!(
            controller.state().engagement_for(&p1),
            Engagement { liked: false, displayed_like_count: 10 }
        );
    }

    #[test]
    fn like_for_unrendered_post_is_ignored() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        assert_eq!(controller.toggle_like("m1"), None);
        assert!(controller.state().engagement.is_empty());
    }

    #[test]
    fn dispatch_routes_actions() {
        let mut controller = controller(Duration::ZERO);
        controller.poll();
        assert_matches!(
            controller.dispatch(FeedAction::CycleTheme(1)),
            ActionOutcome::LoadIssued
        );
        controller.poll();
        assert_eq!(controller.state().selected_theme_id(), "memes");
        assert_matches!(
            controller.dispatch(FeedAction::ToggleLike("m2".into())),
            ActionOutcome::Engagement(Engagement { liked: true, displayed_like_count: 4 })
        );
        assert_matches!(
            controller.dispatch(FeedAction::SubmitQuery("burnout".into())),
            ActionOutcome::Resolved(theme) if theme == "productivity"
        );
        assert_matches!(
            controller.dispatch(FeedAction::SelectTheme("nope".into())),
            ActionOutcome::Unchanged
        );
        assert_matches!(
            controller.dispatch(FeedAction::CycleTheme(-1)),
            ActionOutcome::LoadIssued
        );
        assert_eq!(controller.state().selected_theme_id(), "memes");
    }
}
