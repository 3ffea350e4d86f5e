use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use strum::Display;

use crate::feed::Post;
use crate::highlight::keyword_regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoadPhase {
    Idle,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Feed,
    Query,
}

/// What the session is looking at. Only the controller mutates this.
#[derive(Debug, Clone)]
pub struct FeedSelection {
    pub selected_theme_id: String,
    pub current_posts: Arc<[Post]>,
    pub phase: LoadPhase,
}

impl FeedSelection {
    pub fn new(theme_id: &str) -> Self {
        Self {
            selected_theme_id: theme_id.to_string(),
            current_posts: Arc::from(Vec::new()),
            phase: LoadPhase::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn is_empty_feed(&self) -> bool {
        self.phase == LoadPhase::Loaded && self.current_posts.is_empty()
    }

    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.current_posts.iter().find(|post| post.id == post_id)
    }
}

/// Session-local like state for one post.
///
/// `displayed_like_count` is the dataset's like count plus one while liked,
/// saturating at `u64::MAX`; the post itself is never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    pub liked: bool,
    pub displayed_like_count: u64,
}

impl Engagement {
    pub fn for_post(post: &Post, liked: bool) -> Self {
        Self {
            liked,
            displayed_like_count: post.metrics.like_count.saturating_add(u64::from(liked)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngagementBook {
    liked: HashSet<String>,
}

impl EngagementBook {
    pub fn view(&self, post: &Post) -> Engagement {
        Engagement::for_post(post, self.liked.contains(&post.id))
    }

    pub fn toggle(&mut self, post: &Post) -> Engagement {
        if !self.liked.remove(&post.id) {
            self.liked.insert(post.id.clone());
        }
        self.view(post)
    }

    pub fn reset(&mut self) {
        self.liked.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.liked.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryInput {
    pub active: bool,
    pub buffer: String,
    /// Keyword behind the most recent successful resolution, for highlighting.
    pub last_keyword: Option<String>,
    pub highlight: Option<Regex>,
}

impl QueryInput {
    const MAX_LEN: usize = 200;

    pub fn push(&mut self, ch: char) {
        if self.buffer.chars().count() < Self::MAX_LEN {
            self.buffer.push(ch);
        }
    }

    pub fn pop(&mut self) {
        self.buffer.pop();
    }

    /// Recompiles the highlight matcher only when the keyword changes.
    pub fn set_last_keyword(&mut self, keyword: &str) {
        if self.last_keyword.as_deref() == Some(keyword) {
            return;
        }
        self.highlight = keyword_regex(&[keyword]);
        self.last_keyword = Some(keyword.to_string());
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub selection: FeedSelection,
    pub engagement: EngagementBook,
    pub query: QueryInput,
    pub focus: FocusPane,
    pub cursor: usize,
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(theme_id: &str) -> Self {
        Self {
            selection: FeedSelection::new(theme_id),
            engagement: EngagementBook::default(),
            query: QueryInput::default(),
            focus: FocusPane::Feed,
            cursor: 0,
            status_message: None,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.selection.current_posts
    }

    pub fn len(&self) -> usize {
        self.selection.current_posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.current_posts.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.selection.is_loading()
    }

    pub fn selected_theme_id(&self) -> &str {
        &self.selection.selected_theme_id
    }

    pub fn selected_post(&self) -> Option<&Post> {
        if self.is_loading() {
            return None;
        }
        self.selection.current_posts.get(self.cursor)
    }

    pub fn engagement_for(&self, post: &Post) -> Engagement {
        self.engagement.view(post)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.selection.current_posts.is_empty() {
            return;
        }
        let len = self.selection.current_posts.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len - 1);
        self.cursor = next as usize;
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn begin_query(&mut self) {
        self.query.active = true;
        self.focus = FocusPane::Query;
    }

    pub fn cancel_query(&mut self) {
        self.query.active = false;
        self.query.buffer.clear();
        self.focus = FocusPane::Feed;
    }

    pub(crate) fn begin_load(&mut self, theme_id: &str) {
        self.selection.selected_theme_id = theme_id.to_string();
        self.selection.phase = LoadPhase::Loading;
    }

    /// Swaps in a freshly loaded feed; like state from the previous feed is dropped.
    pub(crate) fn commit_posts(&mut self, posts: Arc<[Post]>) {
        self.selection.current_posts = posts;
        self.selection.phase = LoadPhase::Loaded;
        self.engagement.reset();
        self.cursor = 0;
    }
}
