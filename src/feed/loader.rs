use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::{Dataset, Post};

/// Identifies one issued load; only the newest ticket may commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub request_id: u64,
    pub theme_id: String,
}

#[derive(Debug, Clone)]
pub struct LoadCompletion {
    pub request_id: u64,
    pub theme_id: String,
    pub posts: Arc<[Post]>,
    pub issued_at: Instant,
}

impl LoadCompletion {
    pub fn matches(&self, ticket: &LoadTicket) -> bool {
        self.request_id == ticket.request_id && self.theme_id == ticket.theme_id
    }
}

/// Resolves theme feeds from the dataset and hands them back after a minimum
/// delay. Completions arrive on a channel the owner drains from its own thread.
pub struct FeedLoader {
    dataset: Arc<Dataset>,
    delay: Duration,
    next_request_id: u64,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
}

impl FeedLoader {
    pub fn new(dataset: Arc<Dataset>, delay: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self {
            dataset,
            delay,
            next_request_id: 1,
            tx,
            rx,
        }
    }

    pub fn load(&mut self, theme_id: &str) -> LoadTicket {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let ticket = LoadTicket {
            request_id,
            theme_id: theme_id.to_string(),
        };

        let completion = LoadCompletion {
            request_id,
            theme_id: theme_id.to_string(),
            posts: self.dataset.posts_for(theme_id),
            issued_at: Instant::now(),
        };
        tracing::debug!(
            request_id,
            theme = %theme_id,
            posts = completion.posts.len(),
            delay_ms = self.delay.as_millis() as u64,
            "issuing feed load"
        );

        if self.delay.is_zero() {
            // receiver lives in self, so this cannot be disconnected
            let _ = self.tx.send(completion);
        } else {
            let tx = self.tx.clone();
            let delay = self.delay;
            thread::spawn(move || {
                thread::sleep(delay);
                let _ = tx.send(completion);
            });
        }
        ticket
    }

    pub fn try_next(&self) -> Option<LoadCompletion> {
        self.rx.try_recv().ok()
    }

    /// Blocks until a completion arrives or `deadline` passes.
    pub fn next_before(&self, deadline: Instant) -> Option<LoadCompletion> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::fixtures;

    #[test]
    fn zero_delay_completes_on_next_poll() {
        let mut loader = FeedLoader::new(Arc::new(fixtures::dataset()), Duration::ZERO);
        let ticket = loader.load("productivity");
        let completion = loader.try_next().expect("completion");
        assert!(completion.matches(&ticket));
        let ids: Vec<_> = completion.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert!(loader.try_next().is_none());
    }

    #[test]
    fn request_ids_increase_per_load() {
        let mut loader = FeedLoader::new(Arc::new(fixtures::dataset()), Duration::ZERO);
        let first = loader.load("memes");
        let second = loader.load("memes");
        assert!(second.request_id > first.request_id);
        let stale = loader.try_next().expect("first completion");
        assert!(!stale.matches(&second));
    }

    #[test]
    fn missing_theme_completes_empty() {
        let mut loader = FeedLoader::new(Arc::new(fixtures::dataset()), Duration::ZERO);
        loader.load("gardening");
        let completion = loader.try_next().expect("completion");
        assert!(completion.posts.is_empty());
    }

    #[test]
    fn delayed_load_waits_at_least_the_delay() {
        let delay = Duration::from_millis(40);
        let mut loader = FeedLoader::new(Arc::new(fixtures::dataset()), delay);
        let started = Instant::now();
        loader.load("memes");
        assert!(loader.try_next().is_none());
        let completion = loader
            .next_before(Instant::now() + Duration::from_secs(5))
            .expect("delayed completion");
        assert!(started.elapsed() >= delay);
        assert_eq!(completion.theme_id, "memes");
    }
}
