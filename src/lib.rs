pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod highlight;
pub mod search;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::{FeedError, FeedResult};
