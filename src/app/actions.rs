use crate::app::state::Engagement;

/// User intents the controller understands, independent of input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAction {
    SelectTheme(String),
    SubmitQuery(String),
    ToggleLike(String),
    /// Move through the theme picker; wraps at both ends.
    CycleTheme(isize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    LoadIssued,
    Resolved(String),
    Engagement(Engagement),
    Unchanged,
}
