/// Crawl lifecycle states
///
/// A crawl starts `Idle`, becomes `Running` once the seed is in the frontier,
/// and ends in exactly one terminal state.
use crate::VitrineError;
use std::fmt;

/// Represents the lifecycle state of one crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Created but not started
    Idle,

    /// The loop is fetching and extracting pages
    Running,

    // ===== Terminal States =====
    /// No unvisited URL of either kind remains
    Completed,

    /// Stopped by an external signal; the frontier is resumable
    Interrupted,

    /// Stopped by a fatal storage or sink error
    Failed,
}

impl CrawlState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted | Self::Failed)
    }

    /// Idle -> Running
    pub fn start(self) -> Result<Self, VitrineError> {
        self.transition(Self::Running)
    }

    /// Running -> Completed
    pub fn complete(self) -> Result<Self, VitrineError> {
        self.transition(Self::Completed)
    }

    /// Running -> Interrupted
    pub fn interrupt(self) -> Result<Self, VitrineError> {
        self.transition(Self::Interrupted)
    }

    /// Idle or Running -> Failed
    ///
    /// A crawl may fail before it starts (the seed could not be stored).
    pub fn fail(self) -> Result<Self, VitrineError> {
        self.transition(Self::Failed)
    }

    fn transition(self, to: Self) -> Result<Self, VitrineError> {
        let allowed = matches!(
            (self, to),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Interrupted)
                | (Self::Running, Self::Failed)
        );

        if allowed {
            Ok(to)
        } else {
            Err(VitrineError::InvalidTransition { from: self, to })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
