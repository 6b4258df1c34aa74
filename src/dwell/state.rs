use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::mem;
use std::time::{Duration, Instant};

/// How long gaze must stay on one word before its definition is revealed.
pub const DEFAULT_DWELL_THRESHOLD: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DwellStatus {
    #[default]
    Idle,
    Dwelling,
    Committed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CommitTrigger {
    Dwell,
    Tap,
}

/// A word whose definition should now be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub word: String,
    /// Entry time plus threshold for dwell commits, tap time for taps.
    pub at: Instant,
    /// Wall-clock time the commit was emitted.
    pub committed_at: DateTime<Utc>,
    pub trigger: CommitTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DwellState {
    #[default]
    Idle,
    Dwelling { word: String, entered_at: Instant },
    /// The commit for this episode already fired; staying here emits nothing.
    Committed { word: String, entered_at: Instant },
}

impl DwellState {
    pub fn word(&self) -> Option<&str> {
        match self {
            DwellState::Idle => None,
            DwellState::Dwelling { word, .. } | DwellState::Committed { word, .. } => Some(word),
        }
    }

    pub fn status(&self) -> DwellStatus {
        match self {
            DwellState::Idle => DwellStatus::Idle,
            DwellState::Dwelling { .. } => DwellStatus::Dwelling,
            DwellState::Committed { .. } => DwellStatus::Committed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// A new dwell episode began; any pending deadline for the old word is void.
    Entered(String),
    /// Gaze left every word.
    Exited(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellUpdate {
    pub committed: Option<CommitEvent>,
    pub transition: Transition,
}

/// Debounces resolved words into at most one commit per continuous dwell.
///
/// Time is supplied by the caller so the machine works the same whether it is
/// driven by a live timer or by replayed samples.
#[derive(Debug, Clone)]
pub struct DwellMachine {
    threshold: Duration,
    state: DwellState,
}

impl Default for DwellMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL_THRESHOLD)
    }
}

impl DwellMachine {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: DwellState::Idle,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn state(&self) -> &DwellState {
        &self.state
    }

    pub fn current_word(&self) -> Option<&str> {
        self.state.word()
    }

    /// When the pending commit fires, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            DwellState::Dwelling { entered_at, .. } => Some(*entered_at + self.threshold),
            _ => None,
        }
    }

    /// Fire the pending commit if its deadline has passed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<CommitEvent> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        match mem::take(&mut self.state) {
            DwellState::Dwelling { word, entered_at } => {
                self.state = DwellState::Committed {
                    word: word.clone(),
                    entered_at,
                };
                Some(CommitEvent {
                    word,
                    at: deadline,
                    committed_at: Utc::now(),
                    trigger: CommitTrigger::Dwell,
                })
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Feed the word resolved for a sample taken at `at`.
    ///
    /// A pending dwell whose deadline is already behind `at` commits before
    /// the sample is applied. `None` (no word under the gaze) always ends the
    /// current episode, even for a single frame.
    pub fn observe(&mut self, word: Option<&str>, at: Instant) -> DwellUpdate {
        let committed = self.poll(at);
        let word = word.map(str::trim).filter(|w| !w.is_empty());

        let same_word = matches!(
            (word, self.state.word()),
            (Some(next), Some(current)) if next == current
        );

        let transition = if same_word {
            Transition::Unchanged
        } else {
            match word {
                Some(next) => {
                    self.state = DwellState::Dwelling {
                        word: next.to_string(),
                        entered_at: at,
                    };
                    Transition::Entered(next.to_string())
                }
                None => match mem::take(&mut self.state).word() {
                    Some(previous) => Transition::Exited(previous.to_string()),
                    None => Transition::Unchanged,
                },
            }
        };

        DwellUpdate {
            committed,
            transition,
        }
    }

    /// Drop the current episode and any pending commit. Returns whether a
    /// word was current.
    pub fn reset(&mut self) -> bool {
        !matches!(mem::take(&mut self.state), DwellState::Idle)
    }
}
