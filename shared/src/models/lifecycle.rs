//! Prediction lifecycle models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Prediction;

/// Lifecycle states in the only order a date may visit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Preview,
    LockedEvening,
    LockedFinal,
    Active,
    Verified,
}

impl LifecycleState {
    /// The following state, or `None` once verified
    pub fn next(&self) -> Option<LifecycleState> {
        match self {
            LifecycleState::Preview => Some(LifecycleState::LockedEvening),
            LifecycleState::LockedEvening => Some(LifecycleState::LockedFinal),
            LifecycleState::LockedFinal => Some(LifecycleState::Active),
            LifecycleState::Active => Some(LifecycleState::Verified),
            LifecycleState::Verified => None,
        }
    }

    /// States in which a freshly scored prediction is served
    pub fn is_recomputable(&self) -> bool {
        matches!(self, LifecycleState::Preview | LifecycleState::LockedEvening)
    }

    /// States in which only the frozen prediction is served
    pub fn is_frozen(&self) -> bool {
        matches!(
            self,
            LifecycleState::LockedFinal | LifecycleState::Active | LifecycleState::Verified
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Preview => write!(f, "preview"),
            LifecycleState::LockedEvening => write!(f, "locked-evening"),
            LifecycleState::LockedFinal => write!(f, "locked-final"),
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Verified => write!(f, "verified"),
        }
    }
}

/// Which lock put the current prediction in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    Evening,
    Final,
}

impl std::fmt::Display for LockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockType::Evening => write!(f, "evening"),
            LockType::Final => write!(f, "final"),
        }
    }
}

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub at: DateTime<Utc>,
}

/// Lifecycle state for a single target date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub target_date: NaiveDate,
    pub state: LifecycleState,
    pub locked_prediction: Option<Prediction>,
    pub locked_at: Option<DateTime<Utc>>,
    pub lock_type: Option<LockType>,
    #[serde(default)]
    pub transitions: Vec<StateTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LifecycleRecord {
    pub fn new(target_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            target_date,
            state: LifecycleState::Preview,
            locked_prediction: None,
            locked_at: None,
            lock_type: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Step forward one state at a time until `target` is reached.
    ///
    /// Never moves backwards; a target behind the current state is a no-op.
    /// Returns whether any transition happened.
    pub fn advance_to(&mut self, target: LifecycleState, at: DateTime<Utc>) -> bool {
        let mut moved = false;
        while self.state < target {
            let Some(next) = self.state.next() else {
                break;
            };
            self.transitions.push(StateTransition {
                from: self.state,
                to: next,
                at,
            });
            self.state = next;
            moved = true;
        }
        if moved {
            self.updated_at = at;
        }
        moved
    }

    /// Ordered list of states this record has been in, starting at preview
    pub fn visited_states(&self) -> Vec<LifecycleState> {
        std::iter::once(LifecycleState::Preview)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    pub fn has_lock(&self) -> bool {
        self.locked_prediction.is_some()
    }
}
