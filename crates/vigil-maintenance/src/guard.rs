//! Transition and notification guards
//!
//! A transition guard records, per `(window, transition)`, whether the
//! transition has been persisted or is cooling down after a failed attempt.
//! A notification guard records that an alert for `(window, kind)` was
//! delivered. Both are process-local and not durable.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use vigil_common::{MaintenanceStatus, NotificationKind};

/// Default delay before a failed transition is attempted again
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2 * 60);

/// Default ceiling for exponential cooldowns
pub const DEFAULT_MAX_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// One of the two forward transitions of a maintenance window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// `scheduled -> in_progress`
    Start,
    /// `in_progress -> completed`
    Complete,
}

impl TransitionKind {
    /// Status persisted by this transition
    pub fn target_status(&self) -> MaintenanceStatus {
        match self {
            TransitionKind::Start => MaintenanceStatus::InProgress,
            TransitionKind::Complete => MaintenanceStatus::Completed,
        }
    }

    /// Notification sent after this transition is persisted
    pub fn notification(&self) -> NotificationKind {
        match self {
            TransitionKind::Start => NotificationKind::Start,
            TransitionKind::Complete => NotificationKind::End,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Start => "start",
            TransitionKind::Complete => "complete",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a transition guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// The transition was persisted and is never attempted again
    Done,
    /// The last attempt failed; no new attempt before `retry_at`
    CoolingDown {
        retry_at: DateTime<Utc>,
        failures: u32,
    },
}

/// Delay applied after a failed transition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownPolicy {
    /// The same delay after every failure
    Fixed(Duration),
    /// `base * 2^(failures - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        CooldownPolicy::Fixed(DEFAULT_COOLDOWN)
    }
}

impl CooldownPolicy {
    /// Cooldown after the `failures`-th consecutive failure (1-based)
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            CooldownPolicy::Fixed(delay) => delay,
            CooldownPolicy::Exponential { base, max } => {
                let exponent = failures.saturating_sub(1);
                2u32.checked_pow(exponent)
                    .and_then(|factor| base.checked_mul(factor))
                    .map_or(max, |delay| delay.min(max))
            }
        }
    }
}

/// Process-local guard bookkeeping for all known windows
#[derive(Debug, Default)]
pub struct GuardBook {
    transitions: HashMap<(String, TransitionKind), GuardState>,
    notifications: HashSet<(String, NotificationKind)>,
}

impl GuardBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transition(&self, window_id: &str, kind: TransitionKind) -> Option<GuardState> {
        self.transitions.get(&(window_id.to_string(), kind)).copied()
    }

    pub fn is_done(&self, window_id: &str, kind: TransitionKind) -> bool {
        matches!(self.transition(window_id, kind), Some(GuardState::Done))
    }

    /// Whether the transition may be attempted at `now`.
    ///
    /// False once it is done or while its cooldown has not elapsed.
    pub fn may_attempt(&self, window_id: &str, kind: TransitionKind, now: DateTime<Utc>) -> bool {
        match self.transition(window_id, kind) {
            None => true,
            Some(GuardState::Done) => false,
            Some(GuardState::CoolingDown { retry_at, .. }) => now >= retry_at,
        }
    }

    pub fn mark_done(&mut self, window_id: &str, kind: TransitionKind) {
        self.transitions
            .insert((window_id.to_string(), kind), GuardState::Done);
    }

    /// Record a failed attempt and return the instant of the next allowed one.
    pub fn mark_failed(
        &mut self,
        window_id: &str,
        kind: TransitionKind,
        now: DateTime<Utc>,
        policy: &CooldownPolicy,
    ) -> DateTime<Utc> {
        let failures = match self.transition(window_id, kind) {
            Some(GuardState::CoolingDown { failures, .. }) => failures.saturating_add(1),
            _ => 1,
        };
        let delay = chrono::Duration::from_std(policy.delay(failures))
            .unwrap_or(chrono::Duration::MAX);
        let retry_at = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.transitions.insert(
            (window_id.to_string(), kind),
            GuardState::CoolingDown { retry_at, failures },
        );
        retry_at
    }

    pub fn notification_sent(&self, window_id: &str, kind: NotificationKind) -> bool {
        self.notifications.contains(&(window_id.to_string(), kind))
    }

    pub fn mark_notified(&mut self, window_id: &str, kind: NotificationKind) {
        self.notifications.insert((window_id.to_string(), kind));
    }

    /// Drop every guard whose window id is not in `live`, returning how many were removed.
    pub fn retain_windows(&mut self, live: &HashSet<&str>) -> usize {
        let before = self.len();
        self.transitions.retain(|(id, _), _| live.contains(id.as_str()));
        self.notifications.retain(|(id, _)| live.contains(id.as_str()));
        before - self.len()
    }

    /// Total number of transition and notification guards held
    pub fn len(&self) -> usize {
        self.transitions.len() + self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.notifications.is_empty()
    }
}
