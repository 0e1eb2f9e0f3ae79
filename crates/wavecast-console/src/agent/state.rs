//! The agent's state machine, as a pure transition function.

use crate::dto::{KickedBy, LockStatus, SessionSnapshot};

/// What the operator currently sees.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPhase {
    /// Initial status fetch in flight (or being retried).
    Loading,
    /// The caller may not hold the lock. Terminal.
    Denied,
    /// Nobody holds the lock; ask the operator to confirm entry.
    ConfirmEntry,
    /// Someone else is live; offer takeover.
    TakeoverPrompt {
        /// The current holder.
        holder: SessionSnapshot,
    },
    /// This operator holds the lock.
    Active,
    /// The lock was lost. `by` is known when a kick notice named the
    /// taker; a plain expiry leaves it `None`.
    Kicked {
        /// Who took the lock, if anyone.
        by: Option<KickedBy>,
    },
    /// The local inactivity deadline fired and the lock was released.
    InactiveTimeout,
    /// Control has returned to the surrounding application. Terminal.
    Exited,
}

impl AgentPhase {
    /// Whether the agent has finished for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Denied | Self::Exited)
    }
}

/// Everything that can happen to the agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A status fetch completed.
    StatusResolved(LockStatus),
    /// A status fetch failed; lock state is unknown.
    StatusFailed,
    /// The operator confirmed the current prompt.
    UserConfirmed,
    /// The operator declined the current prompt.
    UserDeclined,
    /// A claim call succeeded.
    ClaimSucceeded,
    /// A claim call failed; the prompt stays up for retry.
    ClaimFailed,
    /// A heartbeat reported `active: false`.
    LockLost,
    /// A kick notice named who took the lock.
    KickNoticed(KickedBy),
    /// The local inactivity deadline fired.
    InactivityElapsed,
    /// The embedding UI is going away (tab closed, component unmounted).
    Closed,
}

/// Side effects the driver must execute after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Call `status`.
    FetchStatus,
    /// Call `claim`.
    Claim,
    /// Call `release` (best-effort).
    Release,
    /// Call `check_kicked` once, to put a name on a lost lock.
    CheckKick,
}

/// Result of feeding one event through the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The phase to display next.
    pub phase: AgentPhase,
    /// Effects to execute, in order.
    pub effects: Vec<Effect>,
}

fn stay(phase: AgentPhase) -> Transition {
    Transition {
        phase,
        effects: Vec::new(),
    }
}

fn goto(phase: AgentPhase, effects: Vec<Effect>) -> Transition {
    Transition { phase, effects }
}

/// Feed one event through the machine. One handler per phase; terminal
/// phases absorb everything.
pub fn transition(phase: AgentPhase, event: AgentEvent) -> Transition {
    if matches!(event, AgentEvent::Closed) {
        return on_closed(phase);
    }

    match phase {
        AgentPhase::Loading => on_loading(event),
        AgentPhase::Denied => stay(AgentPhase::Denied),
        AgentPhase::ConfirmEntry => on_confirm_entry(event),
        AgentPhase::TakeoverPrompt { holder } => on_takeover_prompt(holder, event),
        AgentPhase::Active => on_active(event),
        AgentPhase::Kicked { by } => on_kicked(by, event),
        AgentPhase::InactiveTimeout => on_inactive_timeout(event),
        AgentPhase::Exited => stay(AgentPhase::Exited),
    }
}

/// Closing releases the lock if held, then exits from anywhere.
fn on_closed(phase: AgentPhase) -> Transition {
    let effects = if matches!(phase, AgentPhase::Active) {
        vec![Effect::Release]
    } else {
        Vec::new()
    };
    goto(AgentPhase::Exited, effects)
}

fn on_loading(event: AgentEvent) -> Transition {
    match event {
        AgentEvent::StatusResolved(status) => resolve_status(status),
        // Unknown state: keep showing the loader; the driver retries.
        _ => stay(AgentPhase::Loading),
    }
}

/// Route a fresh status to the right prompt.
fn resolve_status(status: LockStatus) -> Transition {
    if !status.has_permission {
        return stay(AgentPhase::Denied);
    }
    match status.active_session {
        None => stay(AgentPhase::ConfirmEntry),
        // Own session still active (page reload): resume without a claim.
        Some(_) if status.is_current_user => stay(AgentPhase::Active),
        Some(holder) => stay(AgentPhase::TakeoverPrompt { holder }),
    }
}

fn on_confirm_entry(event: AgentEvent) -> Transition {
    match event {
        AgentEvent::UserConfirmed => goto(AgentPhase::ConfirmEntry, vec![Effect::Claim]),
        AgentEvent::UserDeclined => stay(AgentPhase::Exited),
        AgentEvent::ClaimSucceeded => stay(AgentPhase::Active),
        // Claim failed: do not pretend to be active; the prompt stays up.
        _ => stay(AgentPhase::ConfirmEntry),
    }
}

fn on_takeover_prompt(holder: SessionSnapshot, event: AgentEvent) -> Transition {
    match event {
        AgentEvent::UserConfirmed => {
            goto(AgentPhase::TakeoverPrompt { holder }, vec![Effect::Claim])
        }
        AgentEvent::UserDeclined => stay(AgentPhase::Exited),
        AgentEvent::ClaimSucceeded => stay(AgentPhase::Active),
        _ => stay(AgentPhase::TakeoverPrompt { holder }),
    }
}

fn on_active(event: AgentEvent) -> Transition {
    match event {
        // Heartbeat says the lock is gone; ask once who, if anyone, took it.
        AgentEvent::LockLost => goto(AgentPhase::Kicked { by: None }, vec![Effect::CheckKick]),
        AgentEvent::KickNoticed(by) => stay(AgentPhase::Kicked { by: Some(by) }),
        AgentEvent::InactivityElapsed => {
            goto(AgentPhase::InactiveTimeout, vec![Effect::Release])
        }
        _ => stay(AgentPhase::Active),
    }
}

fn on_kicked(by: Option<KickedBy>, event: AgentEvent) -> Transition {
    match event {
        AgentEvent::UserConfirmed => goto(AgentPhase::Kicked { by }, vec![Effect::Claim]),
        AgentEvent::UserDeclined => stay(AgentPhase::Exited),
        AgentEvent::ClaimSucceeded => stay(AgentPhase::Active),
        // A late notice fills in who took over.
        AgentEvent::KickNoticed(new_by) => stay(AgentPhase::Kicked { by: Some(new_by) }),
        _ => stay(AgentPhase::Kicked { by }),
    }
}

fn on_inactive_timeout(event: AgentEvent) -> Transition {
    match event {
        // Reconnect goes through status: someone may have taken over while
        // this operator was idle.
        AgentEvent::UserConfirmed => goto(AgentPhase::InactiveTimeout, vec![Effect::FetchStatus]),
        AgentEvent::UserDeclined => stay(AgentPhase::Exited),
        AgentEvent::StatusResolved(status) => {
            if !status.has_permission {
                return stay(AgentPhase::Denied);
            }
            match status.active_session {
                Some(holder) if !status.is_current_user => {
                    stay(AgentPhase::TakeoverPrompt { holder })
                }
                // No conflicting holder (or our own stale row): reclaim.
                _ => goto(AgentPhase::InactiveTimeout, vec![Effect::Claim]),
            }
        }
        AgentEvent::ClaimSucceeded => stay(AgentPhase::Active),
        _ => stay(AgentPhase::InactiveTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot(name: &str) -> SessionSnapshot {
        SessionSnapshot {
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
            started_at: Utc::now(),
            last_activity: Utc::now(),
        }
    }

    fn status(active: Option<SessionSnapshot>, is_current_user: bool) -> LockStatus {
        LockStatus {
            has_permission: true,
            active_session: active,
            is_current_user,
        }
    }

    fn kicked_by(name: &str) -> KickedBy {
        KickedBy {
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
        }
    }

    #[test]
    fn loading_routes_on_status() {
        let t = transition(
            AgentPhase::Loading,
            AgentEvent::StatusResolved(LockStatus::denied()),
        );
        assert_eq!(t.phase, AgentPhase::Denied);

        let t = transition(
            AgentPhase::Loading,
            AgentEvent::StatusResolved(status(None, false)),
        );
        assert_eq!(t.phase, AgentPhase::ConfirmEntry);

        let t = transition(
            AgentPhase::Loading,
            AgentEvent::StatusResolved(status(Some(snapshot("me")), true)),
        );
        assert_eq!(t.phase, AgentPhase::Active);

        let holder = snapshot("dj-b");
        let t = transition(
            AgentPhase::Loading,
            AgentEvent::StatusResolved(status(Some(holder.clone()), false)),
        );
        assert_eq!(t.phase, AgentPhase::TakeoverPrompt { holder });
    }

    #[test]
    fn loading_stays_put_on_fetch_failure() {
        let t = transition(AgentPhase::Loading, AgentEvent::StatusFailed);
        assert_eq!(t.phase, AgentPhase::Loading);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn confirm_entry_claims_on_confirm() {
        let t = transition(AgentPhase::ConfirmEntry, AgentEvent::UserConfirmed);
        assert_eq!(t.phase, AgentPhase::ConfirmEntry);
        assert_eq!(t.effects, vec![Effect::Claim]);

        let t = transition(AgentPhase::ConfirmEntry, AgentEvent::ClaimSucceeded);
        assert_eq!(t.phase, AgentPhase::Active);
    }

    #[test]
    fn prompts_exit_on_decline() {
        for phase in [
            AgentPhase::ConfirmEntry,
            AgentPhase::TakeoverPrompt {
                holder: snapshot("dj-b"),
            },
            AgentPhase::Kicked { by: None },
            AgentPhase::InactiveTimeout,
        ] {
            let t = transition(phase, AgentEvent::UserDeclined);
            assert_eq!(t.phase, AgentPhase::Exited);
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn failed_claim_never_fakes_active() {
        let holder = snapshot("dj-b");
        for phase in [
            AgentPhase::ConfirmEntry,
            AgentPhase::TakeoverPrompt {
                holder: holder.clone(),
            },
            AgentPhase::Kicked { by: None },
            AgentPhase::InactiveTimeout,
        ] {
            let t = transition(phase.clone(), AgentEvent::ClaimFailed);
            assert_eq!(t.phase, phase);
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn active_reacts_to_loss_and_inactivity() {
        let t = transition(AgentPhase::Active, AgentEvent::LockLost);
        assert_eq!(t.phase, AgentPhase::Kicked { by: None });
        assert_eq!(t.effects, vec![Effect::CheckKick]);

        let by = kicked_by("dj-b");
        let t = transition(AgentPhase::Active, AgentEvent::KickNoticed(by.clone()));
        assert_eq!(t.phase, AgentPhase::Kicked { by: Some(by) });
        assert!(t.effects.is_empty());

        let t = transition(AgentPhase::Active, AgentEvent::InactivityElapsed);
        assert_eq!(t.phase, AgentPhase::InactiveTimeout);
        assert_eq!(t.effects, vec![Effect::Release]);
    }

    #[test]
    fn late_notice_names_the_taker() {
        let by = kicked_by("dj-b");
        let t = transition(
            AgentPhase::Kicked { by: None },
            AgentEvent::KickNoticed(by.clone()),
        );
        assert_eq!(t.phase, AgentPhase::Kicked { by: Some(by) });
    }

    #[test]
    fn kicked_can_reclaim() {
        let t = transition(AgentPhase::Kicked { by: None }, AgentEvent::UserConfirmed);
        assert_eq!(t.effects, vec![Effect::Claim]);

        let t = transition(AgentPhase::Kicked { by: None }, AgentEvent::ClaimSucceeded);
        assert_eq!(t.phase, AgentPhase::Active);
    }

    #[test]
    fn inactive_timeout_rechecks_before_claiming() {
        let t = transition(AgentPhase::InactiveTimeout, AgentEvent::UserConfirmed);
        assert_eq!(t.phase, AgentPhase::InactiveTimeout);
        assert_eq!(t.effects, vec![Effect::FetchStatus]);

        // Someone took over while we were idle: offer takeover instead.
        let holder = snapshot("dj-b");
        let t = transition(
            AgentPhase::InactiveTimeout,
            AgentEvent::StatusResolved(status(Some(holder.clone()), false)),
        );
        assert_eq!(t.phase, AgentPhase::TakeoverPrompt { holder });

        // Nobody in the way: claim straight away.
        let t = transition(
            AgentPhase::InactiveTimeout,
            AgentEvent::StatusResolved(status(None, false)),
        );
        assert_eq!(t.phase, AgentPhase::InactiveTimeout);
        assert_eq!(t.effects, vec![Effect::Claim]);

        // Our own row somehow still active: also just reclaim.
        let t = transition(
            AgentPhase::InactiveTimeout,
            AgentEvent::StatusResolved(status(Some(snapshot("me")), true)),
        );
        assert_eq!(t.effects, vec![Effect::Claim]);

        // Permission revoked while idle.
        let t = transition(
            AgentPhase::InactiveTimeout,
            AgentEvent::StatusResolved(LockStatus::denied()),
        );
        assert_eq!(t.phase, AgentPhase::Denied);
    }

    #[test]
    fn closing_releases_only_when_active() {
        let t = transition(AgentPhase::Active, AgentEvent::Closed);
        assert_eq!(t.phase, AgentPhase::Exited);
        assert_eq!(t.effects, vec![Effect::Release]);

        let t = transition(AgentPhase::ConfirmEntry, AgentEvent::Closed);
        assert_eq!(t.phase, AgentPhase::Exited);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn terminal_phases_absorb_everything() {
        for event in [
            AgentEvent::UserConfirmed,
            AgentEvent::ClaimSucceeded,
            AgentEvent::LockLost,
            AgentEvent::InactivityElapsed,
        ] {
            let t = transition(AgentPhase::Denied, event.clone());
            assert_eq!(t.phase, AgentPhase::Denied);
            let t = transition(AgentPhase::Exited, event);
            assert_eq!(t.phase, AgentPhase::Exited);
        }
    }
}
