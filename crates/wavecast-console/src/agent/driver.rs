//! Async driver for the agent state machine.
//!
//! Owns the timers and the transport. The heartbeat, kick-check, and
//! inactivity timers exist only inside the Active arm; leaving it drops
//! them, so no timer ever fires on behalf of a prompt that is no longer
//! displayed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, interval_at, sleep, sleep_until, timeout};
use tracing::{debug, warn};

use wavecast_core::config::console::ConsoleConfig;

use super::state::{AgentEvent, AgentPhase, Effect, transition};
use crate::api::ConsoleApi;

/// Pause before retrying a failed initial status fetch.
const STATUS_RETRY: Duration = Duration::from_secs(3);

/// Upper bound on a best-effort release during teardown.
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Operator inputs fed to the agent by the embedding UI.
///
/// `Activity` stands for any observed interaction (pointer movement, key
/// press, click, scroll, touch) and only resets the inactivity deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    /// Confirm the current prompt.
    Confirm,
    /// Decline the current prompt.
    Decline,
    /// User interaction observed.
    Activity,
}

/// UI-side handle to a running agent.
///
/// Dropping every clone closes the input channel; the agent then releases
/// the lock (best-effort) and exits. The server-side expiry sweep is the
/// backstop if that release never lands.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    phase_rx: watch::Receiver<AgentPhase>,
    input_tx: mpsc::Sender<UserInput>,
}

impl AgentHandle {
    /// Watch the displayed phase.
    pub fn phase(&self) -> watch::Receiver<AgentPhase> {
        self.phase_rx.clone()
    }

    /// The phase currently displayed.
    pub fn current_phase(&self) -> AgentPhase {
        self.phase_rx.borrow().clone()
    }

    /// Confirm the current prompt.
    pub async fn confirm(&self) {
        let _ = self.input_tx.send(UserInput::Confirm).await;
    }

    /// Decline the current prompt.
    pub async fn decline(&self) {
        let _ = self.input_tx.send(UserInput::Decline).await;
    }

    /// Report user interaction (resets the inactivity deadline).
    pub async fn activity(&self) {
        let _ = self.input_tx.send(UserInput::Activity).await;
    }

    /// Drop this handle. Once the last clone is gone the agent tears down,
    /// firing a best-effort release if it still holds the lock.
    pub fn close(self) {}
}

/// The client session agent.
///
/// Generic over the transport: in-process ([`crate::coordinator::BoundConsole`])
/// or HTTP ([`crate::client::HttpConsoleClient`]).
pub struct ConsoleAgent<A: ConsoleApi> {
    api: Arc<A>,
    config: ConsoleConfig,
    phase_tx: watch::Sender<AgentPhase>,
    input_rx: mpsc::Receiver<UserInput>,
}

impl<A: ConsoleApi> ConsoleAgent<A> {
    /// Create an agent and its UI handle.
    pub fn new(api: Arc<A>, config: ConsoleConfig) -> (Self, AgentHandle) {
        let (phase_tx, phase_rx) = watch::channel(AgentPhase::Loading);
        let (input_tx, input_rx) = mpsc::channel(16);

        let agent = Self {
            api,
            config,
            phase_tx,
            input_rx,
        };
        let handle = AgentHandle { phase_rx, input_tx };

        (agent, handle)
    }

    /// Run the agent to completion (a terminal phase).
    pub async fn run(mut self) {
        let mut phase = AgentPhase::Loading;
        let mut queue: VecDeque<AgentEvent> = VecDeque::new();

        if let Some(event) = self.perform(Effect::FetchStatus).await {
            queue.push_back(event);
        }

        loop {
            // Drain queued events through the machine, executing effects as
            // they are produced.
            while let Some(event) = queue.pop_front() {
                let next = transition(phase.clone(), event);
                phase = next.phase;
                self.phase_tx.send_replace(phase.clone());
                for effect in next.effects {
                    if let Some(event) = self.perform(effect).await {
                        queue.push_back(event);
                    }
                }
            }

            if phase.is_terminal() {
                return;
            }

            let event = match &phase {
                AgentPhase::Loading => {
                    // The initial fetch failed; lock state is unknown.
                    sleep(STATUS_RETRY).await;
                    self.perform(Effect::FetchStatus).await
                }
                AgentPhase::Active => Some(self.run_active().await),
                _ => self.wait_for_input().await,
            };

            if let Some(event) = event {
                queue.push_back(event);
            }
        }
    }

    /// Wait for operator input while a prompt is showing.
    async fn wait_for_input(&mut self) -> Option<AgentEvent> {
        match self.input_rx.recv().await {
            Some(UserInput::Confirm) => Some(AgentEvent::UserConfirmed),
            Some(UserInput::Decline) => Some(AgentEvent::UserDeclined),
            // No inactivity tracking outside Active.
            Some(UserInput::Activity) => None,
            None => Some(AgentEvent::Closed),
        }
    }

    /// Hold the lock: heartbeat, poll for kick notices, and watch the
    /// inactivity deadline until one of them ends the active phase.
    async fn run_active(&mut self) -> AgentEvent {
        let heartbeat_period = self.config.heartbeat_interval();
        let kick_period = self.config.kick_check_interval();
        let inactivity = self.config.inactivity_threshold();

        let start = Instant::now();
        let mut heartbeat = interval_at(start + heartbeat_period, heartbeat_period);
        let mut kick_check = interval_at(start + kick_period, kick_period);
        let mut deadline = start + inactivity;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    match self.api.heartbeat().await {
                        Ok(status) if !status.active => return AgentEvent::LockLost,
                        Ok(_) => {}
                        // Unknown state: keep the lock displayed and try
                        // again next tick.
                        Err(err) => warn!(error = %err, "Heartbeat failed"),
                    }
                }
                _ = kick_check.tick() => {
                    match self.api.check_kicked().await {
                        Ok(notice) if notice.kicked => {
                            return match notice.kicked_by {
                                Some(by) => AgentEvent::KickNoticed(by),
                                None => AgentEvent::LockLost,
                            };
                        }
                        Ok(_) => {}
                        Err(err) => debug!(error = %err, "Kick check failed"),
                    }
                }
                _ = sleep_until(deadline) => return AgentEvent::InactivityElapsed,
                input = self.input_rx.recv() => match input {
                    Some(UserInput::Activity) => {
                        deadline = Instant::now() + inactivity;
                    }
                    // No prompt is showing; confirm/decline mean nothing.
                    Some(_) => {}
                    None => return AgentEvent::Closed,
                },
            }
        }
    }

    /// Execute one effect, turning its outcome into a follow-up event.
    async fn perform(&self, effect: Effect) -> Option<AgentEvent> {
        match effect {
            Effect::FetchStatus => match self.api.status().await {
                Ok(status) => Some(AgentEvent::StatusResolved(status)),
                Err(err) => {
                    warn!(error = %err, "Status fetch failed");
                    Some(AgentEvent::StatusFailed)
                }
            },
            Effect::Claim => match self.api.claim().await {
                Ok(()) => Some(AgentEvent::ClaimSucceeded),
                Err(err) => {
                    warn!(error = %err, "Claim failed");
                    Some(AgentEvent::ClaimFailed)
                }
            },
            Effect::Release => {
                // Best-effort: an undelivered release is reclaimed by the
                // server-side sweep.
                match timeout(RELEASE_TIMEOUT, self.api.release()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => debug!(error = %err, "Release failed"),
                    Err(_) => debug!("Release timed out"),
                }
                None
            }
            Effect::CheckKick => match self.api.check_kicked().await {
                Ok(notice) if notice.kicked => notice.kicked_by.map(AgentEvent::KickNoticed),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ConsoleCoordinator;
    use crate::dto::Caller;
    use crate::memory::MemoryLockStore;
    use crate::test_support::{AllowListOracle, caller};

    struct Rig {
        store: Arc<MemoryLockStore>,
        coordinator: Arc<ConsoleCoordinator>,
    }

    impl Rig {
        fn new() -> Self {
            let store = Arc::new(MemoryLockStore::new());
            let coordinator = Arc::new(ConsoleCoordinator::new(
                store.clone(),
                Arc::new(AllowListOracle::allow_all()),
                ConsoleConfig::default(),
            ));
            Self { store, coordinator }
        }

        fn spawn_agent(&self, who: &Caller) -> AgentHandle {
            let api = Arc::new(ConsoleCoordinator::bind(
                self.coordinator.clone(),
                who.clone(),
            ));
            let (agent, handle) = ConsoleAgent::new(api, ConsoleConfig::default());
            tokio::spawn(agent.run());
            handle
        }

        async fn active_holder(&self) -> Option<uuid::Uuid> {
            use crate::store::ConsoleLockStore;
            self.store
                .find_active()
                .await
                .expect("find_active")
                .map(|s| s.user_id)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_entry_flow_reaches_active() {
        let rig = Rig::new();
        let a = caller("dj-a");
        let handle = rig.spawn_agent(&a);
        let mut phase = handle.phase();

        phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("confirm prompt");
        assert_eq!(rig.active_holder().await, None);

        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active");
        assert_eq!(rig.active_holder().await, Some(a.user_id));
    }

    #[tokio::test(start_paused = true)]
    async fn declining_entry_exits_without_claiming() {
        let rig = Rig::new();
        let handle = rig.spawn_agent(&caller("dj-a"));
        let mut phase = handle.phase();

        phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("confirm prompt");
        handle.decline().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Exited))
            .await
            .expect("exited");
        assert_eq!(rig.active_holder().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn takeover_evicts_the_previous_holder() {
        let rig = Rig::new();
        let a = caller("dj-a");
        let b = caller("dj-b");

        let a_handle = rig.spawn_agent(&a);
        let mut a_phase = a_handle.phase();
        a_phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("a prompt");
        a_handle.confirm().await;
        a_phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("a active");

        // B arrives and is offered takeover, naming the current holder.
        let b_handle = rig.spawn_agent(&b);
        let mut b_phase = b_handle.phase();
        b_phase
            .wait_for(|p| {
                matches!(p, AgentPhase::TakeoverPrompt { holder } if holder.user_name == "dj-a")
            })
            .await
            .expect("b takeover prompt");

        b_handle.confirm().await;
        b_phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("b active");
        assert_eq!(rig.active_holder().await, Some(b.user_id));

        // A discovers the loss on its next poll and learns who took over.
        a_phase
            .wait_for(|p| {
                matches!(
                    p,
                    AgentPhase::Kicked { by: Some(by) } if by.user_name == "dj-b"
                )
            })
            .await
            .expect("a kicked");
    }

    #[tokio::test(start_paused = true)]
    async fn kicked_holder_can_reclaim() {
        let rig = Rig::new();
        let a = caller("dj-a");
        let b = caller("dj-b");

        let handle = rig.spawn_agent(&a);
        let mut phase = handle.phase();
        phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("prompt");
        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active");

        // B takes the lock out-of-band.
        rig.coordinator.claim(&b).await.expect("b claims");

        phase
            .wait_for(|p| matches!(p, AgentPhase::Kicked { .. }))
            .await
            .expect("kicked");

        // Confirming from the kicked prompt claims straight back.
        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active again");
        assert_eq!(rig.active_holder().await, Some(a.user_id));
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_releases_and_allows_reconnect() {
        let rig = Rig::new();
        let a = caller("dj-a");
        let handle = rig.spawn_agent(&a);
        let mut phase = handle.phase();

        phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("prompt");
        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active");

        // No interaction: the 5-minute deadline fires and the lock is
        // proactively released.
        phase
            .wait_for(|p| matches!(p, AgentPhase::InactiveTimeout))
            .await
            .expect("inactive timeout");
        sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.active_holder().await, None);

        // Reconnect: nobody is in the way, so confirm goes straight back
        // to active via a fresh claim.
        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active after reconnect");
        assert_eq!(rig.active_holder().await, Some(a.user_id));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_defers_the_inactivity_deadline() {
        let rig = Rig::new();
        let handle = rig.spawn_agent(&caller("dj-a"));
        let mut phase = handle.phase();

        phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("prompt");
        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active");

        // Interact shortly before the deadline; the timer restarts.
        sleep(Duration::from_secs(250)).await;
        handle.activity().await;
        sleep(Duration::from_secs(1)).await;

        // 250 s later we are past the original deadline but well inside
        // the restarted one.
        sleep(Duration::from_secs(250)).await;
        assert!(matches!(handle.current_phase(), AgentPhase::Active));

        // And without further interaction the restarted deadline fires.
        phase
            .wait_for(|p| matches!(p, AgentPhase::InactiveTimeout))
            .await
            .expect("inactive timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_releases_the_lock() {
        let rig = Rig::new();
        let a = caller("dj-a");
        let handle = rig.spawn_agent(&a);
        let mut phase = handle.phase();

        phase
            .wait_for(|p| matches!(p, AgentPhase::ConfirmEntry))
            .await
            .expect("prompt");
        handle.confirm().await;
        phase
            .wait_for(|p| matches!(p, AgentPhase::Active))
            .await
            .expect("active");

        // Simulate the tab closing.
        handle.close();
        phase
            .wait_for(|p| matches!(p, AgentPhase::Exited))
            .await
            .expect("exited");
        sleep(Duration::from_millis(10)).await;
        assert_eq!(rig.active_holder().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_user_sees_terminal_denied() {
        let store = Arc::new(MemoryLockStore::new());
        let coordinator = Arc::new(ConsoleCoordinator::new(
            store,
            Arc::new(AllowListOracle::allowing(Vec::new())),
            ConsoleConfig::default(),
        ));
        let api = Arc::new(ConsoleCoordinator::bind(coordinator, caller("listener")));
        let (agent, handle) = ConsoleAgent::new(api, ConsoleConfig::default());
        tokio::spawn(agent.run());

        let mut phase = handle.phase();
        phase
            .wait_for(|p| matches!(p, AgentPhase::Denied))
            .await
            .expect("denied");
    }
}
