//! # Shutdown Coordinator
//!
//! Drives staged shutdown on a dedicated background thread.
//!
//! ## Run Sequence
//!
//! 1. Sleep the grace period so late components can still register.
//! 2. Tick every `tick_interval` until every tracked receiver is terminal:
//!    notify `Subscribed` named receivers, walk the stages in plan order
//!    stopping at the first stage that is not yet drained, then evaluate
//!    the completion predicate.
//! 3. Detach the coordinator thread and fire the `CompleteShutdown` hook once.
//!
//! The loop has no global timeout and no cancellation hook; it exits only
//! through the completion predicate.

use crate::config::CoordinatorConfig;
use crate::errors::CoordinatorError;
use crate::plan::StagePlan;
use crate::registry::{ReceiverEntry, ReceiverRegistry};
use parking_lot::Mutex;
use shared_types::{
    CompleteShutdown, Identity, ManagedThread, NotifyShutdown, ReceiverStatus, ThreadContext,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

const THREAD_NAME: &str = "shutdown-coordinator";

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Receivers notified during this tick, named ones first.
    pub notified: Vec<Identity>,
    /// Index of the stage that held the barrier, if any.
    pub blocked_at_stage: Option<usize>,
    /// Whether every tracked receiver was terminal after the tick.
    pub complete: bool,
}

/// Staged shutdown orchestrator.
pub struct ShutdownCoordinator {
    registry: Arc<ReceiverRegistry>,
    plan: StagePlan,
    config: CoordinatorConfig,
    on_complete: Arc<dyn CompleteShutdown>,
    worker: Mutex<Option<ManagedThread>>,
    finished: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(
        registry: Arc<ReceiverRegistry>,
        plan: StagePlan,
        config: CoordinatorConfig,
        on_complete: Arc<dyn CompleteShutdown>,
    ) -> Self {
        Self {
            registry,
            plan,
            config,
            on_complete,
            worker: Mutex::new(None),
            finished: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ReceiverRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Register a component. Warns when a well-known role is not part of
    /// the stage plan, since such a receiver would never be notified.
    pub fn register(&self, identity: Identity, receiver: Option<Arc<dyn NotifyShutdown>>) -> bool {
        if let Some(role) = identity.role() {
            if !self.plan.contains(role) {
                warn!(
                    "[Coordinator] {} is not part of the stage plan and will never be notified",
                    role
                );
            }
        }
        self.registry.register(identity, receiver)
    }

    pub fn unregister(&self, identity: &Identity) -> bool {
        self.registry.unregister(identity)
    }

    pub fn mark_ready(&self, identity: &Identity) -> bool {
        self.registry.mark_ready(identity)
    }

    /// Start the background loop.
    pub fn start(self: &Arc<Self>) -> Result<(), CoordinatorError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(CoordinatorError::AlreadyStarted);
        }

        let this = Arc::clone(self);
        let thread = ManagedThread::start(THREAD_NAME, move |ctx| this.run(&ctx))?;
        *worker = Some(thread);

        info!(
            "[Coordinator] Shutdown started: {} stages, {} receivers registered",
            self.plan.stages().len(),
            self.registry.len()
        );
        Ok(())
    }

    /// Whether the completion hook has fired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Run one iteration: notify named receivers, notify the current stage,
    /// then evaluate completion.
    pub fn tick(&self) -> TickReport {
        let mut to_notify: Vec<(Identity, Arc<dyn NotifyShutdown>)> = Vec::new();

        let blocked_at_stage = self.registry.with_entries(|entries| {
            for (identity, entry) in entries.iter_mut() {
                if identity.is_named() && entry.status == ReceiverStatus::Subscribed {
                    entry.status = ReceiverStatus::Notified;
                    to_notify.push((identity.clone(), Arc::clone(&entry.receiver)));
                }
            }
            self.advance_stages(entries, &mut to_notify)
        });

        // Outside the lock: receivers may call mark_ready from inside notify.
        for (identity, receiver) in &to_notify {
            debug!("[Coordinator] Notifying {}", identity);
            receiver.notify_shutdown();
        }

        let complete = self.is_complete();
        if let Some(stage) = blocked_at_stage {
            debug!("[Coordinator] Waiting on stage {}", stage + 1);
        }

        TickReport {
            notified: to_notify.into_iter().map(|(identity, _)| identity).collect(),
            blocked_at_stage,
            complete,
        }
    }

    /// Walk stages in order, notifying `Subscribed` members, and stop at the
    /// first stage with a non-terminal member. Returns that stage's index.
    fn advance_stages(
        &self,
        entries: &mut HashMap<Identity, ReceiverEntry>,
        to_notify: &mut Vec<(Identity, Arc<dyn NotifyShutdown>)>,
    ) -> Option<usize> {
        for (index, stage) in self.plan.stages().iter().enumerate() {
            let mut drained = true;

            for role in stage {
                let identity = Identity::Fixed(*role);
                // Staged roles that never registered do not hold the barrier.
                let Some(entry) = entries.get_mut(&identity) else {
                    continue;
                };

                match entry.status {
                    ReceiverStatus::Subscribed => {
                        entry.status = ReceiverStatus::Notified;
                        to_notify.push((identity, Arc::clone(&entry.receiver)));
                        drained = false;
                    }
                    ReceiverStatus::Notified => drained = false,
                    ReceiverStatus::ShutdownCompleted | ReceiverStatus::Unsubscribed => {}
                }
            }

            if !drained {
                return Some(index);
            }
        }
        None
    }

    /// True iff every named receiver and every registered staged receiver
    /// is terminal.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.registry.with_entries(|entries| {
            let named_done = entries
                .iter()
                .filter(|(identity, _)| identity.is_named())
                .all(|(_, entry)| entry.status.is_terminal());

            named_done
                && self.plan.roles().all(|role| {
                    entries
                        .get(&Identity::Fixed(role))
                        .map_or(true, |entry| entry.status.is_terminal())
                })
        })
    }

    fn run(&self, ctx: &ThreadContext) {
        info!(
            "[Coordinator] Waiting {:?} for late registrations",
            self.config.grace_period
        );
        ctx.sleep(self.config.grace_period);

        let mut ticks: u64 = 0;
        loop {
            ticks += 1;
            let report = self.tick();
            if report.complete {
                info!("[Coordinator] All receivers finished after {} ticks", ticks);
                break;
            }
            ctx.sleep(self.config.tick_interval);
        }

        self.finalize(ctx);
    }

    fn finalize(&self, ctx: &ThreadContext) {
        ctx.detach();
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("[Coordinator] Completing process shutdown");
        self.on_complete.complete_shutdown();
    }
}
