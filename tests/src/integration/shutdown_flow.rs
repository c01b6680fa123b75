//! # Staged Shutdown Flow
//!
//! Registers every well-known telematics component plus a few named ones,
//! each finishing asynchronously on its own thread after a short delay, and
//! checks that the coordinator's background loop honours the stage
//! barriers end to end.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use shared_types::{ComponentRole, Identity, NotifyShutdown, ReceiverStatus};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::{Duration, Instant};
    use tc_01_shutdown_coordinator::{
        CoordinatorConfig, ReceiverRegistry, ShutdownCoordinator, StagePlan,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Default)]
    struct Timeline {
        notified: Mutex<HashMap<Identity, Instant>>,
        completed: Mutex<HashMap<Identity, Instant>>,
    }

    /// Finishes `delay` after its first notification, on its own thread.
    struct SimulatedComponent {
        identity: Identity,
        delay: Duration,
        registry: Arc<ReceiverRegistry>,
        timeline: Arc<Timeline>,
        notify_count: AtomicUsize,
    }

    impl NotifyShutdown for SimulatedComponent {
        fn notify_shutdown(&self) {
            if self.notify_count.fetch_add(1, Ordering::SeqCst) > 0 {
                return;
            }
            self.timeline
                .notified
                .lock()
                .insert(self.identity.clone(), Instant::now());

            let identity = self.identity.clone();
            let delay = self.delay;
            let registry = Arc::clone(&self.registry);
            let timeline = Arc::clone(&self.timeline);
            thread::spawn(move || {
                thread::sleep(delay);
                timeline.completed.lock().insert(identity.clone(), Instant::now());
                registry.mark_ready(&identity);
            });
        }
    }

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig {
            grace_period: Duration::from_millis(20),
            tick_interval: Duration::from_millis(10),
        }
    }

    fn build(
        plan: StagePlan,
    ) -> (
        Arc<ReceiverRegistry>,
        Arc<ShutdownCoordinator>,
        Arc<Timeline>,
        mpsc::Receiver<()>,
    ) {
        let registry = Arc::new(ReceiverRegistry::new());
        let (done_tx, done_rx) = mpsc::channel();
        let done_tx = Mutex::new(done_tx);
        let coordinator = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&registry),
            plan,
            fast_config(),
            Arc::new(move || {
                let _ = done_tx.lock().send(());
            }),
        ));
        (registry, coordinator, Arc::new(Timeline::default()), done_rx)
    }

    fn add_component(
        coordinator: &ShutdownCoordinator,
        registry: &Arc<ReceiverRegistry>,
        timeline: &Arc<Timeline>,
        identity: Identity,
        delay: Duration,
    ) -> Arc<SimulatedComponent> {
        let component = Arc::new(SimulatedComponent {
            identity: identity.clone(),
            delay,
            registry: Arc::clone(registry),
            timeline: Arc::clone(timeline),
            notify_count: AtomicUsize::new(0),
        });
        assert!(coordinator.register(identity, Some(component.clone())));
        component
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    #[test]
    fn test_full_topology_respects_stage_barriers() {
        let plan = StagePlan::default();
        let (registry, coordinator, timeline, done) = build(plan.clone());

        let mut components = Vec::new();
        for (i, role) in ComponentRole::all().iter().enumerate() {
            // Uneven delays so stages finish at different times.
            let delay = Duration::from_millis(5 + (i as u64 * 7) % 30);
            components.push(add_component(
                &coordinator,
                &registry,
                &timeline,
                Identity::Fixed(*role),
                delay,
            ));
        }
        for name in ["gps-logger", "can-sniffer"] {
            components.push(add_component(
                &coordinator,
                &registry,
                &timeline,
                Identity::named(name),
                Duration::from_millis(15),
            ));
        }

        coordinator.start().unwrap();
        done.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(coordinator.is_finished());
        assert!(coordinator.is_complete());

        let notified = timeline.notified.lock();
        let completed = timeline.completed.lock();
        let stages = plan.stages();
        for k in 1..stages.len() {
            let barrier = stages[..k]
                .iter()
                .flatten()
                .map(|role| completed[&Identity::Fixed(*role)])
                .max()
                .unwrap();
            for role in &stages[k] {
                assert!(
                    notified[&Identity::Fixed(*role)] >= barrier,
                    "{} notified before stage {} finished",
                    role,
                    k
                );
            }
        }

        for component in &components {
            assert!(component.notify_count.load(Ordering::SeqCst) >= 1);
            assert_eq!(
                registry.status(&component.identity),
                Some(ReceiverStatus::ShutdownCompleted)
            );
        }
    }

    #[test]
    fn test_unsubscribed_component_does_not_hold_its_stage() {
        let plan = StagePlan::new(vec![
            vec![ComponentRole::MidHandler, ComponentRole::NotificationListener],
            vec![ComponentRole::MqttClient],
        ])
        .unwrap();
        let (registry, coordinator, timeline, done) = build(plan);

        // Registered but never finishes on its own.
        add_component(
            &coordinator,
            &registry,
            &timeline,
            ComponentRole::MidHandler.into(),
            Duration::from_secs(3600),
        );
        add_component(
            &coordinator,
            &registry,
            &timeline,
            ComponentRole::NotificationListener.into(),
            Duration::from_millis(5),
        );
        add_component(
            &coordinator,
            &registry,
            &timeline,
            ComponentRole::MqttClient.into(),
            Duration::from_millis(5),
        );

        coordinator.start().unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(!coordinator.is_finished());
        assert_eq!(
            registry.status(&ComponentRole::MqttClient.into()),
            Some(ReceiverStatus::Subscribed)
        );

        assert!(coordinator.unregister(&ComponentRole::MidHandler.into()));
        done.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            registry.status(&ComponentRole::MidHandler.into()),
            Some(ReceiverStatus::Unsubscribed)
        );
        assert_eq!(
            registry.status(&ComponentRole::MqttClient.into()),
            Some(ReceiverStatus::ShutdownCompleted)
        );
    }

    #[test]
    fn test_late_named_registration_is_picked_up() {
        let (registry, coordinator, timeline, done) = build(StagePlan::default());
        add_component(
            &coordinator,
            &registry,
            &timeline,
            ComponentRole::LifecycleController.into(),
            Duration::from_millis(100),
        );

        coordinator.start().unwrap();
        // Registers while the last stage is still running.
        thread::sleep(Duration::from_millis(40));
        let late = add_component(
            &coordinator,
            &registry,
            &timeline,
            Identity::named("late-uploader"),
            Duration::from_millis(5),
        );

        done.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(late.notify_count.load(Ordering::SeqCst) >= 1);
    }
}
