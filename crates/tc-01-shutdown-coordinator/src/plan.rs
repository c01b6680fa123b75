//! # Stage Plan
//!
//! The single source of notification ordering. Fixed at coordinator
//! construction; stages are pairwise disjoint.

use crate::errors::CoordinatorError;
use shared_types::ComponentRole;
use std::collections::HashMap;

/// Ordered shutdown stages of well-known roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<Vec<ComponentRole>>,
}

impl StagePlan {
    /// Build a plan, rejecting roles that appear in more than one stage.
    pub fn new(stages: Vec<Vec<ComponentRole>>) -> Result<Self, CoordinatorError> {
        let mut seen: HashMap<ComponentRole, usize> = HashMap::new();
        for (index, stage) in stages.iter().enumerate() {
            for role in stage {
                if let Some(first) = seen.insert(*role, index) {
                    return Err(CoordinatorError::InvalidPlan {
                        role: *role,
                        first,
                        second: index,
                    });
                }
            }
        }
        Ok(Self { stages })
    }

    #[must_use]
    pub fn stages(&self) -> &[Vec<ComponentRole>] {
        &self.stages
    }

    /// Index of the stage containing `role`.
    #[must_use]
    pub fn stage_of(&self, role: ComponentRole) -> Option<usize> {
        self.stages.iter().position(|stage| stage.contains(&role))
    }

    #[must_use]
    pub fn contains(&self, role: ComponentRole) -> bool {
        self.stage_of(role).is_some()
    }

    /// All staged roles in plan order.
    pub fn roles(&self) -> impl Iterator<Item = ComponentRole> + '_ {
        self.stages.iter().flatten().copied()
    }
}

impl Default for StagePlan {
    /// Producers stop first, then the controllers consuming their output,
    /// then the upload path, then storage and the broker link, and finally
    /// the lifecycle controller.
    fn default() -> Self {
        use ComponentRole::*;
        Self {
            stages: vec![
                vec![ExternalReceiveBridge, NotificationListener, MidHandler],
                vec![MessageController, UploadController],
                vec![MqttUploader, MessageQueue],
                vec![MqttClient, CacheTransport, DbTransport],
                vec![LifecycleController],
            ],
        }
    }
}
