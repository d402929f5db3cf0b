use std::sync::Mutex;

use uuid::Uuid;

use crate::entities::WorkflowStep;

pub trait Navigator: Send + Sync {
    fn advance_to(&self, workflow_id: Uuid, step: WorkflowStep);
}

#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn advance_to(&self, workflow_id: Uuid, step: WorkflowStep) {
        tracing::info!(%workflow_id, "navigating to {}", step.name());
    }
}

/// Keeps every navigation in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<(Uuid, WorkflowStep)>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<(Uuid, WorkflowStep)> {
        match self.visits.lock() {
            Ok(visits) => visits.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn steps_for(&self, workflow_id: Uuid) -> Vec<WorkflowStep> {
        self.visits()
            .into_iter()
            .filter(|(id, _)| *id == workflow_id)
            .map(|(_, step)| step)
            .collect()
    }
}

impl Navigator for RecordingNavigator {
    fn advance_to(&self, workflow_id: Uuid, step: WorkflowStep) {
        let mut visits = match self.visits.lock() {
            Ok(visits) => visits,
            Err(poisoned) => poisoned.into_inner(),
        };

        visits.push((workflow_id, step));
    }
}

#[test]
fn recording_navigator_filters_by_workflow() {
    let navigator = RecordingNavigator::new();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    navigator.advance_to(first, WorkflowStep::PhoneVerification);
    navigator.advance_to(second, WorkflowStep::PhoneVerification);
    navigator.advance_to(first, WorkflowStep::RideDetails);

    assert_eq!(
        navigator.steps_for(first),
        vec![WorkflowStep::PhoneVerification, WorkflowStep::RideDetails]
    );
    assert_eq!(navigator.visits().len(), 3);
}
