use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    entities::Workflow,
    error::{invalid_input_error, invalid_invocation_error, Error},
};

#[derive(Default)]
pub(crate) struct Workflows {
    by_id: HashMap<Uuid, Arc<Mutex<Workflow>>>,
    // rider_id -> the one workflow that rider has not confirmed yet
    in_flight: HashMap<Uuid, Uuid>,
}

/// Each workflow sits behind its own lock so that it handles one submission at
/// a time while other workflows move on in parallel.
pub(crate) type Registry = RwLock<Workflows>;

#[tracing::instrument(skip(workflows))]
pub(crate) async fn fetch_workflow(workflows: &Registry, id: &Uuid) -> Result<Arc<Mutex<Workflow>>, Error> {
    let workflow = workflows
        .read()
        .await
        .by_id
        .get(id)
        .cloned()
        .ok_or_else(invalid_input_error)?;

    Ok(workflow)
}

/// Registers `workflow` as its rider's draft, unless the rider already has one
/// in flight.
#[tracing::instrument(skip(workflows, workflow), fields(workflow_id = %workflow.id))]
pub(crate) async fn reserve_workflow(workflows: &Registry, workflow: Workflow) -> Result<(), Error> {
    let mut workflows = workflows.write().await;

    if let Some(existing) = workflows.in_flight.get(&workflow.rider_id) {
        tracing::info!(existing_id = %existing, "rider already has a draft in flight");
        return Err(invalid_invocation_error());
    }

    workflows.in_flight.insert(workflow.rider_id, workflow.id);
    workflows
        .by_id
        .insert(workflow.id, Arc::new(Mutex::new(workflow)));

    Ok(())
}

#[tracing::instrument(skip(workflows))]
pub(crate) async fn discard_workflow(workflows: &Registry, rider_id: Uuid, id: Uuid) {
    let mut workflows = workflows.write().await;

    workflows.by_id.remove(&id);
    release_rider_locked(&mut workflows, rider_id, id);
}

/// Lets the rider start a new draft once `id` is confirmed.
#[tracing::instrument(skip(workflows))]
pub(crate) async fn release_rider(workflows: &Registry, rider_id: Uuid, id: Uuid) {
    release_rider_locked(&mut *workflows.write().await, rider_id, id);
}

fn release_rider_locked(workflows: &mut Workflows, rider_id: Uuid, id: Uuid) {
    if workflows.in_flight.get(&rider_id) == Some(&id) {
        workflows.in_flight.remove(&rider_id);
    }
}

#[test]
fn one_reservation_per_rider() {
    use tokio_test::block_on;

    let registry = Registry::default();
    let rider_id = Uuid::new_v4();

    let first = Workflow::new(rider_id, "+15550100".into());
    let second = Workflow::new(rider_id, "+15550100".into());

    block_on(reserve_workflow(&registry, first.clone())).unwrap();

    let err = block_on(reserve_workflow(&registry, second.clone())).unwrap_err();
    assert_eq!(err, invalid_invocation_error());
    assert!(block_on(fetch_workflow(&registry, &second.id)).is_err());

    // releasing someone else's id leaves the reservation alone
    block_on(release_rider(&registry, rider_id, second.id));
    assert!(block_on(reserve_workflow(&registry, second.clone())).is_err());

    block_on(release_rider(&registry, rider_id, first.id));
    block_on(reserve_workflow(&registry, second.clone())).unwrap();

    assert!(block_on(fetch_workflow(&registry, &first.id)).is_ok());
    assert!(block_on(fetch_workflow(&registry, &second.id)).is_ok());

    block_on(discard_workflow(&registry, rider_id, second.id));
    assert!(block_on(fetch_workflow(&registry, &second.id)).is_err());
    block_on(reserve_workflow(&registry, Workflow::new(rider_id, "+15550100".into()))).unwrap();
}
