use super::helpers::{discard_workflow, fetch_workflow, release_rider, reserve_workflow};
use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{WorkflowAPI, WorkflowView},
    auth::User,
    entities::{Submission, Transition, Workflow},
    error::Error,
    session::ACCESS_TOKEN_KEY,
};

#[async_trait]
impl WorkflowAPI for Engine {
    #[tracing::instrument(skip(self, phone_number, access_token))]
    async fn create_workflow(
        &self,
        user: User,
        phone_number: String,
        access_token: String,
    ) -> Result<WorkflowView, Error> {
        let workflow = Workflow::new(user.id, phone_number);

        reserve_workflow(&self.workflows, workflow.clone()).await?;

        let stored = match self.sessions.open(user.id).await {
            Ok(sessions) => sessions.put(ACCESS_TOKEN_KEY, access_token).await,
            Err(err) => Err(err),
        };

        if let Err(err) = stored {
            discard_workflow(&self.workflows, user.id, workflow.id).await;
            return Err(err);
        }

        tracing::info!(workflow_id = %workflow.id, "workflow created");

        Ok(WorkflowView {
            workflow,
            booking: None,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn find_workflow(&self, user: User, id: Uuid) -> Result<WorkflowView, Error> {
        let workflow = fetch_workflow(&self.workflows, &id).await?.lock().await.clone();

        self.authorize(user.clone(), "read", workflow.clone())?;

        Ok(WorkflowView {
            workflow,
            booking: None,
        })
    }

    #[tracing::instrument(skip(self, submission), fields(submitted = submission.step().name()))]
    async fn submit(
        &self,
        user: User,
        id: Uuid,
        submission: Submission,
    ) -> Result<WorkflowView, Error> {
        let handle = fetch_workflow(&self.workflows, &id).await?;

        // held until the transition is committed
        let mut workflow = handle.lock().await;

        self.authorize(user.clone(), "submit", workflow.clone())?;

        let Transition {
            workflow: next,
            booking,
        } = workflow.advance(submission).map_err(|rejection| {
            tracing::info!("submission rejected: {:?}", rejection);
            Error::from(rejection)
        })?;

        if next.step().is_terminal() {
            let sessions = self.sessions.open(next.rider_id).await?;

            sessions.remove(ACCESS_TOKEN_KEY).await.map_err(|err| {
                tracing::warn!("failed to clear access token, staying on {}", workflow.step().name());
                err
            })?;

            tracing::info!("access token cleared");
        }

        *workflow = next;

        if workflow.step().is_terminal() {
            release_rider(&self.workflows, workflow.rider_id, workflow.id).await;
        }

        self.navigator.advance_to(workflow.id, workflow.step());

        Ok(WorkflowView {
            workflow: workflow.clone(),
            booking,
        })
    }
}

#[cfg(test)]
fn traversal() -> Vec<Submission> {
    use crate::entities::VehicleClass;

    vec![
        Submission::Registration {
            name: "Ada".into(),
            email: "ada@example.com".into(),
        },
        Submission::PhoneVerification { otp: "1234".into() },
        Submission::RideDetails {
            pickup: "A".into(),
            dropoff: "B".into(),
        },
        Submission::FareReview {
            distance: "10".into(),
            vehicle_class: VehicleClass::Economy,
        },
    ]
}

#[test]
fn end_to_end_booking() {
    use super::test_engine;
    use crate::entities::WorkflowStep;
    use crate::session::SessionBackend;
    use tokio_test::block_on;

    let (engine, sessions, navigator) = test_engine();
    let rider = User::new_rider(Uuid::new_v4());

    let view = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "token".into()))
        .unwrap();
    let id = view.workflow.id;
    assert_eq!(view.workflow.step(), WorkflowStep::Registration);

    let store = block_on(sessions.open(rider.id)).unwrap();
    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), Some("token".into()));

    let mut submissions = traversal().into_iter();

    let view = block_on(engine.submit(rider.clone(), id, submissions.next().unwrap())).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::PhoneVerification);
    assert_eq!(view.workflow.draft().unwrap().rider_name, "Ada");

    let view = block_on(engine.submit(rider.clone(), id, submissions.next().unwrap())).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::RideDetails);

    let view = block_on(engine.submit(rider.clone(), id, submissions.next().unwrap())).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::FareReview);
    assert!(view.booking.is_none());

    let view = block_on(engine.submit(rider.clone(), id, submissions.next().unwrap())).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::Confirmed);
    assert_eq!(view.booking.unwrap().fare_estimate, 100.0);
    assert!(view.workflow.draft().is_none());

    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), None);

    assert_eq!(
        navigator.steps_for(id),
        vec![
            WorkflowStep::PhoneVerification,
            WorkflowStep::RideDetails,
            WorkflowStep::FareReview,
            WorkflowStep::Confirmed,
        ]
    );

    let view = block_on(engine.find_workflow(rider, id)).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::Confirmed);
}

#[test]
fn rejected_submission_reports_failure() {
    use super::test_engine;
    use crate::entities::WorkflowStep;
    use crate::validation::ValidationFailure;
    use tokio_test::block_on;

    let (engine, _, navigator) = test_engine();
    let rider = User::new_rider(Uuid::new_v4());

    let id = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "token".into()))
        .unwrap()
        .workflow
        .id;

    for submission in traversal().into_iter().take(2) {
        block_on(engine.submit(rider.clone(), id, submission)).unwrap();
    }

    let err = block_on(engine.submit(
        rider.clone(),
        id,
        Submission::RideDetails {
            pickup: "A".into(),
            dropoff: "A".into(),
        },
    ))
    .unwrap_err();

    assert_eq!(err.validation_failure(), Some(ValidationFailure::SameLocation));

    let view = block_on(engine.find_workflow(rider, id)).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::RideDetails);
    assert_eq!(navigator.steps_for(id).len(), 2);
}

#[test]
fn negative_distance_keeps_token_and_fare() {
    use super::test_engine;
    use crate::entities::{VehicleClass, WorkflowStep};
    use crate::session::SessionBackend;
    use crate::validation::ValidationFailure;
    use tokio_test::block_on;

    let (engine, sessions, _) = test_engine();
    let rider = User::new_rider(Uuid::new_v4());

    let id = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "token".into()))
        .unwrap()
        .workflow
        .id;

    for submission in traversal().into_iter().take(3) {
        block_on(engine.submit(rider.clone(), id, submission)).unwrap();
    }

    let err = block_on(engine.submit(
        rider.clone(),
        id,
        Submission::FareReview {
            distance: "-5".into(),
            vehicle_class: VehicleClass::Economy,
        },
    ))
    .unwrap_err();

    assert_eq!(err.validation_failure(), Some(ValidationFailure::Negative));

    let view = block_on(engine.find_workflow(rider.clone(), id)).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::FareReview);
    assert_eq!(view.workflow.draft().unwrap().fare_estimate, None);

    let store = block_on(sessions.open(rider.id)).unwrap();
    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), Some("token".into()));
}

#[test]
fn out_of_step_submission_is_invalid_invocation() {
    use super::test_engine;
    use crate::error::invalid_invocation_error;
    use tokio_test::block_on;

    let (engine, _, _) = test_engine();
    let rider = User::new_rider(Uuid::new_v4());

    let id = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "token".into()))
        .unwrap()
        .workflow
        .id;

    let err = block_on(engine.submit(
        rider,
        id,
        Submission::PhoneVerification { otp: "1234".into() },
    ))
    .unwrap_err();

    assert_eq!(err, invalid_invocation_error());
}

#[test]
fn strangers_cannot_touch_a_workflow() {
    use super::test_engine;
    use crate::error::{invalid_input_error, unauthorized_error};
    use tokio_test::block_on;

    let (engine, _, _) = test_engine();
    let owner = User::new_rider(Uuid::new_v4());
    let stranger = User::new_rider(Uuid::new_v4());

    let id = block_on(engine.create_workflow(owner, "+15550100".into(), "token".into()))
        .unwrap()
        .workflow
        .id;

    let err = block_on(engine.find_workflow(stranger.clone(), id)).unwrap_err();
    assert_eq!(err, unauthorized_error());

    let err = block_on(engine.submit(stranger.clone(), id, traversal().remove(0))).unwrap_err();
    assert_eq!(err, unauthorized_error());

    let view = block_on(engine.find_workflow(User::new_system_user(), id)).unwrap();
    assert_eq!(view.workflow.id, id);

    let err = block_on(engine.find_workflow(stranger, Uuid::new_v4())).unwrap_err();
    assert_eq!(err, invalid_input_error());
}

#[test]
fn one_draft_per_rider() {
    use super::test_engine;
    use crate::entities::WorkflowStep;
    use crate::error::invalid_invocation_error;
    use crate::session::SessionBackend;
    use tokio_test::block_on;

    let (engine, sessions, _) = test_engine();
    let rider = User::new_rider(Uuid::new_v4());

    let first = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "t1".into()))
        .unwrap()
        .workflow
        .id;

    let err = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "t2".into()))
        .unwrap_err();
    assert_eq!(err, invalid_invocation_error());

    let store = block_on(sessions.open(rider.id)).unwrap();
    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), Some("t1".into()));

    // other riders are unaffected
    let other = User::new_rider(Uuid::new_v4());
    block_on(engine.create_workflow(other, "+15550101".into(), "t3".into())).unwrap();

    for submission in traversal() {
        block_on(engine.submit(rider.clone(), first, submission)).unwrap();
    }

    let second = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "t2".into()))
        .unwrap()
        .workflow;
    assert_ne!(second.id, first);
    assert_eq!(second.step(), WorkflowStep::Registration);
    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), Some("t2".into()));
}

#[test]
fn concurrent_creates_leave_one_draft() {
    use std::sync::Arc;

    use super::test_engine;

    let (engine, _, _) = test_engine();
    let engine = Arc::new(engine);
    let rider = User::new_rider(Uuid::new_v4());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let engine = engine.clone();
                let rider = rider.clone();

                tokio::spawn(async move {
                    engine
                        .create_workflow(rider, "+15550100".into(), format!("t{}", n))
                        .await
                })
            })
            .collect();

        let created = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(|result| result.is_ok())
            .count();

        assert_eq!(created, 1);
    });
}

#[test]
fn failed_token_removal_keeps_fare_review() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::entities::WorkflowStep;
    use crate::error::upstream_error;
    use crate::history::StaticHistoryFeed;
    use crate::navigation::RecordingNavigator;
    use crate::session::{MemorySessionStore, SessionBackend, SessionStore};
    use tokio_test::block_on;

    #[derive(Default)]
    struct FlakyStore {
        inner: MemorySessionStore,
        failing: AtomicBool,
        removals: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>, Error> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, token: String) -> Result<(), Error> {
            self.inner.put(key, token).await
        }

        async fn remove(&self, key: &str) -> Result<(), Error> {
            self.removals.fetch_add(1, Ordering::SeqCst);

            if self.failing.load(Ordering::SeqCst) {
                return Err(upstream_error());
            }

            self.inner.remove(key).await
        }
    }

    struct FlakyBackend(Arc<FlakyStore>);

    #[async_trait]
    impl SessionBackend for FlakyBackend {
        async fn open(&self, _: Uuid) -> Result<Arc<dyn SessionStore>, Error> {
            Ok(self.0.clone())
        }
    }

    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);

    let navigator = Arc::new(RecordingNavigator::new());
    let engine = Engine::new(
        Arc::new(FlakyBackend(store.clone())),
        navigator.clone(),
        Arc::new(StaticHistoryFeed::default()),
    )
    .unwrap();

    let rider = User::new_rider(Uuid::new_v4());
    let id = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "token".into()))
        .unwrap()
        .workflow
        .id;

    let mut submissions = traversal();
    let confirm = submissions.pop().unwrap();

    for submission in submissions {
        block_on(engine.submit(rider.clone(), id, submission)).unwrap();
    }

    let err = block_on(engine.submit(rider.clone(), id, confirm.clone())).unwrap_err();
    assert_eq!(err, upstream_error());

    let view = block_on(engine.find_workflow(rider.clone(), id)).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::FareReview);
    assert!(!navigator.steps_for(id).contains(&WorkflowStep::Confirmed));

    store.failing.store(false, Ordering::SeqCst);

    let view = block_on(engine.submit(rider.clone(), id, confirm)).unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::Confirmed);
    assert_eq!(store.removals.load(Ordering::SeqCst), 2);
    assert_eq!(block_on(store.get(ACCESS_TOKEN_KEY)).unwrap(), None);
}

#[test]
fn one_confirmation_at_a_time() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::entities::{VehicleClass, WorkflowStep};
    use crate::history::StaticHistoryFeed;
    use crate::navigation::RecordingNavigator;
    use crate::session::{MemorySessionStore, SessionBackend, SessionStore};

    #[derive(Default)]
    struct SlowStore {
        inner: MemorySessionStore,
        removals: AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for SlowStore {
        async fn get(&self, key: &str) -> Result<Option<String>, Error> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, token: String) -> Result<(), Error> {
            self.inner.put(key, token).await
        }

        async fn remove(&self, key: &str) -> Result<(), Error> {
            self.removals.fetch_add(1, Ordering::SeqCst);

            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(5)).await;

            self.inner.remove(key).await
        }
    }

    struct SlowBackend(Arc<SlowStore>);

    #[async_trait]
    impl SessionBackend for SlowBackend {
        async fn open(&self, _: Uuid) -> Result<Arc<dyn SessionStore>, Error> {
            Ok(self.0.clone())
        }
    }

    let store = Arc::new(SlowStore::default());
    let navigator = Arc::new(RecordingNavigator::new());
    let engine = Arc::new(
        Engine::new(
            Arc::new(SlowBackend(store.clone())),
            navigator.clone(),
            Arc::new(StaticHistoryFeed::default()),
        )
        .unwrap(),
    );
    let rider = User::new_rider(Uuid::new_v4());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let id = engine
            .create_workflow(rider.clone(), "+15550100".into(), "token".into())
            .await
            .unwrap()
            .workflow
            .id;

        for submission in traversal().into_iter().take(3) {
            engine.submit(rider.clone(), id, submission).await.unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let rider = rider.clone();
                let submission = Submission::FareReview {
                    distance: "10".into(),
                    vehicle_class: VehicleClass::Economy,
                };

                tokio::spawn(async move { engine.submit(rider, id, submission).await })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let bookings = results
            .iter()
            .filter(|result| matches!(result, Ok(view) if view.booking.is_some()))
            .count();
        assert_eq!(bookings, 1);
        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);

        assert_eq!(store.removals.load(Ordering::SeqCst), 1);

        let confirmations = navigator
            .steps_for(id)
            .into_iter()
            .filter(|step| *step == WorkflowStep::Confirmed)
            .count();
        assert_eq!(confirmations, 1);
    });
}

#[test]
fn workflows_progress_independently() {
    use std::sync::Arc;

    use super::test_engine;
    use crate::entities::WorkflowStep;
    use tokio_test::block_on;

    let (engine, _, _) = test_engine();
    let engine = Arc::new(engine);

    block_on(async {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let engine = engine.clone();

                tokio::spawn(async move {
                    let rider = User::new_rider(Uuid::new_v4());
                    let id = engine
                        .create_workflow(rider.clone(), "+15550100".into(), "token".into())
                        .await?
                        .workflow
                        .id;

                    let mut last = None;
                    for submission in traversal() {
                        last = Some(engine.submit(rider.clone(), id, submission).await?);
                    }

                    Ok::<_, Error>(last)
                })
            })
            .collect();

        for joined in futures::future::join_all(handles).await {
            let view = joined.unwrap().unwrap().unwrap();
            assert_eq!(view.workflow.step(), WorkflowStep::Confirmed);
            assert_eq!(view.booking.unwrap().fare_estimate, 100.0);
        }
    });
}

#[test]
fn spans_leave_out_rider_details() {
    use std::sync::{Arc, Mutex};

    use super::test_engine;
    use tokio_test::block_on;
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Clone, Default)]
    struct FieldNames(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for FieldNames {
        fn on_new_span(&self, attrs: &Attributes<'_>, _: &Id, _: Context<'_, S>) {
            let mut names = self.0.lock().unwrap();
            names.extend(
                attrs
                    .metadata()
                    .fields()
                    .iter()
                    .map(|field| field.name().to_string()),
            );
        }
    }

    let names = FieldNames::default();
    let subscriber = tracing_subscriber::registry().with(names.clone());

    tracing::subscriber::with_default(subscriber, || {
        let (engine, _, _) = test_engine();
        let rider = User::new_rider(Uuid::new_v4());

        let id = block_on(engine.create_workflow(rider.clone(), "+15550100".into(), "token".into()))
            .unwrap()
            .workflow
            .id;

        for submission in traversal() {
            block_on(engine.submit(rider.clone(), id, submission)).unwrap();
        }
    });

    let names = names.0.lock().unwrap();

    assert!(names.iter().any(|name| name == "submitted"));
    for hidden in ["submission", "phone_number", "access_token", "otp", "email"] {
        assert!(!names.iter().any(|name| name == hidden), "{}", hidden);
    }
}
