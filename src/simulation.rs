use async_channel::{Receiver, Sender};
use rand::Rng;
use rand_distr::{Binomial, Distribution, Normal, Uniform};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::WorkflowAPI;
use crate::auth::User;
use crate::engine::Engine;
use crate::entities::{Submission, VehicleClass, WorkflowStep};
use crate::error::Error;

const PLACES: [&str; 10] = [
    "Central Station",
    "Airport Terminal 1",
    "City Hall",
    "Harbour Front",
    "University Campus",
    "General Hospital",
    "Old Town Square",
    "Stadium",
    "Tech Park",
    "Riverside Mall",
];

// a rider gives up after this many rejected submissions in a row
const MAX_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub riders: usize,
    pub confirmed: usize,
    pub abandoned: usize,
    pub rejected_submissions: usize,
    pub errors: usize,
    pub total_fare: f64,
}

fn sample_binomial(n: u64, p: f64) -> u64 {
    match Binomial::new(n, p) {
        Ok(bin) => bin.sample(&mut rand::thread_rng()),
        Err(_) => 0,
    }
}

fn sample_place() -> &'static str {
    let die = Uniform::from(0..PLACES.len());
    PLACES[die.sample(&mut rand::thread_rng())]
}

fn sample_vehicle_class() -> VehicleClass {
    let die = Uniform::from(0..VehicleClass::ALL.len());
    VehicleClass::ALL[die.sample(&mut rand::thread_rng())]
}

// mostly plausible, sometimes negative
fn sample_distance() -> String {
    match Normal::new(12.0, 8.0) {
        Ok(normal) => format!("{:.1}", normal.sample(&mut rand::thread_rng())),
        Err(_) => "12.0".into(),
    }
}

/// The form a rider fills in at `step`; with probability `sloppiness` it breaks
/// one rule of that step.
fn sample_submission(step: WorkflowStep, sloppiness: f64) -> Option<Submission> {
    let sloppy = sample_binomial(1, sloppiness) > 0;

    let submission = match step {
        WorkflowStep::Registration => Submission::Registration {
            name: if sloppy { " ".into() } else { "Ada".into() },
            email: "ada@example.com".into(),
        },
        WorkflowStep::PhoneVerification => Submission::PhoneVerification {
            otp: if sloppy {
                "12".into()
            } else {
                format!("{:04}", rand::thread_rng().gen_range(0..10_000))
            },
        },
        WorkflowStep::RideDetails => {
            let pickup = sample_place();
            let dropoff = if sloppy { pickup } else { sample_place() };

            Submission::RideDetails {
                pickup: pickup.into(),
                dropoff: dropoff.into(),
            }
        }
        WorkflowStep::FareReview => Submission::FareReview {
            distance: if sloppy { "far".into() } else { sample_distance() },
            vehicle_class: sample_vehicle_class(),
        },
        WorkflowStep::Confirmed => return None,
    };

    Some(submission)
}

struct Simulation {
    e: Engine,
    report: Mutex<Report>,
}

impl Simulation {
    #[tracing::instrument(skip(self))]
    async fn add_rider(&self) {
        let user = User::new_rider(Uuid::new_v4());

        let outcome = self.ride(user).await;

        let mut report = self.report.lock().await;
        report.riders += 1;

        match outcome {
            Ok(Some(fare)) => {
                report.confirmed += 1;
                report.total_fare += fare;
            }
            Ok(None) => report.abandoned += 1,
            Err(err) => {
                tracing::warn!("rider failed: {}", err);
                report.errors += 1;
            }
        }
    }

    /// Fare of the confirmed ride, or `None` when the rider gave up.
    async fn ride(&self, user: User) -> Result<Option<f64>, Error> {
        let phone_number = format!("+1555{:07}", rand::thread_rng().gen_range(0..10_000_000));
        let access_token = Uuid::new_v4().simple().to_string();

        let mut view = self
            .e
            .create_workflow(user.clone(), phone_number, access_token)
            .await?;

        tracing::info!("created workflow {}", view.workflow.id);

        let mut attempts = 0;

        while let Some(submission) = sample_submission(view.workflow.step(), 0.1) {
            match self.e.submit(user.clone(), view.workflow.id, submission).await {
                Ok(next) => {
                    view = next;
                    attempts = 0;
                }
                Err(err) if err.validation_failure().is_some() => {
                    tracing::info!("submission rejected: {}", err.message);

                    self.report.lock().await.rejected_submissions += 1;

                    attempts += 1;
                    if attempts >= MAX_ATTEMPTS {
                        return Ok(None);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Ok(view.booking.map(|booking| booking.fare_estimate))
    }
}

pub struct Executor {
    s: Arc<Simulation>,
}

impl Executor {
    #[tracing::instrument(name = "Executor::new", skip_all)]
    pub fn new(e: Engine) -> Self {
        Self {
            s: Arc::new(Simulation {
                e,
                report: Mutex::new(Report::default()),
            }),
        }
    }

    /// Pushes `riders` riders through the workflow on `workers` concurrent tasks.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, riders: usize, workers: usize) -> Report {
        let (tx, rx): (Sender<()>, Receiver<()>) = async_channel::unbounded();

        let mut handles = vec![];
        for _ in 0..workers.max(1) {
            let rx = rx.clone();
            let s = self.s.clone();

            let handle = tokio::spawn(async move {
                while rx.recv().await.is_ok() {
                    s.add_rider().await;
                }
            });

            handles.push(handle);
        }

        handles.push(tokio::spawn(async move {
            for _ in 0..riders {
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        }));

        for result in futures::future::join_all(handles).await {
            if let Err(err) = result {
                tracing::warn!("simulation task failed: {:?}", err);
            }
        }

        let report = self.s.report.lock().await.clone();

        tracing::info!(
            "simulation finished: {} riders, {} confirmed, {} abandoned, {} rejected submissions, {} errors",
            report.riders,
            report.confirmed,
            report.abandoned,
            report.rejected_submissions,
            report.errors
        );

        report
    }
}

#[test]
fn sampled_submissions_match_their_step() {
    for step in [
        WorkflowStep::Registration,
        WorkflowStep::PhoneVerification,
        WorkflowStep::RideDetails,
        WorkflowStep::FareReview,
    ] {
        for sloppiness in [0.0, 1.0] {
            let submission = sample_submission(step, sloppiness).unwrap();
            assert_eq!(submission.step(), step);
        }
    }

    assert_eq!(sample_submission(WorkflowStep::Confirmed, 0.0), None);
}

#[test]
fn sloppy_submissions_are_rejected() {
    use crate::entities::Workflow;

    let mut workflow = Workflow::new(Uuid::new_v4(), "+15550100".into());

    for _ in 0..4 {
        let step = workflow.step();

        let sloppy = sample_submission(step, 1.0).unwrap();
        assert!(workflow.clone().submit(sloppy).is_err(), "{:?}", step);

        // careful riders can still be rejected for a negative sampled distance
        loop {
            let careful = sample_submission(step, 0.0).unwrap();
            if workflow.submit(careful).is_ok() {
                break;
            }
        }
    }

    assert_eq!(workflow.step(), WorkflowStep::Confirmed);
}

#[test]
fn simulation_accounts_for_every_rider() {
    use crate::engine::test_engine;
    use tokio_test::block_on;

    let (engine, _, navigator) = test_engine();
    let executor = Executor::new(engine);

    let report = block_on(executor.run(40, 4));

    assert_eq!(report.riders, 40);
    assert_eq!(report.errors, 0);
    assert_eq!(report.confirmed + report.abandoned, 40);
    assert!(report.total_fare >= 0.0);

    let confirmed = navigator
        .visits()
        .into_iter()
        .filter(|(_, step)| *step == WorkflowStep::Confirmed)
        .count();
    assert_eq!(confirmed, report.confirmed);
}
