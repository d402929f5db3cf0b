use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Booking, RideRequestDraft, VehicleClass};
use crate::error::{invalid_invocation_error, Error};
use crate::fare::{compute_fare, ComputationFailure};
use crate::validation::{
    validate_distance, validate_email, validate_otp, validate_registration,
    validate_ride_details, ValidationFailure,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Registration,
    PhoneVerification,
    RideDetails,
    FareReview,
    Confirmed,
}

impl WorkflowStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::PhoneVerification => "phone_verification",
            Self::RideDetails => "ride_details",
            Self::FareReview => "fare_review",
            Self::Confirmed => "confirmed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// A rider's answer to the form of one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Submission {
    Registration {
        name: String,
        email: String,
    },
    PhoneVerification {
        otp: String,
    },
    RideDetails {
        pickup: String,
        dropoff: String,
    },
    FareReview {
        distance: String,
        #[serde(default)]
        vehicle_class: VehicleClass,
    },
}

impl Submission {
    pub fn step(&self) -> WorkflowStep {
        match self {
            Self::Registration { .. } => WorkflowStep::Registration,
            Self::PhoneVerification { .. } => WorkflowStep::PhoneVerification,
            Self::RideDetails { .. } => WorkflowStep::RideDetails,
            Self::FareReview { .. } => WorkflowStep::FareReview,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    Invalid(ValidationFailure),
    Fault(ComputationFailure),
    OutOfStep {
        current: WorkflowStep,
        submitted: WorkflowStep,
    },
}

impl From<ValidationFailure> for Rejection {
    fn from(failure: ValidationFailure) -> Self {
        Self::Invalid(failure)
    }
}

impl From<ComputationFailure> for Rejection {
    fn from(failure: ComputationFailure) -> Self {
        Self::Fault(failure)
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Invalid(failure) => failure.into(),
            Rejection::Fault(failure) => failure.into(),
            Rejection::OutOfStep { .. } => invalid_invocation_error(),
        }
    }
}

/// Result of a transition that has not been applied yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub workflow: Workflow,
    pub booking: Option<Booking>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub rider_id: Uuid,
    step: WorkflowStep,
    draft: Option<RideRequestDraft>,
    created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(rider_id: Uuid, phone_number: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            rider_id,
            step: WorkflowStep::Registration,
            draft: Some(RideRequestDraft::new(phone_number)),
            created_at: Utc::now(),
        }
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    /// `None` once the workflow is confirmed.
    pub fn draft(&self) -> Option<&RideRequestDraft> {
        self.draft.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Computes the state that `submission` leads to without touching `self`.
    #[tracing::instrument(
        skip(self, submission),
        fields(workflow_id = %self.id, step = self.step.name(), submitted = submission.step().name())
    )]
    pub fn advance(&self, submission: Submission) -> Result<Transition, Rejection> {
        let out_of_step = Rejection::OutOfStep {
            current: self.step,
            submitted: submission.step(),
        };

        let mut draft = match (&self.draft, self.step == submission.step()) {
            (Some(draft), true) => draft.clone(),
            _ => return Err(out_of_step),
        };

        let mut booking = None;

        let step = match submission {
            Submission::Registration { name, email } => {
                validate_registration(&name)?;
                validate_email(&email)?;

                draft.rider_name = name.trim().into();
                draft.email = email.trim().into();

                WorkflowStep::PhoneVerification
            }
            Submission::PhoneVerification { otp } => {
                validate_otp(&otp)?;

                draft.otp_code = otp;

                WorkflowStep::RideDetails
            }
            Submission::RideDetails { pickup, dropoff } => {
                validate_ride_details(&pickup, &dropoff)?;

                draft.pickup_location = pickup.trim().into();
                draft.dropoff_location = dropoff.trim().into();

                WorkflowStep::FareReview
            }
            Submission::FareReview {
                distance,
                vehicle_class,
            } => {
                let distance_km = validate_distance(&distance)?;
                let fare = compute_fare(distance_km, vehicle_class)?;

                draft.distance_km = distance_km;
                draft.vehicle_class = vehicle_class;
                draft.fare_estimate = Some(fare);

                booking = Some(Booking::new(draft.clone(), fare));

                WorkflowStep::Confirmed
            }
        };

        let draft = match step {
            WorkflowStep::Confirmed => None,
            _ => Some(draft),
        };

        tracing::info!("workflow advances to {}", step.name());

        Ok(Transition {
            workflow: Workflow {
                step,
                draft,
                ..self.clone()
            },
            booking,
        })
    }

    /// Applies a submission in place; on rejection nothing changes.
    pub fn submit(&mut self, submission: Submission) -> Result<Option<Booking>, Rejection> {
        let Transition { workflow, booking } = self.advance(submission)?;
        *self = workflow;

        Ok(booking)
    }
}

impl PolarClass for Workflow {
    fn get_polar_class_builder() -> oso::ClassBuilder<Workflow> {
        oso::Class::builder()
            .name("Workflow")
            .add_attribute_getter("rider_id", |recv: &Workflow| recv.rider_id.to_string())
            .add_attribute_getter("step", |recv: &Workflow| recv.step.name().to_string())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Workflow::get_polar_class_builder();
        builder.build()
    }
}

#[cfg(test)]
fn registration() -> Submission {
    Submission::Registration {
        name: "Ada".into(),
        email: "ada@example.com".into(),
    }
}

#[cfg(test)]
fn workflow_at(step: WorkflowStep) -> Workflow {
    let mut workflow = Workflow::new(Uuid::new_v4(), "+15550100".into());

    let submissions = [
        registration(),
        Submission::PhoneVerification { otp: "1234".into() },
        Submission::RideDetails {
            pickup: "A".into(),
            dropoff: "B".into(),
        },
        Submission::FareReview {
            distance: "10".into(),
            vehicle_class: VehicleClass::Economy,
        },
    ];

    for submission in submissions {
        if workflow.step() == step {
            break;
        }
        workflow.submit(submission).unwrap();
    }

    workflow
}

#[test]
fn new_workflow_starts_at_registration() {
    let workflow = Workflow::new(Uuid::new_v4(), "+15550100".into());

    assert_eq!(workflow.step(), WorkflowStep::Registration);

    let draft = workflow.draft().unwrap();
    assert_eq!(draft, &RideRequestDraft::new("+15550100".into()));
    assert_eq!(draft.fare_estimate, None);
}

#[test]
fn full_traversal() {
    let mut workflow = Workflow::new(Uuid::new_v4(), "+15550100".into());

    assert_eq!(workflow.submit(registration()), Ok(None));
    assert_eq!(workflow.step(), WorkflowStep::PhoneVerification);
    assert_eq!(workflow.draft().unwrap().rider_name, "Ada");
    assert_eq!(workflow.draft().unwrap().email, "ada@example.com");

    workflow
        .submit(Submission::PhoneVerification { otp: "1234".into() })
        .unwrap();
    assert_eq!(workflow.step(), WorkflowStep::RideDetails);
    assert_eq!(workflow.draft().unwrap().otp_code, "1234");

    workflow
        .submit(Submission::RideDetails {
            pickup: "A".into(),
            dropoff: "B".into(),
        })
        .unwrap();
    assert_eq!(workflow.step(), WorkflowStep::FareReview);
    assert_eq!(workflow.draft().unwrap().pickup_location, "A");
    assert_eq!(workflow.draft().unwrap().dropoff_location, "B");

    let booking = workflow
        .submit(Submission::FareReview {
            distance: "10".into(),
            vehicle_class: VehicleClass::Economy,
        })
        .unwrap()
        .unwrap();

    assert_eq!(workflow.step(), WorkflowStep::Confirmed);
    assert!(workflow.draft().is_none());

    assert_eq!(booking.fare_estimate, 100.0);
    assert_eq!(booking.rider_name, "Ada");
    assert_eq!(booking.phone_number, "+15550100");
    assert_eq!(booking.distance_km, 10.0);
}

#[test]
fn same_location_keeps_ride_details() {
    let mut workflow = workflow_at(WorkflowStep::RideDetails);
    let before = workflow.clone();

    let result = workflow.submit(Submission::RideDetails {
        pickup: "A".into(),
        dropoff: "A".into(),
    });

    assert_eq!(result, Err(Rejection::Invalid(ValidationFailure::SameLocation)));
    assert_eq!(workflow, before);
    assert_eq!(workflow.step(), WorkflowStep::RideDetails);
}

#[test]
fn negative_distance_leaves_fare_absent() {
    let mut workflow = workflow_at(WorkflowStep::FareReview);

    let result = workflow.submit(Submission::FareReview {
        distance: "-5".into(),
        vehicle_class: VehicleClass::Luxury,
    });

    assert_eq!(result, Err(Rejection::Invalid(ValidationFailure::Negative)));
    assert_eq!(workflow.step(), WorkflowStep::FareReview);
    assert_eq!(workflow.draft().unwrap().fare_estimate, None);
    assert_eq!(workflow.draft().unwrap().vehicle_class, VehicleClass::Economy);
}

#[test]
fn rejected_submissions_change_nothing() {
    let rejected = [
        (
            WorkflowStep::Registration,
            Submission::Registration {
                name: " ".into(),
                email: "ada@example.com".into(),
            },
        ),
        (
            WorkflowStep::Registration,
            Submission::Registration {
                name: "Ada".into(),
                email: "ada-at-example".into(),
            },
        ),
        (
            WorkflowStep::PhoneVerification,
            Submission::PhoneVerification { otp: "12".into() },
        ),
        (
            WorkflowStep::RideDetails,
            Submission::RideDetails {
                pickup: "".into(),
                dropoff: "B".into(),
            },
        ),
        (
            WorkflowStep::FareReview,
            Submission::FareReview {
                distance: "far".into(),
                vehicle_class: VehicleClass::Suv,
            },
        ),
    ];

    for (step, submission) in rejected {
        let mut workflow = workflow_at(step);
        let before = workflow.clone();

        for _ in 0..3 {
            assert!(workflow.submit(submission.clone()).is_err());
            assert_eq!(workflow, before);
        }
    }
}

#[test]
fn registration_requires_both_fields() {
    let mut workflow = workflow_at(WorkflowStep::Registration);

    let result = workflow.submit(Submission::Registration {
        name: "Ada".into(),
        email: "".into(),
    });

    assert_eq!(result, Err(Rejection::Invalid(ValidationFailure::EmptyEmail)));
    assert_eq!(workflow.draft().unwrap().rider_name, "");
}

#[test]
fn out_of_step_submissions_are_rejected() {
    let mut workflow = workflow_at(WorkflowStep::Registration);
    let before = workflow.clone();

    let result = workflow.submit(Submission::PhoneVerification { otp: "1234".into() });

    assert_eq!(
        result,
        Err(Rejection::OutOfStep {
            current: WorkflowStep::Registration,
            submitted: WorkflowStep::PhoneVerification,
        })
    );
    assert_eq!(workflow, before);
}

#[test]
fn confirmed_is_terminal() {
    let mut workflow = workflow_at(WorkflowStep::Confirmed);
    assert!(workflow.step().is_terminal());

    let before = workflow.clone();

    for submission in [
        registration(),
        Submission::FareReview {
            distance: "10".into(),
            vehicle_class: VehicleClass::Economy,
        },
    ] {
        assert!(matches!(
            workflow.submit(submission),
            Err(Rejection::OutOfStep {
                current: WorkflowStep::Confirmed,
                ..
            })
        ));
        assert_eq!(workflow, before);
    }
}

#[test]
fn steps_only_move_forward() {
    let mut workflow = workflow_at(WorkflowStep::Registration);
    let mut previous = workflow.step();

    for submission in [
        registration(),
        Submission::PhoneVerification { otp: "4321".into() },
        Submission::RideDetails {
            pickup: "Home".into(),
            dropoff: "Work".into(),
        },
        Submission::FareReview {
            distance: "3".into(),
            vehicle_class: VehicleClass::Suv,
        },
    ] {
        workflow.submit(submission).unwrap();
        assert!(workflow.step() > previous);
        previous = workflow.step();
    }
}

#[test]
fn submission_wire_format() {
    let submission: Submission = serde_json::from_value(serde_json::json!({
        "step": "fare_review",
        "distance": "12.5",
    }))
    .unwrap();

    assert_eq!(
        submission,
        Submission::FareReview {
            distance: "12.5".into(),
            vehicle_class: VehicleClass::Economy,
        }
    );

    let submission: Submission = serde_json::from_value(serde_json::json!({
        "step": "ride_details",
        "pickup": "A",
        "dropoff": "B",
    }))
    .unwrap();

    assert_eq!(submission.step(), WorkflowStep::RideDetails);
}
