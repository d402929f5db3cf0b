use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::{Booking, RideHistoryRecord, Submission, Workflow};
use crate::error::Error;
use crate::fare::FareEstimate;

/// A workflow as returned to the caller; `booking` is only set by the
/// submission that confirms it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowView {
    #[serde(flatten)]
    pub workflow: Workflow,
    pub booking: Option<Booking>,
}

#[async_trait]
pub trait WorkflowAPI {
    async fn create_workflow(
        &self,
        user: User,
        phone_number: String,
        access_token: String,
    ) -> Result<WorkflowView, Error>;

    async fn find_workflow(&self, user: User, id: Uuid) -> Result<WorkflowView, Error>;

    async fn submit(
        &self,
        user: User,
        id: Uuid,
        submission: Submission,
    ) -> Result<WorkflowView, Error>;
}

#[async_trait]
pub trait FareAPI {
    async fn estimate_fare(
        &self,
        user: User,
        distance: String,
        vehicle_class: String,
    ) -> Result<FareEstimate, Error>;
}

#[async_trait]
pub trait HistoryAPI {
    async fn list_history(&self, user: User) -> Result<Vec<RideHistoryRecord>, Error>;
}

pub trait API: WorkflowAPI + FareAPI + HistoryAPI {}
