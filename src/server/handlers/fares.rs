use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::User;
use crate::error::Error;
use crate::fare::FareEstimate;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct EstimateParams {
    distance: String,
    #[serde(default = "default_vehicle_class")]
    vehicle_class: String,
}

fn default_vehicle_class() -> String {
    "Economy".into()
}

pub async fn estimate(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<EstimateParams>,
) -> Result<Json<FareEstimate>, Error> {
    let estimate = api
        .estimate_fare(user, params.distance, params.vehicle_class)
        .await?;

    Ok(estimate.into())
}
