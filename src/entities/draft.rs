use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::VehicleClass;

/// Input accumulated while one rider moves through the workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RideRequestDraft {
    pub rider_name: String,
    pub phone_number: String,
    pub email: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub distance_km: f64,
    pub vehicle_class: VehicleClass,
    pub otp_code: String,
    pub fare_estimate: Option<f64>,
}

impl RideRequestDraft {
    pub fn new(phone_number: String) -> Self {
        Self {
            rider_name: String::new(),
            phone_number,
            email: String::new(),
            pickup_location: String::new(),
            dropoff_location: String::new(),
            distance_km: 0.0,
            vehicle_class: VehicleClass::default(),
            otp_code: String::new(),
            fare_estimate: None,
        }
    }
}

/// What is left of a draft once the rider confirms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub rider_name: String,
    pub phone_number: String,
    pub email: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub distance_km: f64,
    pub vehicle_class: VehicleClass,
    pub fare_estimate: f64,
    pub confirmed_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(draft: RideRequestDraft, fare_estimate: f64) -> Self {
        Self {
            rider_name: draft.rider_name,
            phone_number: draft.phone_number,
            email: draft.email,
            pickup_location: draft.pickup_location,
            dropoff_location: draft.dropoff_location,
            distance_km: draft.distance_km,
            vehicle_class: draft.vehicle_class,
            fare_estimate,
            confirmed_at: Utc::now(),
        }
    }
}
