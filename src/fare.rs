use serde::{Deserialize, Serialize};

use crate::entities::VehicleClass;
use crate::error::Error;
use crate::validation::{validate_distance, ValidationFailure};

pub const ECONOMY_RATE: f64 = 10.0;
pub const LUXURY_RATE: f64 = 20.0;
pub const SUV_RATE: f64 = 15.0;

#[derive(Clone, Debug, PartialEq)]
pub enum ComputationFailure {
    InvalidVehicleClass(String),
    InvalidDistance,
}

impl ComputationFailure {
    pub fn message(&self) -> String {
        match self {
            Self::InvalidVehicleClass(name) => format!(
                "Unsupported car type '{}'. Please choose Economy, Luxury, or SUV.",
                name
            ),
            Self::InvalidDistance => "Distance must be a valid non-negative number.".into(),
        }
    }
}

/// Rate per kilometre, in currency units.
pub fn rate(vehicle_class: VehicleClass) -> f64 {
    match vehicle_class {
        VehicleClass::Economy => ECONOMY_RATE,
        VehicleClass::Luxury => LUXURY_RATE,
        VehicleClass::Suv => SUV_RATE,
    }
}

pub fn compute_fare(distance_km: f64, vehicle_class: VehicleClass) -> Result<f64, ComputationFailure> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(ComputationFailure::InvalidDistance);
    }

    Ok(distance_km * rate(vehicle_class))
}

pub fn format_fare(fare: f64) -> String {
    format!("{:.2}", fare)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FareEstimate {
    pub distance_km: f64,
    pub vehicle_class: VehicleClass,
    pub fare: f64,
    pub display: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EstimateError {
    Invalid(ValidationFailure),
    Fault(ComputationFailure),
}

impl From<ValidationFailure> for EstimateError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Invalid(failure)
    }
}

impl From<ComputationFailure> for EstimateError {
    fn from(failure: ComputationFailure) -> Self {
        Self::Fault(failure)
    }
}

impl From<EstimateError> for Error {
    fn from(err: EstimateError) -> Self {
        match err {
            EstimateError::Invalid(failure) => failure.into(),
            // an unknown class name here was typed by the rider
            EstimateError::Fault(failure @ ComputationFailure::InvalidVehicleClass(_)) => Error {
                code: 101,
                message: failure.message(),
            },
            EstimateError::Fault(failure) => failure.into(),
        }
    }
}

/// Standalone calculator over raw form input.
pub fn estimate_fare(raw_distance: &str, raw_vehicle_class: &str) -> Result<FareEstimate, EstimateError> {
    let distance_km = validate_distance(raw_distance)?;
    let vehicle_class: VehicleClass = raw_vehicle_class.parse()?;
    let fare = compute_fare(distance_km, vehicle_class)?;

    Ok(FareEstimate {
        distance_km,
        vehicle_class,
        fare,
        display: format_fare(fare),
    })
}

#[test]
fn fare_per_vehicle_class() {
    assert_eq!(compute_fare(10.0, VehicleClass::Economy), Ok(100.0));
    assert_eq!(compute_fare(10.0, VehicleClass::Luxury), Ok(200.0));
    assert_eq!(compute_fare(10.0, VehicleClass::Suv), Ok(150.0));
    assert_eq!(compute_fare(0.0, VehicleClass::Suv), Ok(0.0));
}

#[test]
fn fare_rejects_bad_distance() {
    for class in VehicleClass::ALL {
        for distance in [-0.5, -5.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(
                compute_fare(distance, class),
                Err(ComputationFailure::InvalidDistance)
            );
        }
    }
}

#[test]
fn fare_display_has_two_decimals() {
    assert_eq!(format_fare(100.0), "100.00");
    assert_eq!(format_fare(37.5), "37.50");
    assert_eq!(format_fare(1.0 / 3.0), "0.33");
}

#[test]
fn estimate_from_form_input() {
    let estimate = estimate_fare("2.5", "suv").unwrap();

    assert_eq!(estimate.vehicle_class, VehicleClass::Suv);
    assert_eq!(estimate.fare, 37.5);
    assert_eq!(estimate.display, "37.50");

    assert_eq!(
        estimate_fare("-1", "Economy"),
        Err(EstimateError::Invalid(ValidationFailure::Negative))
    );
    assert_eq!(
        estimate_fare("abc", "Economy"),
        Err(EstimateError::Invalid(ValidationFailure::NotANumber))
    );
    assert_eq!(
        estimate_fare("3", "Helicopter"),
        Err(EstimateError::Fault(ComputationFailure::InvalidVehicleClass(
            "Helicopter".into()
        )))
    );
}

#[test]
fn estimate_errors_for_callers() {
    let err: Error = estimate_fare("3", "Van").unwrap_err().into();
    assert!(err.is_invalid_input_error());
    assert!(err.message.contains("'Van'"));

    let err: Error = estimate_fare("-3", "SUV").unwrap_err().into();
    assert_eq!(err.validation_failure(), Some(ValidationFailure::Negative));
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn vehicle_class() -> impl Strategy<Value = VehicleClass> {
        prop_oneof![
            Just(VehicleClass::Economy),
            Just(VehicleClass::Luxury),
            Just(VehicleClass::Suv),
        ]
    }

    proptest! {
        #[test]
        fn fare_is_linear_in_distance(
            distance in prop_oneof![Just(0.0f64), 1.0e-6f64..1.0e9],
            class in vehicle_class()
        ) {
            let single = compute_fare(distance, class).unwrap();
            let double = compute_fare(2.0 * distance, class).unwrap();

            prop_assert_eq!(double, 2.0 * single);
            prop_assert_eq!(compute_fare(distance, class).unwrap(), single);
        }

        #[test]
        fn negative_distance_is_rejected(distance in f64::MIN..-f64::MIN_POSITIVE, class in vehicle_class()) {
            prop_assert_eq!(compute_fare(distance, class), Err(ComputationFailure::InvalidDistance));
        }
    }
}
