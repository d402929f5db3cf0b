use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entities::VehicleClass;
use crate::error::{invalid_input_error, Error};

/// Driver rating between one and five stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: Rating = Rating(5);

    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=5 => Ok(Rating(value)),
            _ => Err(invalid_input_error()),
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A past ride as shown in the history list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideHistoryRecord {
    pub id: String,
    pub driver_name: String,
    pub driver_image: String,
    pub rating: Rating,
    pub charge: f64,
    pub created_at: NaiveDate,
    pub distance: String,
    pub pickup_name: String,
    pub dropoff_name: String,
    pub vehicle_class: VehicleClass,
}

#[test]
fn rating_bounds() {
    assert!(Rating::try_from(0).is_err());
    assert!(Rating::try_from(6).is_err());
    assert_eq!(Rating::try_from(3).unwrap().stars(), 3);
    assert_eq!(Rating::MAX.stars(), 5);
}

#[test]
fn record_wire_format() {
    let record: RideHistoryRecord = serde_json::from_value(serde_json::json!({
        "id": "65a1f0c2e4b0a1b2c3d4e5f6",
        "driverName": "John Doe",
        "driverImage": "https://example.com/path/to/johns_image.jpg",
        "rating": 5,
        "charge": 100.0,
        "createdAt": "2025-01-30",
        "distance": "10 km",
        "pickupName": "Location A",
        "dropoffName": "Location B",
        "vehicleClass": "Economy",
    }))
    .unwrap();

    assert_eq!(record.rating, Rating::MAX);
    assert_eq!(record.created_at, NaiveDate::from_ymd_opt(2025, 1, 30).unwrap());

    let out_of_range = serde_json::from_value::<RideHistoryRecord>(serde_json::json!({
        "id": "65a1f0c2e4b0a1b2c3d4e5f6",
        "driverName": "John Doe",
        "driverImage": "",
        "rating": 9,
        "charge": 100.0,
        "createdAt": "2025-01-30",
        "distance": "10 km",
        "pickupName": "Location A",
        "dropoffName": "Location B",
        "vehicleClass": "Economy",
    }));

    assert!(out_of_range.is_err());
}
