use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fare::ComputationFailure;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    #[default]
    Economy,
    Luxury,
    #[serde(rename = "SUV")]
    Suv,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [Self::Economy, Self::Luxury, Self::Suv];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Economy => "Economy",
            Self::Luxury => "Luxury",
            Self::Suv => "SUV",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VehicleClass {
    type Err = ComputationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();

        Self::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ComputationFailure::InvalidVehicleClass(name.into()))
    }
}

#[test]
fn parse_vehicle_class() {
    assert_eq!("Economy".parse::<VehicleClass>(), Ok(VehicleClass::Economy));
    assert_eq!(" luxury ".parse::<VehicleClass>(), Ok(VehicleClass::Luxury));
    assert_eq!("suv".parse::<VehicleClass>(), Ok(VehicleClass::Suv));

    assert_eq!(
        "Van".parse::<VehicleClass>(),
        Err(ComputationFailure::InvalidVehicleClass("Van".into()))
    );
}

#[test]
fn vehicle_class_wire_names() {
    assert_eq!(serde_json::to_string(&VehicleClass::Suv).unwrap(), "\"SUV\"");
    assert_eq!(
        serde_json::from_str::<VehicleClass>("\"Luxury\"").unwrap(),
        VehicleClass::Luxury
    );
    assert!(serde_json::from_str::<VehicleClass>("\"Van\"").is_err());
}
