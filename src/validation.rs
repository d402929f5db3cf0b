use serde::{Deserialize, Serialize};

pub const OTP_LENGTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    EmptyName,
    EmptyEmail,
    MalformedEmail,
    EmptyOtp,
    WrongLength,
    EmptyPickup,
    EmptyDropoff,
    SameLocation,
    NotANumber,
    Negative,
}

impl ValidationFailure {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::EmptyEmail => "empty_email",
            Self::MalformedEmail => "malformed_email",
            Self::EmptyOtp => "empty_otp",
            Self::WrongLength => "wrong_length",
            Self::EmptyPickup => "empty_pickup",
            Self::EmptyDropoff => "empty_dropoff",
            Self::SameLocation => "same_location",
            Self::NotANumber => "not_a_number",
            Self::Negative => "negative",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::EmptyName => "Name cannot be empty.",
            Self::EmptyEmail => "Please enter your email!",
            Self::MalformedEmail => "Please enter a valid email!",
            Self::EmptyOtp => "Please fill the fields!",
            Self::WrongLength => "The verification code must be exactly 4 digits.",
            Self::EmptyPickup => "Pickup location cannot be empty.",
            Self::EmptyDropoff => "Drop-off location cannot be empty.",
            Self::SameLocation => "Pickup and drop-off locations must be different.",
            Self::NotANumber | Self::Negative => "Distance must be a valid non-negative number.",
        }
    }

    /// Client error code in the 110..=119 band.
    pub fn code(&self) -> i32 {
        let offset = match self {
            Self::EmptyName => 0,
            Self::EmptyEmail => 1,
            Self::MalformedEmail => 2,
            Self::EmptyOtp => 3,
            Self::WrongLength => 4,
            Self::EmptyPickup => 5,
            Self::EmptyDropoff => 6,
            Self::SameLocation => 7,
            Self::NotANumber => 8,
            Self::Negative => 9,
        };

        110 + offset
    }

    pub const ALL: [ValidationFailure; 10] = [
        Self::EmptyName,
        Self::EmptyEmail,
        Self::MalformedEmail,
        Self::EmptyOtp,
        Self::WrongLength,
        Self::EmptyPickup,
        Self::EmptyDropoff,
        Self::SameLocation,
        Self::NotANumber,
        Self::Negative,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|failure| failure.code() == code)
    }
}

pub fn validate_registration(name: &str) -> Result<(), ValidationFailure> {
    if name.trim().is_empty() {
        return Err(ValidationFailure::EmptyName);
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationFailure> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationFailure::EmptyEmail);
    }

    if !validator::validate_email(email) || !has_top_level_domain(email) {
        return Err(ValidationFailure::MalformedEmail);
    }

    Ok(())
}

// the validator crate follows the HTML form rules, which accept dotless hosts
fn has_top_level_domain(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((_, domain)) => {
            let labels: Vec<&str> = domain.split('.').collect();
            labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
        }
        None => false,
    }
}

pub fn validate_otp(code: &str) -> Result<(), ValidationFailure> {
    if code.is_empty() {
        return Err(ValidationFailure::EmptyOtp);
    }

    if code.chars().count() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationFailure::WrongLength);
    }

    Ok(())
}

pub fn validate_ride_details(pickup: &str, dropoff: &str) -> Result<(), ValidationFailure> {
    let pickup = pickup.trim();
    let dropoff = dropoff.trim();

    if pickup.is_empty() {
        return Err(ValidationFailure::EmptyPickup);
    }

    if dropoff.is_empty() {
        return Err(ValidationFailure::EmptyDropoff);
    }

    if pickup == dropoff {
        return Err(ValidationFailure::SameLocation);
    }

    Ok(())
}

pub fn validate_distance(raw: &str) -> Result<f64, ValidationFailure> {
    let distance: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationFailure::NotANumber)?;

    if !distance.is_finite() {
        return Err(ValidationFailure::NotANumber);
    }

    if distance < 0.0 {
        return Err(ValidationFailure::Negative);
    }

    Ok(distance)
}

#[test]
fn registration_requires_a_name() {
    assert_eq!(validate_registration("Ada"), Ok(()));
    assert_eq!(validate_registration(""), Err(ValidationFailure::EmptyName));
    assert_eq!(validate_registration("   "), Err(ValidationFailure::EmptyName));
}

#[test]
fn email_shape() {
    assert_eq!(validate_email("ada@example.com"), Ok(()));
    assert_eq!(validate_email(" ada@mail.example.org "), Ok(()));

    assert_eq!(validate_email(""), Err(ValidationFailure::EmptyEmail));
    assert_eq!(validate_email("  "), Err(ValidationFailure::EmptyEmail));

    for malformed in [
        "ada",
        "ada@",
        "@example.com",
        "ada@example",
        "ada@example.",
        "ada@@example.com",
        "ada example@example.com",
    ] {
        assert_eq!(
            validate_email(malformed),
            Err(ValidationFailure::MalformedEmail),
            "{}",
            malformed
        );
    }
}

#[test]
fn otp_requires_four_digits() {
    assert_eq!(validate_otp("1234"), Ok(()));
    assert_eq!(validate_otp("0000"), Ok(()));

    assert_eq!(validate_otp(""), Err(ValidationFailure::EmptyOtp));

    for wrong in ["1", "123", "12345", "12a4", "abcd", " 123", "１２３４"] {
        assert_eq!(validate_otp(wrong), Err(ValidationFailure::WrongLength), "{}", wrong);
    }
}

#[test]
fn ride_details_checked_in_order() {
    assert_eq!(validate_ride_details("A", "B"), Ok(()));

    assert_eq!(validate_ride_details("", ""), Err(ValidationFailure::EmptyPickup));
    assert_eq!(validate_ride_details("A", " "), Err(ValidationFailure::EmptyDropoff));
    assert_eq!(validate_ride_details("A", "A"), Err(ValidationFailure::SameLocation));
    assert_eq!(validate_ride_details(" A", "A "), Err(ValidationFailure::SameLocation));
}

#[test]
fn distance_parsing() {
    assert_eq!(validate_distance("10"), Ok(10.0));
    assert_eq!(validate_distance(" 2.5 "), Ok(2.5));
    assert_eq!(validate_distance("0"), Ok(0.0));

    assert_eq!(validate_distance("-5"), Err(ValidationFailure::Negative));
    assert_eq!(validate_distance(""), Err(ValidationFailure::NotANumber));
    assert_eq!(validate_distance("ten"), Err(ValidationFailure::NotANumber));
    assert_eq!(validate_distance("NaN"), Err(ValidationFailure::NotANumber));
    assert_eq!(validate_distance("inf"), Err(ValidationFailure::NotANumber));
    assert_eq!(validate_distance("-inf"), Err(ValidationFailure::NotANumber));
}

#[test]
fn failure_codes_are_distinct() {
    use std::collections::HashSet;

    let all = ValidationFailure::ALL;

    let codes: HashSet<i32> = all.iter().map(|f| f.code()).collect();
    assert_eq!(codes.len(), all.len());
    assert!(codes.iter().all(|code| (110..=119).contains(code)));

    for failure in all {
        assert_eq!(ValidationFailure::from_code(failure.code()), Some(failure));
    }
    assert_eq!(ValidationFailure::from_code(101), None);
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn same_location_is_rejected(place in "[A-Za-z0-9][A-Za-z0-9 ]{0,30}") {
            prop_assert_eq!(
                validate_ride_details(&place, &place),
                Err(ValidationFailure::SameLocation)
            );
        }

        #[test]
        fn four_digit_codes_are_accepted(code in "[0-9]{4}") {
            prop_assert_eq!(validate_otp(&code), Ok(()));
        }

        #[test]
        fn other_codes_are_rejected(code in "\\PC{1,8}") {
            prop_assume!(!(code.len() == 4 && code.chars().all(|c| c.is_ascii_digit())));
            prop_assert_eq!(validate_otp(&code), Err(ValidationFailure::WrongLength));
        }
    }
}
