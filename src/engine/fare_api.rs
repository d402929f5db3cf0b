use super::Engine;

use async_trait::async_trait;

use crate::{api::FareAPI, auth::User, error::Error, fare, fare::FareEstimate};

#[async_trait]
impl FareAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn estimate_fare(
        &self,
        user: User,
        distance: String,
        vehicle_class: String,
    ) -> Result<FareEstimate, Error> {
        let estimate = fare::estimate_fare(&distance, &vehicle_class)?;

        Ok(estimate)
    }
}

#[test]
fn estimate_fare_test() {
    use super::test_engine;
    use crate::entities::VehicleClass;
    use crate::validation::ValidationFailure;
    use tokio_test::block_on;
    use uuid::Uuid;

    let (engine, _, _) = test_engine();
    let rider = User::new_rider(Uuid::new_v4());

    let estimate = block_on(engine.estimate_fare(rider.clone(), "10".into(), "luxury".into())).unwrap();
    assert_eq!(estimate.vehicle_class, VehicleClass::Luxury);
    assert_eq!(estimate.display, "200.00");

    let err = block_on(engine.estimate_fare(rider.clone(), "".into(), "SUV".into())).unwrap_err();
    assert_eq!(err.validation_failure(), Some(ValidationFailure::NotANumber));

    let err = block_on(engine.estimate_fare(rider, "4".into(), "Tandem".into())).unwrap_err();
    assert!(err.is_invalid_input_error());
}
