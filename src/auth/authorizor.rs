use oso::{Oso, PolarClass};

use crate::auth::User;
use crate::entities::Workflow;
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(User::get_polar_class())?;
    o.register_class(Workflow::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[test]
fn rider_role_test() {
    use uuid::Uuid;

    let authorizor = new().unwrap();

    let rider = User::new_rider(Uuid::new_v4());
    let workflow = Workflow::new(rider.id, "+15550100".into());

    let result = authorizor.query_rule("has_role", (rider.clone(), "rider", workflow.clone()));
    assert!(result.unwrap().next().unwrap().is_ok());

    let result = authorizor.is_allowed(rider.clone(), "read", workflow.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(rider.clone(), "submit", workflow.clone());
    assert_eq!(result.unwrap(), true);
}

#[test]
fn other_rider_test() {
    use uuid::Uuid;

    let authorizor = new().unwrap();

    let owner = User::new_rider(Uuid::new_v4());
    let stranger = User::new_rider(Uuid::new_v4());
    let workflow = Workflow::new(owner.id, "+15550100".into());

    let result = authorizor.query_rule("has_role", (stranger.clone(), "rider", workflow.clone()));
    assert!(result.unwrap().next().is_none());

    let result = authorizor.is_allowed(stranger.clone(), "read", workflow.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(stranger.clone(), "submit", workflow.clone());
    assert_eq!(result.unwrap(), false);
}

#[test]
fn system_role_test() {
    use uuid::Uuid;

    let authorizor = new().unwrap();

    let system = User::new_system_user();
    let workflow = Workflow::new(Uuid::new_v4(), "+15550100".into());

    let result = authorizor.query_rule("has_role", (system.clone(), "system", workflow.clone()));
    assert!(result.unwrap().next().unwrap().is_ok());

    let result = authorizor.is_allowed(system.clone(), "read", workflow.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(system.clone(), "submit", workflow.clone());
    assert_eq!(result.unwrap(), false);
}
