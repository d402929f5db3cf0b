use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::WorkflowView;
use crate::auth::User;
use crate::entities::Submission;
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    phone_number: String,
    access_token: String,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    Json(params): Json<CreateParams>,
) -> Result<Json<WorkflowView>, Error> {
    let workflow = api
        .create_workflow(user, params.phone_number, params.access_token)
        .await?;

    Ok(workflow.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowView>, Error> {
    let workflow = api.find_workflow(user, id).await?;

    Ok(workflow.into())
}

pub async fn submit(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(id): Path<Uuid>,
    Json(submission): Json<Submission>,
) -> Result<Json<WorkflowView>, Error> {
    let workflow = api.submit(user, id, submission).await?;

    Ok(workflow.into())
}

#[test]
fn handlers_drive_a_workflow() {
    use std::sync::Arc;

    use crate::engine::test_engine;
    use crate::entities::WorkflowStep;
    use tokio_test::block_on;

    let (engine, _, _) = test_engine();
    let api = Arc::new(engine) as DynAPI;
    let rider = User::new_rider(Uuid::new_v4());

    let Json(view) = block_on(create(
        Extension(api.clone()),
        rider.clone(),
        Json(CreateParams {
            phone_number: "+15550100".into(),
            access_token: "token".into(),
        }),
    ))
    .unwrap();

    let submission: Submission =
        serde_json::from_str(r#"{"step":"registration","name":"Ada","email":"ada@example.com"}"#)
            .unwrap();

    let Json(view) = block_on(submit(
        Extension(api.clone()),
        rider.clone(),
        Path(view.workflow.id),
        Json(submission),
    ))
    .unwrap();
    assert_eq!(view.workflow.step(), WorkflowStep::PhoneVerification);

    let Json(found) = block_on(find(Extension(api), rider, Path(view.workflow.id))).unwrap();
    assert_eq!(found, view);
}
