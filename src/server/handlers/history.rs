use axum::extract::{Extension, Json};

use crate::auth::User;
use crate::entities::RideHistoryRecord;
use crate::error::Error;
use crate::server::DynAPI;

pub async fn list(
    Extension(api): Extension<DynAPI>,
    user: User,
) -> Result<Json<Vec<RideHistoryRecord>>, Error> {
    let records = api.list_history(user).await?;

    Ok(records.into())
}
