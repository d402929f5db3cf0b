use super::Engine;

use async_trait::async_trait;

use crate::{api::HistoryAPI, auth::User, entities::RideHistoryRecord, error::Error};

#[async_trait]
impl HistoryAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_history(&self, user: User) -> Result<Vec<RideHistoryRecord>, Error> {
        let records = self.history.fetch_records().await?;

        tracing::info!("serving {} history records", records.len());

        Ok(records)
    }
}

#[test]
fn list_history_test() {
    use super::test_engine;
    use tokio_test::block_on;
    use uuid::Uuid;

    let (engine, _, _) = test_engine();

    let records = block_on(engine.list_history(User::new_rider(Uuid::new_v4()))).unwrap();

    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|record| record.driver_name == "John Doe"));
}

#[test]
fn list_history_surfaces_feed_errors() {
    use std::sync::Arc;

    use crate::error::upstream_error;
    use crate::history::HistoryFeed;
    use crate::navigation::RecordingNavigator;
    use crate::session::MemorySessionBackend;
    use tokio_test::block_on;
    use uuid::Uuid;

    struct DownFeed;

    #[async_trait]
    impl HistoryFeed for DownFeed {
        async fn fetch_records(&self) -> Result<Vec<RideHistoryRecord>, Error> {
            Err(upstream_error())
        }
    }

    let engine = Engine::new(
        Arc::new(MemorySessionBackend::new()),
        Arc::new(RecordingNavigator::new()),
        Arc::new(DownFeed),
    )
    .unwrap();

    let err = block_on(engine.list_history(User::new_rider(Uuid::new_v4()))).unwrap_err();
    assert_eq!(err, upstream_error());
}
