//! Past-ride records for the history list.
//!
//! No ride is ever persisted, so every feed here serves synthesized records.
//! The fixed driver identity and rating are placeholders.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::entities::{Rating, RideHistoryRecord, VehicleClass};
use crate::error::Error;

pub const RECORD_ID_LENGTH: usize = 24;

#[async_trait]
pub trait HistoryFeed: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<RideHistoryRecord>, Error>;
}

/// 24 lowercase hex characters taken from a v4 UUID.
pub fn record_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(RECORD_ID_LENGTH);
    id
}

pub fn placeholder_record(id: String) -> RideHistoryRecord {
    RideHistoryRecord {
        id,
        driver_name: "John Doe".into(),
        driver_image: "https://example.com/path/to/johns_image.jpg".into(),
        rating: Rating::MAX,
        charge: 100.0,
        created_at: Utc::now().date_naive(),
        distance: "10 km".into(),
        pickup_name: "Location A".into(),
        dropoff_name: "Location B".into(),
        vehicle_class: VehicleClass::Economy,
    }
}

/// One placeholder record per source item, ids unique within the batch.
pub fn synthesize_records(count: usize) -> Vec<RideHistoryRecord> {
    let mut seen = HashSet::with_capacity(count);

    (0..count)
        .map(|_| {
            let id = loop {
                let id = record_id();
                if seen.insert(id.clone()) {
                    break id;
                }
            };

            placeholder_record(id)
        })
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct StaticHistoryFeed {
    records: Vec<RideHistoryRecord>,
}

impl StaticHistoryFeed {
    pub fn new(records: Vec<RideHistoryRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl HistoryFeed for StaticHistoryFeed {
    async fn fetch_records(&self) -> Result<Vec<RideHistoryRecord>, Error> {
        Ok(self.records.clone())
    }
}

#[test]
fn record_ids_are_hex() {
    let id = record_id();

    assert_eq!(id.len(), RECORD_ID_LENGTH);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn synthesized_batch_has_unique_ids() {
    let records = synthesize_records(2000);
    let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

    assert_eq!(records.len(), 2000);
    assert_eq!(ids.len(), records.len());
    assert!(records.iter().all(|r| (1..=5).contains(&r.rating.stars())));
}

#[test]
fn static_feed_serves_its_records() {
    use tokio_test::block_on;

    let records = synthesize_records(3);
    let feed = StaticHistoryFeed::new(records.clone());

    assert_eq!(block_on(feed.fetch_records()).unwrap(), records);
}
