//! Fan-out collection stages.
//!
//! Both stages launch one fetch per id, wait for every fetch to finish and
//! fold the results. Failed fetches never abort their siblings; they end up
//! in the stage's error list instead.

use crate::api::ApiClient;
use crate::fan_out::FanOut;
use crate::fetchers::{fetch_dealer_record, fetch_vehicle_record};
use crate::grouping::{DealerGrouping, DealerNaming, StageErrors};
use crate::metrics_defs::{DEALERS_FAILED, DEALERS_FETCHED, VEHICLES_FAILED, VEHICLES_FETCHED};
use crate::protocol::{DealerGroup, DealerRecord, ErrorRecord, VehicleId, VehicleRecord};
use shared::counter;
use tokio::task::JoinError;

fn task_failure(id: i64, e: JoinError) -> ErrorRecord {
    ErrorRecord {
        id,
        error_message: format!("fetch task failed: {e}"),
    }
}

/// Fetches every vehicle and groups the found ones under their dealer.
pub async fn collect_vehicle_records(
    api: &ApiClient,
    fan_out: &FanOut,
    dataset_id: &str,
    vehicle_ids: &[VehicleId],
) -> (Vec<DealerGroup>, StageErrors) {
    tracing::info!(dataset_id, count = vehicle_ids.len(), "Collecting vehicle records");
    let mut grouping = DealerGrouping::new();

    fan_out
        .run(
            vehicle_ids.iter().copied(),
            |vehicle_id| {
                let api = api.clone();
                let dataset_id = dataset_id.to_string();
                async move { fetch_vehicle_record(&api, &dataset_id, vehicle_id).await }
            },
            |vehicle_id, outcome| {
                let record = outcome
                    .unwrap_or_else(|e| VehicleRecord::Failed(task_failure(vehicle_id, e)));
                match &record {
                    VehicleRecord::Found(_) => counter!(VEHICLES_FETCHED).increment(1),
                    VehicleRecord::Failed(_) => counter!(VEHICLES_FAILED).increment(1),
                }
                tracing::debug!(vehicle_id, "Vehicle fetch completed");
                grouping.add(record);
            },
        )
        .await;

    grouping.into_parts()
}

/// Fetches the name of every grouped dealer and writes it into its group.
pub async fn collect_dealer_names(
    api: &ApiClient,
    fan_out: &FanOut,
    dataset_id: &str,
    groups: Vec<DealerGroup>,
) -> (Vec<DealerGroup>, StageErrors) {
    tracing::info!(dataset_id, count = groups.len(), "Collecting dealer names");
    let dealer_ids: Vec<i64> = groups.iter().map(|group| group.dealer_id).collect();
    let mut naming = DealerNaming::new(groups);

    fan_out
        .run(
            dealer_ids,
            |dealer_id| {
                let api = api.clone();
                let dataset_id = dataset_id.to_string();
                async move { fetch_dealer_record(&api, &dataset_id, dealer_id).await }
            },
            |dealer_id, outcome| {
                let record =
                    outcome.unwrap_or_else(|e| DealerRecord::Failed(task_failure(dealer_id, e)));
                match &record {
                    DealerRecord::Found(_) => counter!(DEALERS_FETCHED).increment(1),
                    DealerRecord::Failed(_) => counter!(DEALERS_FAILED).increment(1),
                }
                tracing::debug!(dealer_id, "Dealer fetch completed");
                naming.apply(dealer_id, record);
            },
        )
        .await;

    naming.into_parts()
}
