use crate::api::{ApiClient, Endpoint};
use crate::collector::{collect_dealer_names, collect_vehicle_records};
use crate::config::Config;
use crate::errors::{Result, SetupError};
use crate::fan_out::FanOut;
use crate::fetchers::{fetch_dataset_id, fetch_vehicle_ids};
use crate::grouping::StageErrors;
use crate::metrics_defs::MERGE_DURATION;
use crate::protocol::MergeResult;
use serde_json::Value as JsonValue;
use shared::histogram;
use shared::http::ReqwestTransport;
use std::sync::Arc;
use std::time::Instant;

fn log_stage_errors(stage: &'static str, errors: &StageErrors) {
    let Some(errors) = errors else {
        return;
    };
    tracing::warn!(stage, count = errors.len(), "Stage finished with errors");
    for error in errors {
        tracing::warn!(stage, id = error.id, "{}", error.error_message);
    }
}

/// Runs the collect-and-submit pipeline against one upstream.
///
/// Stages run strictly one after the other. Fetching the dataset id, the
/// vehicle ids, and submitting the answer are fatal on failure. The two
/// per-entity collection stages only log their failures.
pub struct Aggregator {
    api: ApiClient,
    fan_out: FanOut,
}

impl Aggregator {
    pub fn new(api: ApiClient, fan_out: FanOut) -> Self {
        Self { api, fan_out }
    }

    /// Builds an aggregator talking HTTP to the configured upstream.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.upstream.http_timeout())?;
        let api = ApiClient::new(Arc::new(transport), config.upstream.base_url.clone())?;
        Ok(Self::new(api, FanOut::new(config.fan_out.limit())))
    }

    /// Collects and groups the dataset without submitting it.
    pub async fn collect(&self) -> Result<(String, MergeResult)> {
        let dataset_id = fetch_dataset_id(&self.api).await?;
        tracing::info!(dataset_id = %dataset_id, "Fetched dataset id");

        let vehicle_ids = fetch_vehicle_ids(&self.api, &dataset_id).await?;
        tracing::info!(dataset_id = %dataset_id, count = vehicle_ids.len(), "Fetched vehicle ids");

        let (groups, vehicle_errors) =
            collect_vehicle_records(&self.api, &self.fan_out, &dataset_id, &vehicle_ids).await;
        log_stage_errors("vehicles", &vehicle_errors);

        let (dealers, dealer_errors) =
            collect_dealer_names(&self.api, &self.fan_out, &dataset_id, groups).await;
        log_stage_errors("dealers", &dealer_errors);

        Ok((dataset_id, MergeResult { dealers }))
    }

    /// POSTs the merged dealers as the dataset's answer and returns the
    /// decoded response.
    pub async fn submit(&self, dataset_id: &str, result: &MergeResult) -> Result<JsonValue> {
        tracing::info!(dataset_id, dealers = result.dealers.len(), "Submitting answer");
        self.api.post(Endpoint::Answer { dataset_id }, result).await
    }

    /// Collects, groups and submits the dataset.
    pub async fn merge(&self) -> Result<JsonValue> {
        let start = Instant::now();
        let (dataset_id, result) = self.collect().await?;
        let response = self.submit(&dataset_id, &result).await?;
        histogram!(MERGE_DURATION).record(start.elapsed().as_secs_f64());
        tracing::info!(dataset_id = %dataset_id, "Merge submitted");
        Ok(response)
    }
}
