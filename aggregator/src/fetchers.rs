//! Entity fetchers.
//!
//! [`fetch_dataset_id`] and [`fetch_vehicle_ids`] propagate every failure to
//! the caller. [`fetch_vehicle_record`] and [`fetch_dealer_record`] never
//! fail: they run inside a fan-out, so any error is folded into a degraded
//! record carrying the requested id.

use crate::api::{ApiClient, Endpoint};
use crate::errors::{FetchError, Result};
use crate::protocol::{
    Dealer, DealerId, DealerRecord, ErrorRecord, Vehicle, VehicleId, VehicleRecord,
};
use serde_json::{Map, Value as JsonValue};
use url::Url;

/// Integers are read as `i64`; larger JSON numbers are mismatches.
const INTEGER: &str = "integer in the i64 range";

/// A decoded body that has been checked to be a JSON object.
struct Payload<'a> {
    url: &'a Url,
    fields: Map<String, JsonValue>,
}

impl<'a> Payload<'a> {
    fn new(url: &'a Url, value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(fields) => Ok(Payload { url, fields }),
            other => Err(FetchError::UnexpectedShape {
                url: url.clone(),
                value: other,
            }),
        }
    }

    fn field(&self, key: &'static str) -> Result<&JsonValue> {
        self.fields.get(key).ok_or_else(|| FetchError::MissingField {
            url: self.url.clone(),
            key,
            value: JsonValue::Object(self.fields.clone()),
        })
    }

    fn mismatch(
        &self,
        key: impl Into<String>,
        expected: &'static str,
        value: &JsonValue,
    ) -> FetchError {
        FetchError::TypeMismatch {
            url: self.url.clone(),
            key: key.into(),
            expected,
            value: value.clone(),
        }
    }

    fn string(&self, key: &'static str) -> Result<String> {
        let value = self.field(key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.mismatch(key, "string", value))
    }

    fn integer(&self, key: &'static str) -> Result<i64> {
        let value = self.field(key)?;
        value
            .as_i64()
            .ok_or_else(|| self.mismatch(key, INTEGER, value))
    }

    /// Reads an array of integers. The first non-integer element is reported
    /// with its index.
    fn integers(&self, key: &'static str) -> Result<Vec<i64>> {
        let value = self.field(key)?;
        let items = value
            .as_array()
            .ok_or_else(|| self.mismatch(key, "array", value))?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_i64()
                    .ok_or_else(|| self.mismatch(format!("{key}[{index}]"), INTEGER, item))
            })
            .collect()
    }
}

/// GET `/api/datasetid`
pub async fn fetch_dataset_id(api: &ApiClient) -> Result<String> {
    let (url, value) = api.get(Endpoint::DatasetId).await?;
    Payload::new(&url, value)?.string("datasetId")
}

/// GET `/api/{datasetId}/vehicles`
pub async fn fetch_vehicle_ids(api: &ApiClient, dataset_id: &str) -> Result<Vec<VehicleId>> {
    let (url, value) = api.get(Endpoint::Vehicles { dataset_id }).await?;
    Payload::new(&url, value)?.integers("vehicleIds")
}

async fn try_fetch_vehicle(
    api: &ApiClient,
    dataset_id: &str,
    vehicle_id: VehicleId,
) -> Result<Vehicle> {
    let (url, value) = api
        .get(Endpoint::Vehicle {
            dataset_id,
            vehicle_id,
        })
        .await?;
    let payload = Payload::new(&url, value)?;

    // Checked in a fixed order so the first bad key decides the error.
    let vehicle_id = payload.integer("vehicleId")?;
    let year = payload.integer("year")?;
    let make = payload.string("make")?;
    let model = payload.string("model")?;
    let dealer_id = payload.integer("dealerId")?;

    Ok(Vehicle {
        vehicle_id,
        year,
        make,
        model,
        dealer_id,
    })
}

/// GET `/api/{datasetId}/vehicles/{vehicleId}`, degrading any failure.
pub async fn fetch_vehicle_record(
    api: &ApiClient,
    dataset_id: &str,
    vehicle_id: VehicleId,
) -> VehicleRecord {
    match try_fetch_vehicle(api, dataset_id, vehicle_id).await {
        Ok(vehicle) => VehicleRecord::Found(vehicle),
        Err(e) => VehicleRecord::Failed(ErrorRecord {
            id: vehicle_id,
            error_message: e.to_string(),
        }),
    }
}

async fn try_fetch_dealer(
    api: &ApiClient,
    dataset_id: &str,
    dealer_id: DealerId,
) -> Result<Dealer> {
    let (url, value) = api
        .get(Endpoint::Dealer {
            dataset_id,
            dealer_id,
        })
        .await?;
    let payload = Payload::new(&url, value)?;

    let name = payload.string("name")?;
    let dealer_id = payload.integer("dealerId")?;

    Ok(Dealer { dealer_id, name })
}

/// GET `/api/{datasetId}/dealers/{dealerId}`, degrading any failure.
pub async fn fetch_dealer_record(
    api: &ApiClient,
    dataset_id: &str,
    dealer_id: DealerId,
) -> DealerRecord {
    match try_fetch_dealer(api, dataset_id, dealer_id).await {
        Ok(dealer) => DealerRecord::Found(dealer),
        Err(e) => DealerRecord::Failed(ErrorRecord {
            id: dealer_id,
            error_message: e.to_string(),
        }),
    }
}
