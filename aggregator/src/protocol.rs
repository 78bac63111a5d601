//! Wire types for the dealer/vehicle API.
//!
//! Field names follow the upstream's camelCase convention. Per-entity fetches
//! produce tagged records: either the validated payload or an [`ErrorRecord`]
//! naming the id that failed.

use serde::{Deserialize, Serialize};

pub type VehicleId = i64;
pub type DealerId = i64;

/// A fully validated vehicle as returned by the vehicle endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vehicle {
    pub vehicle_id: VehicleId,
    pub year: i64,
    pub make: String,
    pub model: String,
    pub dealer_id: DealerId,
}

impl Vehicle {
    /// Splits the owning dealer off the vehicle.
    pub fn into_detail(self) -> (DealerId, VehicleDetail) {
        let detail = VehicleDetail {
            vehicle_id: self.vehicle_id,
            year: self.year,
            make: self.make,
            model: self.model,
        };
        (self.dealer_id, detail)
    }
}

/// A vehicle as listed under its dealer in the submission body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    pub vehicle_id: VehicleId,
    pub year: i64,
    pub make: String,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dealer {
    pub dealer_id: DealerId,
    pub name: String,
}

/// A per-entity failure. `id` is a vehicle or dealer id depending on the
/// stage that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: i64,
    pub error_message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VehicleRecord {
    Found(Vehicle),
    Failed(ErrorRecord),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DealerRecord {
    Found(Dealer),
    Failed(ErrorRecord),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerGroup {
    pub dealer_id: DealerId,
    /// Absent until the dealer stage resolves it; stays absent if that fetch fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub vehicles: Vec<VehicleDetail>,
}

impl DealerGroup {
    pub fn new(dealer_id: DealerId) -> Self {
        DealerGroup {
            dealer_id,
            name: None,
            vehicles: Vec::new(),
        }
    }
}

/// Body of the answer submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub dealers: Vec<DealerGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn f150() -> VehicleDetail {
        VehicleDetail {
            vehicle_id: 1,
            year: 2020,
            make: "Ford".into(),
            model: "F150".into(),
        }
    }

    #[test]
    fn test_into_detail_strips_dealer() {
        let vehicle = Vehicle {
            vehicle_id: 1,
            year: 2020,
            make: "Ford".into(),
            model: "F150".into(),
            dealer_id: 100,
        };
        assert_eq!(vehicle.into_detail(), (100, f150()));
    }

    #[test]
    fn test_submission_body_is_exact() {
        let result = MergeResult {
            dealers: vec![DealerGroup {
                dealer_id: 100,
                name: Some("AutoMax".into()),
                vehicles: vec![f150()],
            }],
        };

        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"dealers":[{"dealerId":100,"name":"AutoMax","vehicles":[{"vehicleId":1,"year":2020,"make":"Ford","model":"F150"}]}]}"#
        );
    }

    #[test]
    fn test_unnamed_group_omits_name() {
        let mut group = DealerGroup::new(5);
        group.vehicles.push(f150());
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(
            value,
            json!({
                "dealerId": 5,
                "vehicles": [{"vehicleId": 1, "year": 2020, "make": "Ford", "model": "F150"}]
            })
        );
    }
}
