//! Folding of per-entity records into dealer groups.
//!
//! Folds run on a single task after each completed fetch; they never overlap
//! with each other. Results arrive in completion order, so the output is put
//! into a canonical order (dealers, vehicles and errors sorted by id) to make
//! the outcome independent of arrival order.

use crate::protocol::{DealerGroup, DealerId, DealerRecord, ErrorRecord, VehicleRecord};
use indexmap::IndexMap;

/// Errors of a stage, or `None` when the stage had none.
pub type StageErrors = Option<Vec<ErrorRecord>>;

fn into_stage_errors(mut errors: Vec<ErrorRecord>) -> StageErrors {
    if errors.is_empty() {
        return None;
    }
    errors.sort_by_key(|error| error.id);
    Some(errors)
}

/// Groups found vehicles under their dealer and collects failed ones.
#[derive(Debug, Default)]
pub struct DealerGrouping {
    groups: IndexMap<DealerId, DealerGroup>,
    errors: Vec<ErrorRecord>,
}

impl DealerGrouping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: VehicleRecord) {
        match record {
            VehicleRecord::Failed(error) => self.errors.push(error),
            VehicleRecord::Found(vehicle) => {
                let (dealer_id, detail) = vehicle.into_detail();
                self.groups
                    .entry(dealer_id)
                    .or_insert_with(|| DealerGroup::new(dealer_id))
                    .vehicles
                    .push(detail);
            }
        }
    }

    pub fn into_parts(mut self) -> (Vec<DealerGroup>, StageErrors) {
        self.groups.sort_unstable_keys();
        let groups = self
            .groups
            .into_values()
            .map(|mut group| {
                group.vehicles.sort_by_key(|vehicle| vehicle.vehicle_id);
                group
            })
            .collect();

        (groups, into_stage_errors(self.errors))
    }
}

/// Writes fetched dealer names into existing groups.
#[derive(Debug)]
pub struct DealerNaming {
    groups: Vec<DealerGroup>,
    errors: Vec<ErrorRecord>,
}

impl DealerNaming {
    pub fn new(groups: Vec<DealerGroup>) -> Self {
        DealerNaming {
            groups,
            errors: Vec::new(),
        }
    }

    /// Applies the record fetched for `requested`. The name lands in the group
    /// that was asked about, whatever dealer id the payload echoes back.
    pub fn apply(&mut self, requested: DealerId, record: DealerRecord) {
        match record {
            DealerRecord::Failed(error) => self.errors.push(error),
            DealerRecord::Found(dealer) => {
                if dealer.dealer_id != requested {
                    tracing::warn!(
                        dealer_id = requested,
                        returned_dealer_id = dealer.dealer_id,
                        "Dealer payload names a different dealer id"
                    );
                }
                match self.groups.iter_mut().find(|g| g.dealer_id == requested) {
                    Some(group) => group.name = Some(dealer.name),
                    None => tracing::warn!(dealer_id = requested, "No group for fetched dealer"),
                }
            }
        }
    }

    pub fn into_parts(self) -> (Vec<DealerGroup>, StageErrors) {
        (self.groups, into_stage_errors(self.errors))
    }
}

/// Folds a complete batch of vehicle records.
pub fn group_vehicle_records<I>(records: I) -> (Vec<DealerGroup>, StageErrors)
where
    I: IntoIterator<Item = VehicleRecord>,
{
    let mut grouping = DealerGrouping::new();
    for record in records {
        grouping.add(record);
    }
    grouping.into_parts()
}
