use cqrs_es::{Aggregate, EventEnvelope, View as CqrsView};
use serde::{Deserialize, Serialize};
use super::{Prescription, AGGREGATE_TYPE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub prescription: Prescription,
}

/// Prescription as shown to the clinician, with its total recomputed.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PrescriptionCard {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub total_quantity: u64,
}

impl View {
    pub fn card(&self) -> PrescriptionCard {
        PrescriptionCard {
            prescription: self.prescription.clone(),
            total_quantity: self.prescription.total_quantity(),
        }
    }
}

impl CqrsView<Prescription> for View {
    fn update(&mut self, event: &EventEnvelope<Prescription>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .cloned()
            .unwrap_or_default();
        self.prescription.apply(event.payload.clone());
    }
}
