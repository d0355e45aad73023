use serde::{Deserialize, Serialize};
use super::aggregate::PrescriptionField;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Command {
    /// Add an empty prescription to the encounter
    AddPrescription {
        id: String,
    },

    /// Change one field
    UpdatePrescription {
        field: PrescriptionField,
    },

    /// Ask the drafter for patient instructions
    DraftNote {
        prompt: String,
    },

    /// Remove the prescription from the encounter
    RemovePrescription,
}
