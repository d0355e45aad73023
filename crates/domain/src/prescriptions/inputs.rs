use serde::{Deserialize, Serialize};

pub use super::aggregate::PrescriptionField as UpdatePrescriptionInput;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DraftNoteInput {
    pub prompt: String,
}
