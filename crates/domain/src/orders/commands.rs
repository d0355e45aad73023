use serde::{Deserialize, Serialize};
use crate::calculators::OrderRequest;
use super::aggregate::OrderKind;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Open a new lab or imaging order
    PlaceOrder {
        id: String,
        kind: OrderKind,
        number: u32,
    },

    AddRequest {
        request: OrderRequest,
    },

    RemoveRequest {
        index: usize,
    },

    AddDiagnosis {
        diagnosis: String,
    },

    RemoveDiagnosis {
        index: usize,
    },

    /// Pre-fill diagnoses and requests from the drafter
    DraftOrder {
        prompt: String,
    },

    CancelOrder,
}
