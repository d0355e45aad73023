use super::aggregate::OrderKind;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceOrderInput {
    #[serde(default)]
    pub kind: OrderKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRequestInput {
    pub category: String,
    #[serde(default)]
    pub exams: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddDiagnosisInput {
    pub diagnosis: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DraftOrderInput {
    pub prompt: String,
}
