use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};
use crate::calculators::OrderRequest;
use super::aggregate::OrderKind;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    OrderPlaced {
        id: String,
        kind: OrderKind,
        number: u32,
        ordered_at: DateTime<Utc>,
    },

    RequestAdded {
        id: String,
        request: OrderRequest,
        updated_at: DateTime<Utc>,
    },

    RequestRemoved {
        id: String,
        index: usize,
        updated_at: DateTime<Utc>,
    },

    DiagnosisAdded {
        id: String,
        diagnosis: String,
        updated_at: DateTime<Utc>,
    },

    DiagnosisRemoved {
        id: String,
        index: usize,
        updated_at: DateTime<Utc>,
    },

    OrderDrafted {
        id: String,
        diagnoses: Vec<String>,
        requests: Vec<OrderRequest>,
        updated_at: DateTime<Utc>,
    },

    OrderCancelled {
        id: String,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::OrderPlaced { .. } => "Order:Placed".to_string(),
            Event::RequestAdded { .. } => "Order:RequestAdded".to_string(),
            Event::RequestRemoved { .. } => "Order:RequestRemoved".to_string(),
            Event::DiagnosisAdded { .. } => "Order:DiagnosisAdded".to_string(),
            Event::DiagnosisRemoved { .. } => "Order:DiagnosisRemoved".to_string(),
            Event::OrderDrafted { .. } => "Order:Drafted".to_string(),
            Event::OrderCancelled { .. } => "Order:Cancelled".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
