use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};
use super::aggregate::PrescriptionField;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    PrescriptionAdded {
        id: String,
        created_at: DateTime<Utc>,
    },

    PrescriptionUpdated {
        id: String,
        field: PrescriptionField,
        updated_at: DateTime<Utc>,
    },

    NoteDrafted {
        id: String,
        note: String,
        updated_at: DateTime<Utc>,
    },

    PrescriptionRemoved {
        id: String,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::PrescriptionAdded { .. } => "Prescription:Added".to_string(),
            Event::PrescriptionUpdated { .. } => "Prescription:Updated".to_string(),
            Event::NoteDrafted { .. } => "Prescription:NoteDrafted".to_string(),
            Event::PrescriptionRemoved { .. } => "Prescription:Removed".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
