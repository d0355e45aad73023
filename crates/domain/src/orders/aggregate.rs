use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

use crate::calculators::{summarize_order, OrderRequest, OrderSummary};
use crate::drafting::{CannedDrafter, Drafter};
use crate::errors::Error;

use super::{Command, Event};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    #[default]
    Lab,
    Imaging,
}

impl OrderKind {
    pub fn label(&self) -> &'static str {
        match self {
            OrderKind::Lab => "Lab",
            OrderKind::Imaging => "Imaging",
        }
    }
}

/// Order status
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepting requests and diagnoses
    #[default]
    Open,
    /// Withdrawn by the clinician
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Lab or imaging order aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Order {
    pub id: String,
    pub kind: OrderKind,
    /// Position within the encounter, starting at 1
    pub number: u32,
    pub ordered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: OrderStatus,

    pub diagnoses: Vec<String>,
    pub requests: Vec<OrderRequest>,
}

pub const AGGREGATE_TYPE: &str = "Order";

#[derive(Clone)]
pub struct Services {
    pub drafter: Arc<dyn Drafter>,
}

impl Services {
    pub fn new(drafter: Arc<dyn Drafter>) -> Self {
        Self { drafter }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(Arc::new(CannedDrafter))
    }
}

#[async_trait]
impl Aggregate for Order {
    type Command = Command;
    type Event = Event;
    type Error = Error;
    type Services = Services;

    fn aggregate_type() -> String {
        AGGREGATE_TYPE.to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            Command::PlaceOrder { id, kind, number } => {
                self.validate_new()?;

                Ok(vec![Event::OrderPlaced {
                    id,
                    kind,
                    number,
                    ordered_at: Utc::now(),
                }])
            }

            Command::AddRequest { request } => {
                self.validate_open()?;
                if request.category.trim().is_empty() {
                    return Err(Error::Validation {
                        message: "Request category must not be empty".to_string(),
                    });
                }

                Ok(vec![Event::RequestAdded {
                    id: self.id.clone(),
                    request,
                    updated_at: Utc::now(),
                }])
            }

            Command::RemoveRequest { index } => {
                self.validate_open()?;
                validate_index("request", index, self.requests.len())?;

                Ok(vec![Event::RequestRemoved {
                    id: self.id.clone(),
                    index,
                    updated_at: Utc::now(),
                }])
            }

            Command::AddDiagnosis { diagnosis } => {
                self.validate_open()?;
                if diagnosis.trim().is_empty() {
                    return Err(Error::Validation {
                        message: "Diagnosis must not be empty".to_string(),
                    });
                }

                Ok(vec![Event::DiagnosisAdded {
                    id: self.id.clone(),
                    diagnosis,
                    updated_at: Utc::now(),
                }])
            }

            Command::RemoveDiagnosis { index } => {
                self.validate_open()?;
                validate_index("diagnosis", index, self.diagnoses.len())?;

                Ok(vec![Event::DiagnosisRemoved {
                    id: self.id.clone(),
                    index,
                    updated_at: Utc::now(),
                }])
            }

            Command::DraftOrder { prompt } => {
                self.validate_open()?;
                let draft = services.drafter.draft_order(self.kind, &prompt).await?;

                Ok(vec![Event::OrderDrafted {
                    id: self.id.clone(),
                    diagnoses: draft.diagnoses,
                    requests: draft.requests,
                    updated_at: Utc::now(),
                }])
            }

            Command::CancelOrder => {
                self.validate_existing()?;
                if self.status == OrderStatus::Cancelled {
                    return Err(Error::InvalidStateTransition {
                        from: self.status.to_string(),
                        to: OrderStatus::Cancelled.to_string(),
                    });
                }

                Ok(vec![Event::OrderCancelled {
                    id: self.id.clone(),
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::OrderPlaced { id, kind, number, ordered_at } => {
                self.id = id;
                self.kind = kind;
                self.number = number;
                self.ordered_at = ordered_at;
                self.updated_at = ordered_at;
                self.status = OrderStatus::Open;
            }

            Event::RequestAdded { request, updated_at, .. } => {
                self.requests.push(request);
                self.updated_at = updated_at;
            }

            Event::RequestRemoved { index, updated_at, .. } => {
                if index < self.requests.len() {
                    self.requests.remove(index);
                }
                self.updated_at = updated_at;
            }

            Event::DiagnosisAdded { diagnosis, updated_at, .. } => {
                self.diagnoses.push(diagnosis);
                self.updated_at = updated_at;
            }

            Event::DiagnosisRemoved { index, updated_at, .. } => {
                if index < self.diagnoses.len() {
                    self.diagnoses.remove(index);
                }
                self.updated_at = updated_at;
            }

            Event::OrderDrafted { diagnoses, requests, updated_at, .. } => {
                self.diagnoses = diagnoses;
                self.requests = requests;
                self.updated_at = updated_at;
            }

            Event::OrderCancelled { updated_at, .. } => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = updated_at;
            }
        }
    }
}

impl Order {
    /// Title shown when the order has no diagnosis yet, e.g. `Lab Order #2`.
    pub fn fallback_label(&self) -> String {
        format!("{} Order #{}", self.kind.label(), self.number)
    }

    pub fn summary(&self) -> OrderSummary {
        summarize_order(&self.requests, &self.diagnoses, &self.fallback_label())
    }

    fn validate_new(&self) -> Result<(), Error> {
        if !self.id.is_empty() {
            return Err(Error::Uniqueness { field: "id".to_string() });
        }
        Ok(())
    }

    fn validate_existing(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::NotFound { entity: AGGREGATE_TYPE.to_string() });
        }
        Ok(())
    }

    fn validate_open(&self) -> Result<(), Error> {
        self.validate_existing()?;
        if self.status == OrderStatus::Cancelled {
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}

fn validate_index(item: &str, index: usize, len: usize) -> Result<(), Error> {
    if index >= len {
        return Err(Error::Validation {
            message: format!("No {} at index {} (order has {})", item, index, len),
        });
    }
    Ok(())
}
