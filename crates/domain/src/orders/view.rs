use cqrs_es::{Aggregate, EventEnvelope, View as CqrsView};
use serde::{Deserialize, Serialize};
use crate::calculators::OrderSummary;
use super::{Order, AGGREGATE_TYPE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub order: Order,
}

/// Order with its counts and summary text derived on read
#[derive(Clone, Debug, Serialize, Eq, PartialEq)]
pub struct OrderCard {
    #[serde(flatten)]
    pub order: Order,
    pub summary: OrderSummary,
}

impl View {
    pub fn card(&self) -> OrderCard {
        OrderCard {
            order: self.order.clone(),
            summary: self.order.summary(),
        }
    }
}

impl CqrsView<Order> for View {
    fn update(&mut self, event: &EventEnvelope<Order>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .cloned()
            .unwrap_or_default();
        self.order.apply(event.payload.clone());
    }
}
