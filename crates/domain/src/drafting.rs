//! Drafting capability used to pre-fill notes and orders.
//!
//! Aggregates receive a [`Drafter`] through their services, so a real
//! backend can replace [`CannedDrafter`] without touching command handling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::calculators::OrderRequest;
use crate::errors::Error;
use crate::orders::OrderKind;

/// Diagnoses and requests proposed for an order
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderDraft {
    pub diagnoses: Vec<String>,
    pub requests: Vec<OrderRequest>,
}

#[async_trait]
pub trait Drafter: Send + Sync {
    /// Free text for a prescription note.
    async fn draft_note(&self, prompt: &str) -> Result<String, Error>;

    /// Diagnoses and requests for a lab or imaging order.
    async fn draft_order(&self, kind: OrderKind, prompt: &str) -> Result<OrderDraft, Error>;
}

/// Returns fixed responses immediately.
#[derive(Clone, Debug, Default)]
pub struct CannedDrafter;

pub const CANNED_NOTE: &str =
    "Take with food. Complete the full course even if symptoms improve.";

#[async_trait]
impl Drafter for CannedDrafter {
    async fn draft_note(&self, prompt: &str) -> Result<String, Error> {
        ensure_prompt(prompt)?;
        tracing::debug!("Drafting note for prompt of {} chars", prompt.len());
        Ok(CANNED_NOTE.to_string())
    }

    async fn draft_order(&self, kind: OrderKind, prompt: &str) -> Result<OrderDraft, Error> {
        ensure_prompt(prompt)?;
        tracing::debug!("Drafting {} order", kind.label());

        let draft = match kind {
            OrderKind::Lab => OrderDraft {
                diagnoses: vec!["Type 2 diabetes mellitus".to_string()],
                requests: vec![
                    OrderRequest::new(
                        "CBC".to_string(),
                        vec!["WBC".to_string(), "RBC".to_string(), "Platelets".to_string()],
                    ),
                    OrderRequest::new("HbA1c".to_string(), vec!["HbA1c".to_string()]),
                ],
            },
            OrderKind::Imaging => OrderDraft {
                diagnoses: vec!["Community-acquired pneumonia".to_string()],
                requests: vec![OrderRequest::new(
                    "X-ray".to_string(),
                    vec!["Chest PA".to_string(), "Chest lateral".to_string()],
                )],
            },
        };

        Ok(draft)
    }
}

fn ensure_prompt(prompt: &str) -> Result<(), Error> {
    if prompt.trim().is_empty() {
        return Err(Error::Validation {
            message: "Drafting prompt must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_note_for_any_prompt() {
        let note = CannedDrafter.draft_note("amoxicillin for otitis").await.unwrap();
        assert_eq!(note, CANNED_NOTE);
    }

    #[tokio::test]
    async fn lab_draft_has_requests_and_diagnosis() {
        let draft = CannedDrafter
            .draft_order(OrderKind::Lab, "diabetes follow-up")
            .await
            .unwrap();

        assert_eq!(draft.diagnoses, vec!["Type 2 diabetes mellitus".to_string()]);
        assert_eq!(draft.requests.len(), 2);
        assert_eq!(draft.requests[0].exams.len(), 3);
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let err = CannedDrafter.draft_note("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = CannedDrafter
            .draft_order(OrderKind::Imaging, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
