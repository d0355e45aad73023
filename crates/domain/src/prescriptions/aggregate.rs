use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

use crate::calculators::{compute_total_quantity, dose::deserialize_amount};
use crate::drafting::{CannedDrafter, Drafter};
use crate::errors::Error;

use super::{Command, Event};

/// Pharmacy chosen to fill the prescription
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PharmacySelection {
    pub pharmacy_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// A single editable prescription field.
///
/// Serialized as `{ "field": "<name>", "value": <value> }`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum PrescriptionField {
    MedicationName(String),
    QuantityPerDose(#[serde(deserialize_with = "deserialize_amount")] Option<f64>),
    Formulation(String),
    Route(String),
    Frequency(String),
    DurationDays(#[serde(deserialize_with = "deserialize_amount")] Option<f64>),
    Refills(u32),
    AllowSubstitution(bool),
    PatientInstructions(String),
    PharmacyNote(String),
    Pharmacy(Option<PharmacySelection>),
}

/// Prescription aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub medication_name: String,
    pub quantity_per_dose: Option<f64>,
    pub formulation: String,
    pub route: String,
    pub frequency: String,
    pub duration_days: Option<f64>,
    pub refills: u32,
    pub allow_substitution: bool,

    // Free text
    pub patient_instructions: String,
    pub pharmacy_note: String,

    pub pharmacy: Option<PharmacySelection>,

    pub deleted: bool,
}

pub const AGGREGATE_TYPE: &str = "Prescription";

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
impl Aggregate for Prescription {
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
            Command::AddPrescription { id } => {
                self.validate_new()?;

                Ok(vec![Event::PrescriptionAdded {
                    id,
                    created_at: Utc::now(),
                }])
            }

            Command::UpdatePrescription { field } => {
                self.validate_existing()?;

                Ok(vec![Event::PrescriptionUpdated {
                    id: self.id.clone(),
                    field,
                    updated_at: Utc::now(),
                }])
            }

            Command::DraftNote { prompt } => {
                self.validate_existing()?;
                let note = services.drafter.draft_note(&prompt).await?;

                Ok(vec![Event::NoteDrafted {
                    id: self.id.clone(),
                    note,
                    updated_at: Utc::now(),
                }])
            }

            Command::RemovePrescription => {
                self.validate_existing()?;

                Ok(vec![Event::PrescriptionRemoved {
                    id: self.id.clone(),
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::PrescriptionAdded { id, created_at } => {
                self.id = id;
                self.created_at = created_at;
                self.updated_at = created_at;
            }

            Event::PrescriptionUpdated { field, updated_at, .. } => {
                self.set(field);
                self.updated_at = updated_at;
            }

            Event::NoteDrafted { note, updated_at, .. } => {
                self.patient_instructions = note;
                self.updated_at = updated_at;
            }

            Event::PrescriptionRemoved { updated_at, .. } => {
                self.deleted = true;
                self.updated_at = updated_at;
            }
        }
    }
}

impl Prescription {
    /// Derived dispense amount; empty quantity or duration counts as zero.
    pub fn total_quantity(&self) -> u64 {
        compute_total_quantity(
            self.quantity_per_dose.unwrap_or(0.0),
            &self.frequency,
            self.duration_days.unwrap_or(0.0),
        )
    }

    fn set(&mut self, field: PrescriptionField) {
        match field {
            PrescriptionField::MedicationName(value) => self.medication_name = value,
            PrescriptionField::QuantityPerDose(value) => self.quantity_per_dose = value,
            PrescriptionField::Formulation(value) => self.formulation = value,
            PrescriptionField::Route(value) => self.route = value,
            PrescriptionField::Frequency(value) => self.frequency = value,
            PrescriptionField::DurationDays(value) => self.duration_days = value,
            PrescriptionField::Refills(value) => self.refills = value,
            PrescriptionField::AllowSubstitution(value) => self.allow_substitution = value,
            PrescriptionField::PatientInstructions(value) => self.patient_instructions = value,
            PrescriptionField::PharmacyNote(value) => self.pharmacy_note = value,
            PrescriptionField::Pharmacy(value) => self.pharmacy = value,
        }
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
        if self.deleted {
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqrs_es::test::TestFramework;
    use serde_json::json;

    type PrescriptionTest = TestFramework<Prescription>;

    struct FailingDrafter;

    #[async_trait]
    impl Drafter for FailingDrafter {
        async fn draft_note(&self, _prompt: &str) -> Result<String, Error> {
            Err(Error::Drafting { message: "backend unavailable".to_string() })
        }

        async fn draft_order(
            &self,
            _kind: crate::orders::OrderKind,
            _prompt: &str,
        ) -> Result<crate::drafting::OrderDraft, Error> {
            Err(Error::Drafting { message: "backend unavailable".to_string() })
        }
    }

    fn added(id: &str) -> Event {
        Event::PrescriptionAdded {
            id: id.to_string(),
            created_at: Utc::now(),
        }
    }

    fn existing(id: &str) -> Prescription {
        let mut prescription = Prescription::default();
        prescription.apply(added(id));
        prescription
    }

    async fn run(prescription: &mut Prescription, command: Command) {
        let events = prescription
            .handle(command, &Services::default())
            .await
            .unwrap();
        for event in events {
            prescription.apply(event);
        }
    }

    #[tokio::test]
    async fn new_prescription_starts_empty() {
        let prescription = existing("rx-1");

        assert_eq!(prescription.id, "rx-1");
        assert_eq!(prescription.quantity_per_dose, None);
        assert_eq!(prescription.duration_days, None);
        assert_eq!(prescription.total_quantity(), 0);
    }

    #[tokio::test]
    async fn total_follows_field_updates() {
        let mut prescription = existing("rx-1");

        for field in [
            PrescriptionField::MedicationName("Amoxicillin".to_string()),
            PrescriptionField::QuantityPerDose(Some(875.0)),
            PrescriptionField::Frequency("q8h".to_string()),
            PrescriptionField::DurationDays(Some(10.0)),
        ] {
            run(&mut prescription, Command::UpdatePrescription { field }).await;
        }
        assert_eq!(prescription.total_quantity(), 26250);

        let field = PrescriptionField::Frequency("q12h".to_string());
        run(&mut prescription, Command::UpdatePrescription { field }).await;
        assert_eq!(prescription.total_quantity(), 17500);

        let field = PrescriptionField::DurationDays(None);
        run(&mut prescription, Command::UpdatePrescription { field }).await;
        assert_eq!(prescription.total_quantity(), 0);
    }

    #[tokio::test]
    async fn draft_note_fills_instructions() {
        let mut prescription = existing("rx-1");

        run(&mut prescription, Command::DraftNote { prompt: "otitis media".to_string() }).await;

        assert_eq!(prescription.patient_instructions, crate::drafting::CANNED_NOTE);
    }

    #[tokio::test]
    async fn drafting_failure_surfaces() {
        let prescription = existing("rx-1");
        let services = Services::new(Arc::new(FailingDrafter));

        let err = prescription
            .handle(Command::DraftNote { prompt: "otitis".to_string() }, &services)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Drafting { .. }));
    }

    #[tokio::test]
    async fn removed_prescription_is_read_only() {
        let mut prescription = existing("rx-1");
        run(&mut prescription, Command::RemovePrescription).await;

        let err = prescription
            .handle(
                Command::UpdatePrescription { field: PrescriptionField::Refills(2) },
                &Services::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Forbidden));
    }

    #[test]
    fn update_requires_existing_prescription() {
        PrescriptionTest::with(Services::default())
            .given_no_previous_events()
            .when(Command::UpdatePrescription { field: PrescriptionField::Refills(1) })
            .then_expect_error_message("Entity not found: Prescription");
    }

    #[test]
    fn add_twice_conflicts() {
        PrescriptionTest::with(Services::default())
            .given(vec![added("rx-1")])
            .when(Command::AddPrescription { id: "rx-1".to_string() })
            .then_expect_error_message("Uniqueness conflict: id");
    }

    #[test]
    fn field_payload_is_lenient() {
        let field: PrescriptionField =
            serde_json::from_value(json!({ "field": "quantity_per_dose", "value": "2" })).unwrap();
        assert_eq!(field, PrescriptionField::QuantityPerDose(Some(2.0)));

        let field: PrescriptionField =
            serde_json::from_value(json!({ "field": "duration_days", "value": "" })).unwrap();
        assert_eq!(field, PrescriptionField::DurationDays(None));

        let field: PrescriptionField = serde_json::from_value(json!({
            "field": "pharmacy",
            "value": { "pharmacy_id": "ph-9", "name": "Corner Pharmacy" }
        }))
        .unwrap();
        assert_eq!(
            field,
            PrescriptionField::Pharmacy(Some(PharmacySelection {
                pharmacy_id: "ph-9".to_string(),
                name: "Corner Pharmacy".to_string(),
                address: None,
            }))
        );
    }
}
