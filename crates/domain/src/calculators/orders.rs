use serde::{Deserialize, Serialize};

pub const NO_TESTS_SELECTED: &str = "No tests selected";

/// One line item of a lab or imaging order
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, derive_new::new)]
pub struct OrderRequest {
    pub category: String,
    #[serde(default)]
    pub exams: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderSummary {
    pub total_tests: usize,
    pub diagnoses_count: usize,
    pub primary_diagnosis: String,
    pub summary_text: String,
}

/// Display-ready counts and text for an order.
///
/// `fallback_label` is used as the title when no diagnosis is recorded.
pub fn summarize_order(
    requests: &[OrderRequest],
    diagnoses: &[String],
    fallback_label: &str,
) -> OrderSummary {
    let total_tests = requests.iter().map(|request| request.exams.len()).sum();

    let primary_diagnosis = diagnoses
        .first()
        .cloned()
        .unwrap_or_else(|| fallback_label.to_string());

    // "tests" stays plural for a single exam
    let summary_text = if requests.is_empty() {
        NO_TESTS_SELECTED.to_string()
    } else {
        requests
            .iter()
            .map(|request| format!("{} ({} tests)", request.category, request.exams.len()))
            .collect::<Vec<_>>()
            .join(", ")
    };

    OrderSummary {
        total_tests,
        diagnoses_count: diagnoses.len(),
        primary_diagnosis,
        summary_text,
    }
}
