use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Dosing frequency recognised from a frequency label.
///
/// Matching is a case-sensitive substring search. When a label carries
/// more than one code the first rule in [`Frequency::PRECEDENCE`] wins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Frequency {
    /// `qod`, every other day
    EveryOtherDay,
    /// `q6h`
    Every6Hours,
    /// `q8h`
    Every8Hours,
    /// `q12h`
    Every12Hours,
    /// No recognised code
    Daily,
}

impl Frequency {
    pub const PRECEDENCE: [Frequency; 4] = [
        Frequency::EveryOtherDay,
        Frequency::Every6Hours,
        Frequency::Every8Hours,
        Frequency::Every12Hours,
    ];

    pub fn code(&self) -> Option<&'static str> {
        match self {
            Frequency::EveryOtherDay => Some("qod"),
            Frequency::Every6Hours => Some("q6h"),
            Frequency::Every8Hours => Some("q8h"),
            Frequency::Every12Hours => Some("q12h"),
            Frequency::Daily => None,
        }
    }

    pub fn doses_per_day(&self) -> f64 {
        match self {
            Frequency::EveryOtherDay => 0.5,
            Frequency::Every6Hours => 4.0,
            Frequency::Every8Hours => 3.0,
            Frequency::Every12Hours => 2.0,
            Frequency::Daily => 1.0,
        }
    }

    pub fn from_label(label: &str) -> Self {
        Self::PRECEDENCE
            .into_iter()
            .find(|rule| rule.code().is_some_and(|code| label.contains(code)))
            .unwrap_or(Frequency::Daily)
    }
}

pub fn doses_per_day(frequency: &str) -> f64 {
    Frequency::from_label(frequency).doses_per_day()
}

/// Total quantity to dispense: `ceil(quantity_per_dose * doses/day * days)`.
///
/// Negative, NaN and infinite inputs count as zero, so the result is
/// always a non-negative integer. Totals beyond `u64::MAX` saturate.
pub fn compute_total_quantity(quantity_per_dose: f64, frequency: &str, duration_days: f64) -> u64 {
    let quantity = sanitize(quantity_per_dose);
    let days = sanitize(duration_days);

    let total = (quantity * doses_per_day(frequency) * days).ceil();
    if total.is_nan() || total <= 0.0 {
        0
    } else {
        total as u64
    }
}

/// Lenient numeric coercion for form input.
///
/// Numbers and numeric strings pass through, anything else is 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    sanitize(amount)
}

/// Deserializes a possibly-empty amount without ever rejecting the payload.
///
/// `null`, `""` and unparseable values become `None`.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let amount = match &value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::Number(_) => Some(coerce_amount(&value)),
        Value::String(text) => text.trim().parse::<f64>().ok().map(sanitize),
        _ => None,
    };
    Ok(amount)
}

fn sanitize(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn q12h_doubles_daily_amount() {
        for (quantity, days) in [(1.0, 10.0), (2.5, 3.0), (0.5, 7.0), (3.0, 0.5)] {
            assert_eq!(
                compute_total_quantity(quantity, "q12h", days),
                (quantity * 2.0 * days).ceil() as u64
            );
        }
    }

    #[test]
    fn readable_label_without_code_is_daily() {
        assert_eq!(compute_total_quantity(1.0, "every 12 hours", 10.0), 10);
    }

    #[test]
    fn amoxicillin_q8h_for_ten_days() {
        assert_eq!(compute_total_quantity(875.0, "q8h", 10.0), 26250);
    }

    #[test]
    fn zero_quantity_or_duration_is_zero() {
        assert_eq!(compute_total_quantity(0.0, "q6h", 5.0), 0);
        assert_eq!(compute_total_quantity(5.0, "q6h", 0.0), 0);
    }

    #[test]
    fn invalid_numbers_clamp_to_zero() {
        assert_eq!(compute_total_quantity(-2.0, "q6h", 5.0), 0);
        assert_eq!(compute_total_quantity(f64::NAN, "q6h", 5.0), 0);
        assert_eq!(compute_total_quantity(2.0, "q6h", f64::INFINITY), 0);
    }

    #[test]
    fn oversized_totals_saturate() {
        assert_eq!(compute_total_quantity(1e20, "daily", 1.0), u64::MAX);
        assert_eq!(compute_total_quantity(1e300, "q6h", 1e10), u64::MAX);
        assert_eq!(compute_total_quantity(f64::MAX, "q12h", f64::MAX), u64::MAX);
    }

    #[test]
    fn every_other_day_rounds_up() {
        assert_eq!(compute_total_quantity(1.0, "qod", 5.0), 3);
        assert_eq!(compute_total_quantity(1.0, "1 tab qod", 4.0), 2);
    }

    #[test]
    fn frequency_codes_inside_labels() {
        assert_eq!(doses_per_day("q6h (every 6 hours)"), 4.0);
        assert_eq!(doses_per_day("q8h (every 8 hours)"), 3.0);
        assert_eq!(doses_per_day("q12h (every 12 hours)"), 2.0);
        assert_eq!(doses_per_day("daily"), 1.0);
        assert_eq!(doses_per_day(""), 1.0);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(Frequency::from_label("Q12H"), Frequency::Daily);
        assert_eq!(Frequency::from_label("QOD"), Frequency::Daily);
    }

    #[test]
    fn earlier_rule_wins_when_several_codes_match() {
        assert_eq!(Frequency::from_label("q12h or qod"), Frequency::EveryOtherDay);
        assert_eq!(Frequency::from_label("q8h then q6h"), Frequency::Every6Hours);
        assert_eq!(Frequency::from_label("q12h/q8h"), Frequency::Every8Hours);
        assert_eq!(compute_total_quantity(1.0, "q12h qod", 10.0), 5);
    }

    #[test]
    fn repeated_calls_agree() {
        let first = compute_total_quantity(1.5, "q8h", 7.0);
        let second = compute_total_quantity(1.5, "q8h", 7.0);
        assert_eq!(first, second);
        assert_eq!(first, 32);
    }

    #[test]
    fn coerce_amount_accepts_form_values() {
        assert_eq!(coerce_amount(&json!(2)), 2.0);
        assert_eq!(coerce_amount(&json!(" 1.5 ")), 1.5);
        assert_eq!(coerce_amount(&json!("")), 0.0);
        assert_eq!(coerce_amount(&json!("two")), 0.0);
        assert_eq!(coerce_amount(&json!(null)), 0.0);
        assert_eq!(coerce_amount(&json!(-4)), 0.0);
        assert_eq!(coerce_amount(&json!([1])), 0.0);
    }

    #[test]
    fn deserialize_amount_never_rejects() {
        #[derive(Deserialize)]
        struct Form {
            #[serde(deserialize_with = "deserialize_amount")]
            amount: Option<f64>,
        }

        let parse = |body: Value| serde_json::from_value::<Form>(body).unwrap().amount;

        assert_eq!(parse(json!({ "amount": 10 })), Some(10.0));
        assert_eq!(parse(json!({ "amount": "7" })), Some(7.0));
        assert_eq!(parse(json!({ "amount": "" })), None);
        assert_eq!(parse(json!({ "amount": null })), None);
        assert_eq!(parse(json!({ "amount": "abc" })), None);
        assert_eq!(parse(json!({ "amount": { "x": 1 } })), None);
    }
}
