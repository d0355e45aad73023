//! Derived values shared by every prescription and order consumer.
//!
//! Views and API responses call into these functions instead of carrying
//! their own copy of the arithmetic.

/// Dispensed quantity for a prescription
pub mod dose;

/// Counts and summary text for lab/imaging orders
pub mod orders;

pub use dose::{coerce_amount, compute_total_quantity, doses_per_day, Frequency};
pub use orders::{summarize_order, OrderRequest, OrderSummary, NO_TESTS_SELECTED};
