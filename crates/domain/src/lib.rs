//! Encounter Domain Models

/// Shared dose and order calculators
pub mod calculators;

/// Drafting capability
pub mod drafting;

/// Prescription aggregate
pub mod prescriptions;

/// Lab/imaging order aggregate
pub mod orders;

/// In-memory session store
pub mod store;

/// Domain errors
pub mod errors;

pub use errors::Error;
