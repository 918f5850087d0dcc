//! Pure reconciliation logic

pub mod membership;
