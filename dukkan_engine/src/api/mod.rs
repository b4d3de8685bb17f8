//! The public engine APIs. Thin, validated facades over a storage backend implementing the [`crate::traits`]
//! contracts.

pub mod notifier;
pub mod order_ledger_api;
pub mod payment_intake_api;
