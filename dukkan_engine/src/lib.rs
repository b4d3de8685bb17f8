//! Dukkan Order Engine
//!
//! The engine holds the core logic of the Dukkan order-fulfillment backend: the cart/order ledger, the payment intake
//! state machine, and the notification fan-out. It is HTTP-agnostic; the server crate wires these APIs to routes.
//!
//! The crate is divided into three main sections:
//! 1. Database management ([`mod@sqlite`]). Low-level access lives in plain functions that take a
//!    `&mut SqliteConnection`, so callers can compose them inside a single transaction. You should never need to
//!    access the database directly; use the public APIs instead. The exception is the record types, which are defined
//!    in [`db_types`] and are public.
//! 2. The public engine API ([`mod@api`]): [`OrderLedgerApi`] for cart mutations and checkout, [`PaymentIntakeApi`]
//!    for the three payment-evidence entry points, and [`Notifier`] for the multi-channel fan-out. Backends implement
//!    the traits in [`traits`] to act as a store for these APIs.
//! 3. The live event bus ([`mod@events`]): an in-process publish/subscribe registry feeding long-lived client
//!    streams. Every persisted notification is also published on the bus.

pub mod api;
pub mod db_types;
pub mod events;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub mod test_utils;
pub mod traits;

pub use api::{
    notifier::{ChannelError, NotificationChannel, Notifier},
    order_ledger_api::OrderLedgerApi,
    payment_intake_api::{parse_order_reference, PaymentIntakeApi},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db_url, SqliteDatabase};
pub use traits::{LedgerError, LedgerStore, NotificationStore, PaymentUpsert, ProductCatalog, PushTokenStore};
