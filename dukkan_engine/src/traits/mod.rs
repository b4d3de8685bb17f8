//! Behaviour contracts for storage backends.
//!
//! The engine APIs are generic over these traits so that the SQLite backend can be swapped out (or mocked in tests)
//! without touching any call sites.

mod data_objects;
mod ledger_store;
mod notification_store;

pub use data_objects::{NotificationPage, NotificationQuery, PaymentUpsert};
pub use ledger_store::{LedgerError, LedgerStore, ProductCatalog};
pub use notification_store::{NotificationStore, PushTokenStore};
