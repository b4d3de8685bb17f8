//! Endpoint tests running the real routing table against scratch SQLite databases.

mod helpers;
mod orders;
mod payments;
