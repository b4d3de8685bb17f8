//! Helpers for setting up throwaway databases in integration tests.

pub mod prepare_env;

pub use prepare_env::{create_database, prepare_test_env, random_db_path, seed_product};
