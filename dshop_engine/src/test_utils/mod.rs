//! Helpers for tests: throwaway SQLite databases, stub collaborators and chain-log fixtures.
pub mod fixtures;
pub mod prepare_env;
pub mod stubs;
