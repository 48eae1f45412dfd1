// Rust guideline compliant 2026-08-24

//! Concrete adapters for the hexagonal ports.

pub mod in_memory_queue;
pub mod memory_store;
pub mod sqlite_store;
