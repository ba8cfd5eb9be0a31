/// Collection-style document storage and its backends.
pub mod document_store;
/// Persisted entity definitions.
pub mod models;
/// Storage error types shared by every backend.
pub mod storage;
