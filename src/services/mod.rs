/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Match lifecycle operations over the document store.
pub mod match_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;
