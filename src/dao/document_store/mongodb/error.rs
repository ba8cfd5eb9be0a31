use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: String,
        index: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to read from collection `{collection}`")]
    Read {
        collection: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to write document `{id}` in collection `{collection}`")]
    Write {
        collection: String,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete document `{id}` from collection `{collection}`")]
    Delete {
        collection: String,
        id: String,
        #[source]
        source: MongoError,
    },
}
