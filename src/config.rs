//! Runtime configuration (§6). Store connectivity is read from the
//! environment so that the same binary works against a developer's local
//! `mongod` and a CI replica set without a rebuild; everything else is a
//! compile-time default a caller can still override explicitly when
//! constructing a `Connection`.

pub const NAME: &str = "mongo-dbapi";
pub const VERSION: &str = "0.1.0";

pub const LOG_LEVEL: &str = "info";
pub const LOG_PATH: &str = "./logs/mongo-dbapi.log";

/// Env var holding the MongoDB connection string. Falls back to
/// [`DEFAULT_MONGODB_URI`] when unset, which only ever resolves on a
/// developer machine with a local `mongod`.
pub const MONGODB_URI_ENV: &str = "MONGODB_URI";
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";

/// Env var holding the target database name. Falls back to
/// [`DEFAULT_MONGODB_DB`].
pub const MONGODB_DB_ENV: &str = "MONGODB_DB";
pub const DEFAULT_MONGODB_DB: &str = "mongo_dbapi";

pub fn mongodb_uri() -> String {
    std::env::var(MONGODB_URI_ENV).unwrap_or_else(|_| DEFAULT_MONGODB_URI.to_string())
}

pub fn mongodb_db() -> String {
    std::env::var(MONGODB_DB_ENV).unwrap_or_else(|_| DEFAULT_MONGODB_DB.to_string())
}
