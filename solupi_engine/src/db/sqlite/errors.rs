use thiserror::Error;

use crate::{db::traits::StoreError, db_types::ReferenceCode};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Reference code {0} is already attached to another order")]
    DuplicateReference(ReferenceCode),
}

impl From<SqliteDatabaseError> for StoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateReference(r) => StoreError::DuplicateReference(r),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
