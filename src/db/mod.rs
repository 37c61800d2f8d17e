use crate::models::{
    BypassStat, CountryStat, DeviceStat, FetchClick, FetchPartner, FetchUrl, FetchUrlWithPartner,
    NewPartner, NewUrl, UrlChanges,
};
use async_trait::async_trait;
use diesel::result::DatabaseErrorKind;
use thiserror::Error;

mod postgres;

pub use postgres::PostgresDb;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    General(String),
    #[error("Duplicate Id Error")]
    DuplicateId,
    #[error("Unknown partner")]
    UnknownPartner,
}

impl From<diesel::result::Error> for DbError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                DbError::DuplicateId
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                DbError::UnknownPartner
            }
            _ => DbError::General(e.to_string()),
        }
    }
}

impl From<deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>> for DbError {
    fn from(e: deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>) -> Self {
        DbError::General(e.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinksDB: Send + Sync {
    /// All urls with their partner, newest first.
    async fn list_urls(&self) -> Result<Vec<FetchUrlWithPartner>, DbError>;
    async fn url_exists(&self, code: &str) -> Result<bool, DbError>;
    async fn create_url(&self, url: &NewUrl) -> Result<FetchUrl, DbError>;
    /// `None` if no row has `code`.
    async fn update_url(&self, code: &str, changes: &UrlChanges)
    -> Result<Option<FetchUrl>, DbError>;
    /// Returns the number of deleted rows.
    async fn delete_url(&self, code: &str) -> Result<usize, DbError>;

    async fn list_partners(&self) -> Result<Vec<FetchPartner>, DbError>;
    async fn create_partner(&self, partner: &NewPartner) -> Result<FetchPartner, DbError>;

    /// The stored redirect counter, `None` for an unknown code.
    async fn click_total(&self, code: &str) -> Result<Option<i32>, DbError>;
    async fn top_countries(&self, code: &str, limit: i64) -> Result<Vec<CountryStat>, DbError>;
    async fn devices(&self, code: &str) -> Result<Vec<DeviceStat>, DbError>;
    async fn recent_clicks(&self, code: &str, limit: i64) -> Result<Vec<FetchClick>, DbError>;
    async fn bypass_attempts(&self, code: &str) -> Result<BypassStat, DbError>;
}
