use crate::sql::credentials::Credentials;
use crate::sql::statement::{InsertStatement, SqlValue};
use log::debug;
use sqlx::postgres::{PgArguments, PgConnection, Postgres};
use sqlx::query::Query;
use sqlx::Connection;

/// SQLSTATE classes worth another attempt later: connection exception,
/// transaction rollback, insufficient resources, operator intervention.
const RETRYABLE_SQLSTATE_CLASSES: [&str; 4] = ["08", "40", "53", "57"];

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("database unavailable, the insert can be retried: {0}")]
    Retryable(#[source] sqlx::Error),
    #[error("database rejected the insert: {0}")]
    Fatal(#[source] sqlx::Error),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Retryable(_))
    }
}

impl From<sqlx::Error> for SubmitError {
    fn from(e: sqlx::Error) -> Self {
        if is_transient(&e) {
            SubmitError::Retryable(e)
        } else {
            SubmitError::Fatal(e)
        }
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| {
            RETRYABLE_SQLSTATE_CLASSES
                .iter()
                .any(|class| code.starts_with(class))
        }),
        _ => false,
    }
}

/// Insert the row in its own transaction. Returns the number of rows written.
pub async fn submit(
    credentials: &Credentials,
    statement: &InsertStatement,
) -> Result<u64, SubmitError> {
    debug!("connecting to {:?}", credentials);
    let mut conn = PgConnection::connect_with(&credentials.connect_options()).await?;

    let sql = statement.sql();
    let query = statement
        .values
        .iter()
        .fold(sqlx::query(&sql), |query, value| bind(query, value));

    let mut tx = conn.begin().await?;
    let result = query.execute(&mut *tx).await?;
    tx.commit().await?;
    conn.close().await?;

    Ok(result.rows_affected())
}

fn bind<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::NullableBool(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}
