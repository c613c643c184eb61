//! PostgreSQL writer
//!
//! Each table load gets its own `PgConnection`; nothing is pooled or shared
//! between tasks. A flush becomes one transaction holding as many multi-row
//! INSERT statements as the bind-parameter limit requires.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, QueryBuilder};
use tracing::debug;

use crate::coerce::{TypedRow, Value};
use crate::config::DatabaseConfig;
use crate::schema::TableSchema;
use crate::sink::{Connector, RowWriter};

/// Most bind parameters PostgreSQL accepts in one statement
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Rows that fit in one INSERT for `schema`
pub fn rows_per_statement(schema: &TableSchema) -> usize {
    (MAX_BIND_PARAMS / schema.len().max(1)).max(1)
}

/// `INSERT INTO "table" ("c1", "c2", ...) ` with quoted identifiers
///
/// Quoting keeps names like `date` from colliding with SQL keywords.
pub fn insert_prefix(schema: &TableSchema) -> String {
    let columns = schema
        .column_names()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO \"{}\" ({}) ", schema.name, columns)
}

/// Build one multi-row INSERT binding every value of `rows`
pub fn build_insert<'a>(schema: &TableSchema, rows: &'a [TypedRow]) -> QueryBuilder<'a, Postgres> {
    let mut query_builder: QueryBuilder<'a, Postgres> = QueryBuilder::new(insert_prefix(schema));

    query_builder.push_values(rows, |mut b, row| {
        for value in &row.values {
            match value {
                Value::Integer(v) => {
                    b.push_bind(*v);
                }
                Value::Double(v) => {
                    b.push_bind(*v);
                }
                Value::String(v) => {
                    b.push_bind(v.as_str());
                }
            }
        }
    });

    query_builder
}

/// Writes batches over one dedicated connection
pub struct PgRowWriter {
    conn: PgConnection,
}

impl PgRowWriter {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RowWriter for PgRowWriter {
    async fn write_batch(
        &mut self,
        schema: &'static TableSchema,
        rows: &[TypedRow],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.conn.begin().await?;

        for chunk in rows.chunks(rows_per_statement(schema)) {
            build_insert(schema, chunk).build().execute(&mut *tx).await?;
        }

        tx.commit().await
    }
}

/// Opens a fresh connection per table
pub struct PgConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(&config.url)?.application_name("ssb-loader");
        Ok(Self {
            options,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        })
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Writer = PgRowWriter;

    async fn connect(&self, schema: &'static TableSchema) -> Result<PgRowWriter, sqlx::Error> {
        debug!(table = schema.name, "Opening storage session");

        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
        {
            Ok(conn) => conn.map(PgRowWriter::new),
            Err(_) => Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", self.connect_timeout),
            ))),
        }
    }
}
