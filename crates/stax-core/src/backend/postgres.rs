//! PostgreSQL backend.

use tokio::task::JoinHandle;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Column, NoTls, Row, SimpleQueryMessage};
use tracing::{debug, warn};

use super::{Backend, BoxFuture, Driver};
use crate::error::{BackendError, BackendResult};
use crate::normalize::{RawValue, RowSet};

/// A PostgreSQL database handle.
///
/// `tokio_postgres::Client` pipelines concurrent statements over one
/// connection, so the handle is shared without extra locking.
pub struct PostgresBackend {
    client: Client,
    connection: JoinHandle<()>,
}

impl PostgresBackend {
    /// Connects using a libpq-style connection string or URL.
    pub async fn connect(connstr: &str) -> BackendResult<Self> {
        let (client, connection) = tokio_postgres::connect(connstr, NoTls).await?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection error: {}", e);
            }
        });
        debug!("Connected to PostgreSQL");

        Ok(Self { client, connection })
    }

    /// Runs a statement over the simple query protocol, where the server
    /// renders every cell as text.
    async fn text_rows(&self, sql: &str, names: &[String]) -> BackendResult<Vec<Vec<RawValue>>> {
        let mut out = Vec::new();
        for message in self.client.simple_query(sql).await? {
            let SimpleQueryMessage::Row(row) = message else {
                continue;
            };
            let mut cells = Vec::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                let cell = row.try_get(idx).map_err(|e| BackendError::Decode {
                    column: name.clone(),
                    reason: e.to_string(),
                })?;
                cells.push(cell.map_or(RawValue::Null, |text| RawValue::Text(text.to_string())));
            }
            out.push(cells);
        }
        Ok(out)
    }
}

impl Drop for PostgresBackend {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

impl Backend for PostgresBackend {
    fn driver(&self) -> Driver {
        Driver::Postgres
    }

    fn query<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, BackendResult<RowSet>> {
        Box::pin(async move {
            if self.client.is_closed() {
                return Err(BackendError::Closed);
            }

            let stmt = self.client.prepare(sql).await?;
            let columns = stmt.columns();
            let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

            let rows = if columns.iter().all(|c| natively_mapped(c.type_())) {
                let rows = self.client.query(&stmt, &[]).await?;
                let mut out = Vec::with_capacity(rows.len());
                for row in &rows {
                    out.push(row_values(row, columns)?);
                }
                out
            } else {
                debug!("Falling back to text protocol for: {}", sql);
                self.text_rows(sql, &names).await?
            };

            Ok(RowSet {
                columns: names,
                rows,
            })
        })
    }

    fn ping(&self) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            self.client.simple_query("SELECT 1").await?;
            Ok(())
        })
    }
}

/// Returns true if a column of this type is decoded from the binary
/// protocol. Statements with any other column type are read as text.
fn natively_mapped(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::BYTEA
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::UNKNOWN
    )
}

fn row_values(row: &Row, columns: &[Column]) -> BackendResult<Vec<RawValue>> {
    let mut values = Vec::with_capacity(columns.len());
    for (idx, col) in columns.iter().enumerate() {
        let ty = col.type_();
        let value = match *ty {
            Type::BOOL => row
                .try_get::<_, Option<bool>>(idx)
                .map(|v| v.map(RawValue::Bool)),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .map(|v| v.map(|i| RawValue::Int(i as i64))),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .map(|v| v.map(|i| RawValue::Int(i as i64))),
            Type::INT8 => row
                .try_get::<_, Option<i64>>(idx)
                .map(|v| v.map(RawValue::Int)),
            Type::OID => row
                .try_get::<_, Option<u32>>(idx)
                .map(|v| v.map(|i| RawValue::Int(i as i64))),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(idx)
                .map(|v| v.map(|f| RawValue::Float(f as f64))),
            Type::FLOAT8 => row
                .try_get::<_, Option<f64>>(idx)
                .map(|v| v.map(RawValue::Float)),
            Type::BYTEA => row
                .try_get::<_, Option<Vec<u8>>>(idx)
                .map(|v| v.map(RawValue::Bytes)),
            _ => row
                .try_get::<_, Option<String>>(idx)
                .map(|v| v.map(RawValue::Text)),
        }
        .map_err(|e| BackendError::Decode {
            column: col.name().to_string(),
            reason: format!("{ty}: {e}"),
        })?;
        values.push(value.unwrap_or(RawValue::Null));
    }
    Ok(values)
}
