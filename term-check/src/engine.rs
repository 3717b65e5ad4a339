//! DataFusion execution for SQL transforms and the `describe` check.
//!
//! Checks are synchronous, DataFusion is not. [`SqlEngine`] owns a lazily
//! built current-thread Tokio runtime and blocks on it. Inside a
//! multi-threaded runtime it uses `block_in_place` on the caller's handle
//! instead; inside a current-thread runtime it moves the query to a scoped
//! thread.

use crate::data::{Data, Series};
use crate::error::{CheckError, Result};
use crate::logging::truncate_field;
use crate::security::SqlSecurity;
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SQLOptions;
use datafusion::prelude::*;
use once_cell::sync::{Lazy, OnceCell};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::{debug, instrument};

/// Name under which the input is registered for queries.
pub const TABLE_NAME: &str = "data";

static ENGINE: Lazy<SqlEngine> = Lazy::new(SqlEngine::new);

/// Runs read-only SQL over in-memory data.
#[derive(Default)]
pub struct SqlEngine {
    runtime: OnceCell<Runtime>,
}

impl std::fmt::Debug for SqlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlEngine")
            .field("runtime_started", &self.runtime.get().is_some())
            .finish()
    }
}

impl SqlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine shared by SQL transforms.
    pub fn global() -> &'static SqlEngine {
        &ENGINE
    }

    fn runtime(&self) -> Result<&Runtime> {
        self.runtime.get_or_try_init(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(CheckError::from)
        })
    }

    fn block_on<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send,
        F::Output: Send,
    {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| handle.block_on(future)))
            }
            Ok(_) => {
                let runtime = self.runtime()?;
                std::thread::scope(|scope| {
                    scope
                        .spawn(move || runtime.block_on(future))
                        .join()
                        .map_err(|_| CheckError::Internal("SQL worker thread panicked".to_string()))
                })
            }
            Err(_) => Ok(self.runtime()?.block_on(future)),
        }
    }

    fn context(batch: RecordBatch) -> Result<SessionContext> {
        let ctx = SessionContext::new();
        let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        ctx.register_table(TABLE_NAME, Arc::new(table))?;
        Ok(ctx)
    }

    /// Runs `sql` against `data`, registered as table `data`.
    ///
    /// A series is registered as a one-column table named after the series.
    /// When the input is a series and the result has one column, the result
    /// is a series too.
    #[instrument(skip(self, data, sql), fields(
        sql.query = %truncate_field(sql, 200),
        data.rows = data.num_rows()
    ))]
    pub fn query(&self, data: &Data, sql: &str) -> Result<Data> {
        SqlSecurity::validate_query(sql)?;
        let batch = data.to_table()?;
        let sql = sql.to_string();

        let result = self.block_on(async move {
            let ctx = Self::context(batch)?;
            let options = SQLOptions::new()
                .with_allow_ddl(false)
                .with_allow_dml(false)
                .with_allow_statements(false);
            let df = ctx.sql_with_options(&sql, options).await?;
            let schema = Arc::clone(df.schema().inner());
            let batches = df.collect().await?;
            let schema = batches.first().map(RecordBatch::schema).unwrap_or(schema);
            Ok::<_, CheckError>(concat_batches(&schema, &batches)?)
        })??;

        debug!(
            result.rows = result.num_rows(),
            result.columns = result.num_columns(),
            "SQL transform finished"
        );
        match data {
            Data::Series(_) if result.num_columns() == 1 => {
                let field = result.schema().field(0).clone();
                Ok(Data::Series(Series::new(
                    field.name().clone(),
                    Arc::clone(result.column(0)),
                )))
            }
            _ => Ok(Data::Table(result)),
        }
    }

    /// Keeps the rows for which `predicate` holds.
    pub fn filter(&self, data: &Data, predicate: &str) -> Result<Data> {
        SqlSecurity::validate_predicate(predicate)?;
        self.query(data, &format!("SELECT * FROM {TABLE_NAME} WHERE {predicate}"))
    }

    /// Summary statistics per column: count, null_count, mean, std, min,
    /// max and median, one row each, labelled in a leading `describe` column.
    #[instrument(skip(self, data), fields(data.rows = data.num_rows()))]
    pub fn describe(&self, data: &Data) -> Result<RecordBatch> {
        let batch = data.to_table()?;
        self.block_on(async move {
            let ctx = Self::context(batch)?;
            let df = ctx.table(TABLE_NAME).await?.describe().await?;
            let schema = Arc::clone(df.schema().inner());
            let batches = df.collect().await?;
            let schema = batches.first().map(RecordBatch::schema).unwrap_or(schema);
            Ok::<_, CheckError>(concat_batches(&schema, &batches)?)
        })?
    }
}
