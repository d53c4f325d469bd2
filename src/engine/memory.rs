use std::collections::HashMap;
use std::time::Instant;

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use tracing::{debug, info};

use super::{EngineOptions, ExportEngine, ResultCursor};
use crate::error::{BenchError, Result};

struct Table {
    schema: SchemaRef,
    fragments: Vec<RecordBatch>,
}

/// Engine that keeps imported tables as in-memory Arrow fragments.
///
/// Understands `DROP TABLE [IF EXISTS] <name>` and
/// `SELECT <col, ...|*> FROM <name>`; keywords are case-insensitive and a
/// trailing `;` is optional.
pub struct MemoryEngine {
    options: EngineOptions,
    tables: HashMap<String, Table>,
}

impl MemoryEngine {
    /// Opens a handle configured by `options`.
    pub fn open(options: EngineOptions) -> Result<Self> {
        if !options.columnar_output {
            return Err(BenchError::engine(
                "memory engine only produces columnar output",
            ));
        }
        if options.default_fragment_size == 0 {
            return Err(BenchError::engine("default fragment size must be positive"));
        }
        info!(
            data_dir = %options.data_dir.display(),
            calcite_port = options.calcite_port,
            lazy_fetch = options.lazy_fetch,
            debug_timer = options.debug_timer,
            "opened memory engine"
        );
        Ok(Self {
            options,
            tables: HashMap::new(),
        })
    }

    /// Options the handle was opened with.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Whether `name` is currently defined.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of fragments stored for `name`.
    pub fn fragment_count(&self, name: &str) -> Option<usize> {
        self.tables.get(name).map(|t| t.fragments.len())
    }
}

fn tokens(sql: &str) -> Vec<&str> {
    sql.trim().trim_end_matches(';').split_whitespace().collect()
}

fn keyword(token: Option<&&str>, expected: &str) -> bool {
    token.is_some_and(|t| t.eq_ignore_ascii_case(expected))
}

impl ExportEngine for MemoryEngine {
    fn import_table(&mut self, name: &str, batch: RecordBatch, fragment_size: usize) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(BenchError::engine(format!("table {name} already exists")));
        }
        let fragment_size = if fragment_size == 0 {
            self.options.default_fragment_size
        } else {
            fragment_size
        };
        let rows = batch.num_rows();
        let fragments: Vec<RecordBatch> = (0..rows)
            .step_by(fragment_size)
            .map(|offset| batch.slice(offset, fragment_size.min(rows - offset)))
            .collect();
        debug!(table = name, rows, fragment_size, fragments = fragments.len(), "imported table");
        self.tables.insert(
            name.to_string(),
            Table {
                schema: batch.schema(),
                fragments,
            },
        );
        Ok(())
    }

    fn execute_ddl(&mut self, sql: &str) -> Result<()> {
        let toks = tokens(sql);
        if !(keyword(toks.first(), "DROP") && keyword(toks.get(1), "TABLE")) {
            return Err(BenchError::engine(format!("unsupported DDL: {sql}")));
        }
        let (if_exists, name) = match toks.as_slice() {
            [_, _, name] => (false, *name),
            [_, _, a, b, name] if a.eq_ignore_ascii_case("IF") && b.eq_ignore_ascii_case("EXISTS") => {
                (true, *name)
            }
            _ => return Err(BenchError::engine(format!("malformed DROP TABLE: {sql}"))),
        };
        match self.tables.remove(name) {
            Some(_) => {
                debug!(table = name, "dropped table");
                Ok(())
            }
            None if if_exists => Ok(()),
            None => Err(BenchError::engine(format!("table {name} does not exist"))),
        }
    }

    fn execute_dml(&self, sql: &str) -> Result<Box<dyn ResultCursor + '_>> {
        let toks = tokens(sql);
        let from = toks.iter().position(|t| t.eq_ignore_ascii_case("FROM"));
        let (columns, name) = match (keyword(toks.first(), "SELECT"), from) {
            (true, Some(from)) if from > 1 && toks.len() == from + 2 => {
                (toks[1..from].join(" "), toks[from + 1])
            }
            _ => return Err(BenchError::engine(format!("unsupported query: {sql}"))),
        };
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| BenchError::engine(format!("table {name} does not exist")))?;

        let projection = if columns.trim() == "*" {
            None
        } else {
            let indices = columns
                .split(',')
                .map(|col| {
                    table
                        .schema
                        .index_of(col.trim())
                        .map_err(|_| BenchError::engine(format!("unknown column {} in {name}", col.trim())))
                })
                .collect::<Result<Vec<_>>>()?;
            Some(indices)
        };
        let schema = match &projection {
            Some(indices) => SchemaRef::new(table.schema.project(indices)?),
            None => table.schema.clone(),
        };

        let source = if self.options.lazy_fetch {
            Source::Lazy {
                fragments: &table.fragments,
                projection,
            }
        } else {
            Source::Eager(project_all(&table.fragments, projection.as_deref())?)
        };
        Ok(Box::new(MemoryCursor {
            schema,
            source,
            debug_timer: self.options.debug_timer,
        }))
    }
}

fn project_all(fragments: &[RecordBatch], projection: Option<&[usize]>) -> Result<Vec<RecordBatch>> {
    match projection {
        Some(indices) => fragments
            .iter()
            .map(|f| f.project(indices).map_err(BenchError::from))
            .collect(),
        None => Ok(fragments.to_vec()),
    }
}

enum Source<'e> {
    Eager(Vec<RecordBatch>),
    Lazy {
        fragments: &'e [RecordBatch],
        projection: Option<Vec<usize>>,
    },
}

struct MemoryCursor<'e> {
    schema: SchemaRef,
    source: Source<'e>,
    debug_timer: bool,
}

impl MemoryCursor<'_> {
    fn batches(&self) -> Result<Vec<RecordBatch>> {
        match &self.source {
            Source::Eager(batches) => Ok(batches.clone()),
            Source::Lazy {
                fragments,
                projection,
            } => project_all(fragments, projection.as_deref()),
        }
    }

    fn timed<T>(&self, label: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let out = f();
        if self.debug_timer {
            debug!(
                elapsed_us = start.elapsed().as_micros() as u64,
                "{label} total duration"
            );
        }
        out
    }
}

impl ResultCursor for MemoryCursor<'_> {
    fn fetch_table(&mut self) -> Result<RecordBatch> {
        self.timed("convert_to_arrow_table", || {
            let batches = self.batches()?;
            Ok(concat_batches(&self.schema, &batches)?)
        })
    }

    fn fetch_record_batches(&mut self) -> Result<Vec<RecordBatch>> {
        self.timed("convert_to_arrow", || self.batches())
    }
}
