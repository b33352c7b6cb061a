//! In-memory mock driver and shared fixtures for testing `streamql-core`,
//! playing the role `tank-tests` plays for `tank`'s real driver crates.
//!
//! Nothing here talks to a real database: [`MockDriver`] hands out a
//! single [`MockConnection`] whose statements replay a pre-configured
//! sequence of [`MockOutcome`]s, so a test can assert the subscription
//! engine's demand/cancellation/error behavior deterministically.

use futures::stream;
use futures::StreamExt as _;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use streamql_core::{
    ColumnType, Driver, DriverBatch, DriverConnection, DriverResultSet, DriverRow, DriverRowMetadata,
    DriverStatement, Nullability, RenderedQuery, Renderer, Result, StatementBinder, Value,
};

/// One canned result a [`MockStatement`]/[`MockBatch`] execution will
/// emit, standing in for one driver `Result` (spec §3).
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Rows {
        columns: Vec<(&'static str, ColumnType)>,
        rows: Vec<Vec<Value>>,
    },
    RowCount(u64),
}

impl MockOutcome {
    pub fn rows(columns: Vec<(&'static str, ColumnType)>, rows: Vec<Vec<Value>>) -> Self {
        MockOutcome::Rows { columns, rows }
    }
}

#[derive(Debug)]
pub struct MockMetadata {
    columns: Vec<(&'static str, ColumnType)>,
}

impl DriverRowMetadata for MockMetadata {
    fn column_count(&self) -> usize {
        self.columns.len()
    }
    fn column_name(&self, index0: usize) -> &str {
        self.columns[index0].0
    }
    fn precision(&self, _index0: usize) -> Option<u32> {
        None
    }
    fn scale(&self, _index0: usize) -> Option<u32> {
        None
    }
    fn nullability(&self, _index0: usize) -> Nullability {
        Nullability::Unknown
    }
    fn column_type(&self, index0: usize) -> ColumnType {
        self.columns[index0].1.clone()
    }
}

pub struct MockRow(pub Vec<Value>);
impl DriverRow for MockRow {
    fn get(&self, index0: usize) -> Result<Value> {
        Ok(self.0[index0].clone())
    }
}

pub struct MockResultSet {
    outcome: MockOutcome,
}

impl DriverResultSet for MockResultSet {
    type Row = MockRow;
    type Metadata = MockMetadata;

    fn rows_updated(self) -> impl futures::Stream<Item = Result<u64>> + Send {
        match self.outcome {
            MockOutcome::RowCount(n) => stream::once(async move { Ok(n) }).boxed(),
            MockOutcome::Rows { .. } => stream::empty().boxed(),
        }
    }

    fn rows(self) -> impl futures::Stream<Item = Result<(Self::Row, Arc<Self::Metadata>)>> + Send {
        match self.outcome {
            MockOutcome::Rows { columns, rows } => {
                let metadata = Arc::new(MockMetadata { columns });
                stream::iter(rows.into_iter().map(move |row| Ok((MockRow(row), metadata.clone())))).boxed()
            }
            MockOutcome::RowCount(_) => stream::empty().boxed(),
        }
    }
}

/// A prepared statement that ignores the SQL text it was created from and
/// simply replays its pre-configured outcome queue on `execute()`.
pub struct MockStatement {
    bound: Vec<(usize, Value)>,
    nulls: Vec<(usize, ColumnType)>,
    fetch_size: Option<usize>,
    returning: Vec<String>,
    rows_added: usize,
    outcomes: VecDeque<MockOutcome>,
}

impl StatementBinder for MockStatement {
    fn bind(&mut self, index0: usize, value: Value) -> Result<()> {
        self.bound.push((index0, value));
        Ok(())
    }
    fn bind_null(&mut self, index0: usize, ty: ColumnType) -> Result<()> {
        self.nulls.push((index0, ty));
        Ok(())
    }
    fn add(&mut self) -> Result<()> {
        self.rows_added += 1;
        Ok(())
    }
    fn fetch_size(&mut self, size: usize) {
        self.fetch_size = Some(size);
    }
    fn return_generated_values(&mut self, names: &[String]) {
        self.returning = names.to_vec();
    }
}

impl DriverStatement for MockStatement {
    type ResultSet = MockResultSet;

    fn execute(self) -> impl futures::Stream<Item = Result<Self::ResultSet>> + Send {
        stream::iter(
            self.outcomes
                .into_iter()
                .map(|outcome| Ok(MockResultSet { outcome })),
        )
    }
}

pub struct MockBatch {
    statements: Vec<String>,
    outcomes: VecDeque<MockOutcome>,
}

impl DriverBatch for MockBatch {
    type ResultSet = MockResultSet;

    fn add_sql(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        Ok(())
    }

    fn execute(self) -> impl futures::Stream<Item = Result<Self::ResultSet>> + Send {
        stream::iter(
            self.outcomes
                .into_iter()
                .map(|outcome| Ok(MockResultSet { outcome })),
        )
    }
}

#[derive(Clone)]
pub struct MockConnection {
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    pub closed: Arc<std::sync::atomic::AtomicUsize>,
}

impl DriverConnection for MockConnection {
    type Statement = MockStatement;
    type Batch = MockBatch;

    fn create_statement(&mut self, _sql: &str) -> Result<Self::Statement> {
        let outcomes = std::mem::take(&mut *self.outcomes.lock().unwrap());
        Ok(MockStatement {
            bound: Vec::new(),
            nulls: Vec::new(),
            fetch_size: None,
            returning: Vec::new(),
            rows_added: 0,
            outcomes,
        })
    }

    fn create_batch(&mut self) -> Result<Self::Batch> {
        let outcomes = std::mem::take(&mut *self.outcomes.lock().unwrap());
        Ok(MockBatch {
            statements: Vec::new(),
            outcomes,
        })
    }

    fn close(self) -> impl futures::Stream<Item = Result<()>> + Send {
        self.closed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        stream::once(async { Ok(()) })
    }
}

/// Hands out one [`MockConnection`] seeded with `outcomes`, or fails to
/// connect at all if constructed via [`MockDriver::failing`].
pub struct MockDriver {
    outcomes: Vec<MockOutcome>,
    connect_error: Option<String>,
    pub close_count: Arc<std::sync::atomic::AtomicUsize>,
}

impl MockDriver {
    pub fn returning(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes,
            connect_error: None,
            close_count: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcomes: Vec::new(),
            connect_error: Some(message.into()),
            close_count: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    fn connect(&self) -> impl futures::Stream<Item = Result<Self::Connection>> + Send {
        let result = match &self.connect_error {
            Some(message) => Err(streamql_core::Error::msg(message.clone())),
            None => Ok(MockConnection {
                outcomes: Arc::new(Mutex::new(self.outcomes.clone().into())),
                closed: self.close_count.clone(),
            }),
        };
        stream::once(async move { result })
    }
}

/// A query type that carries its own pre-rendered SQL text, paired with
/// [`EchoRenderer`] which renders it verbatim with no bind values — enough
/// for exercising the subscription engine without a real query builder.
#[derive(Debug, Clone)]
pub struct EchoQuery(pub Arc<str>);

impl EchoQuery {
    pub fn new(sql: impl Into<Arc<str>>) -> Self {
        Self(sql.into())
    }
}

pub struct EchoRenderer;

impl Renderer<EchoQuery> for EchoRenderer {
    fn render(&self, _config: &streamql_core::BridgeConfig, query: &EchoQuery) -> Result<RenderedQuery> {
        Ok(RenderedQuery::new(query.0.clone(), Vec::new()))
    }

    fn render_inline(&self, _config: &streamql_core::BridgeConfig, query: &EchoQuery) -> Result<Arc<str>> {
        Ok(query.0.clone())
    }
}

#[cfg(feature = "blocking")]
pub mod blocking {
    use std::collections::VecDeque;
    use streamql_core::{BlockingCursor, BlockingCursorSource, BlockingRowCountSource, Result};

    pub struct VecCursor<T>(pub VecDeque<T>);
    impl<T: Send> BlockingCursor<T> for VecCursor<T> {
        fn fetch_next(&mut self) -> Result<Option<T>> {
            Ok(self.0.pop_front())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    pub struct VecCursorSource<T>(pub Option<Vec<T>>);
    impl<T: Send + 'static> BlockingCursorSource<T> for VecCursorSource<T> {
        fn open(&mut self) -> Result<Box<dyn BlockingCursor<T>>> {
            let items = self.0.take().unwrap_or_default();
            Ok(Box::new(VecCursor(items.into())))
        }
    }

    pub struct FixedRowCount(pub u64);
    impl BlockingRowCountSource for FixedRowCount {
        fn execute(&mut self) -> Result<u64> {
            Ok(self.0)
        }
    }
}
