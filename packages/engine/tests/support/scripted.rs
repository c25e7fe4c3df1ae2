#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;

use async_trait::async_trait;
use dml_batch_engine::{
    AsyncBatchConnection, AsyncBatchReader, BatchConnection, BatchError, BatchReader,
    ExecutableBatch, ExecutionError, ModificationBatch, Value,
};

pub fn block_on<F: Future<Output = ()>>(future: F) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");
    runtime.block_on(future);
}

/// Which execution path a generated test drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sync,
    Async,
}

impl ExecutionMode {
    pub async fn execute(
        self,
        batch: &mut ModificationBatch,
        connection: &mut ScriptedConnection,
    ) -> Result<(), BatchError> {
        match self {
            Self::Sync => batch.execute(connection),
            Self::Async => batch.execute_async(connection, None).await,
        }
    }
}

/// What the store answers to the next executed batch.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub result_sets: Vec<Vec<Vec<Value>>>,
    pub output_parameters: BTreeMap<String, Value>,
    pub execute_error: Option<ExecutionError>,
    /// Fails the n-th call to `next_result` (zero based).
    pub next_result_error: Option<(usize, ExecutionError)>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_set(mut self, rows: Vec<Vec<Value>>) -> Self {
        self.result_sets.push(rows);
        self
    }

    pub fn row(self, values: Vec<Value>) -> Self {
        self.result_set(vec![values])
    }

    pub fn empty_result_set(self) -> Self {
        self.result_set(Vec::new())
    }

    pub fn output(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.output_parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn fail_execute(mut self, error: ExecutionError) -> Self {
        self.execute_error = Some(error);
        self
    }

    pub fn fail_next_result(mut self, call: usize, error: ExecutionError) -> Self {
        self.next_result_error = Some((call, error));
        self
    }
}

/// In-memory connection that records executed batches and replays a
/// [`Script`].
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    script: Script,
    pub executed: Vec<ExecutableBatch>,
}

impl ScriptedConnection {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            executed: Vec::new(),
        }
    }

    fn open_reader(&mut self, batch: &ExecutableBatch) -> Result<ScriptedReader, ExecutionError> {
        self.executed.push(batch.clone());
        if let Some(error) = self.script.execute_error.clone() {
            return Err(error);
        }
        Ok(ScriptedReader {
            result_sets: self
                .script
                .result_sets
                .iter()
                .cloned()
                .map(VecDeque::from)
                .collect(),
            current: None,
            next_result_calls: 0,
            next_result_error: self.script.next_result_error.clone(),
            output_parameters: self.script.output_parameters.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedReader {
    result_sets: VecDeque<VecDeque<Vec<Value>>>,
    current: Option<VecDeque<Vec<Value>>>,
    next_result_calls: usize,
    next_result_error: Option<(usize, ExecutionError)>,
    output_parameters: BTreeMap<String, Value>,
}

impl ScriptedReader {
    fn advance(&mut self) -> Result<bool, ExecutionError> {
        let call = self.next_result_calls;
        self.next_result_calls += 1;
        if let Some((failing_call, error)) = &self.next_result_error {
            if *failing_call == call {
                return Err(error.clone());
            }
        }
        self.current = self.result_sets.pop_front();
        Ok(self.current.is_some())
    }

    fn next_row(&mut self) -> Option<Vec<Value>> {
        self.current.as_mut().and_then(VecDeque::pop_front)
    }
}

impl BatchReader for ScriptedReader {
    fn next_result(&mut self) -> Result<bool, ExecutionError> {
        self.advance()
    }

    fn read_row(&mut self) -> Result<Option<Vec<Value>>, ExecutionError> {
        Ok(self.next_row())
    }

    fn output_parameter(&self, name: &str) -> Option<Value> {
        self.output_parameters.get(name).cloned()
    }
}

#[async_trait(?Send)]
impl AsyncBatchReader for ScriptedReader {
    async fn next_result(&mut self) -> Result<bool, ExecutionError> {
        tokio::task::yield_now().await;
        self.advance()
    }

    async fn read_row(&mut self) -> Result<Option<Vec<Value>>, ExecutionError> {
        Ok(self.next_row())
    }

    fn output_parameter(&self, name: &str) -> Option<Value> {
        self.output_parameters.get(name).cloned()
    }
}

impl BatchConnection for ScriptedConnection {
    fn execute_batch<'a>(
        &'a mut self,
        batch: &ExecutableBatch,
    ) -> Result<Box<dyn BatchReader + 'a>, ExecutionError> {
        Ok(Box::new(self.open_reader(batch)?))
    }
}

#[async_trait(?Send)]
impl AsyncBatchConnection for ScriptedConnection {
    async fn execute_batch<'a>(
        &'a mut self,
        batch: &ExecutableBatch,
    ) -> Result<Box<dyn AsyncBatchReader + 'a>, ExecutionError> {
        Ok(Box::new(self.open_reader(batch)?))
    }
}

/// Connection whose round trip never finishes on its own.
#[derive(Debug, Default)]
pub struct StalledConnection;

#[async_trait(?Send)]
impl AsyncBatchConnection for StalledConnection {
    async fn execute_batch<'a>(
        &'a mut self,
        _batch: &ExecutableBatch,
    ) -> Result<Box<dyn AsyncBatchReader + 'a>, ExecutionError> {
        std::future::pending().await
    }
}
