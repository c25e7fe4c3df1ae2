use async_trait::async_trait;

use crate::batch::ExecutableBatch;
use crate::error::ExecutionError;
use crate::Value;

/// Forward-only reader over the result sets a batch produced.
///
/// A fresh reader is positioned before the first result set; `next_result`
/// must be called to move onto it.
pub trait BatchReader {
    fn next_result(&mut self) -> Result<bool, ExecutionError>;

    /// Next row of the current result set, or `None` once it is exhausted.
    fn read_row(&mut self) -> Result<Option<Vec<Value>>, ExecutionError>;

    fn output_parameter(&self, name: &str) -> Option<Value>;
}

pub trait BatchConnection {
    fn execute_batch<'a>(
        &'a mut self,
        batch: &ExecutableBatch,
    ) -> Result<Box<dyn BatchReader + 'a>, ExecutionError>;
}

#[async_trait(?Send)]
pub trait AsyncBatchReader {
    async fn next_result(&mut self) -> Result<bool, ExecutionError>;

    async fn read_row(&mut self) -> Result<Option<Vec<Value>>, ExecutionError>;

    fn output_parameter(&self, name: &str) -> Option<Value>;
}

#[async_trait(?Send)]
pub trait AsyncBatchConnection {
    async fn execute_batch<'a>(
        &'a mut self,
        batch: &ExecutableBatch,
    ) -> Result<Box<dyn AsyncBatchReader + 'a>, ExecutionError>;
}
