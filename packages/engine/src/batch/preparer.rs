use std::mem;

use crate::command::RowMutationCommand;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::sql::{OutputClauseSqlGenerator, StatementGenerator};

use super::builder::{BatchAssembler, ModificationBatch, TryAdd};

/// Splits a stream of commands into finalized batches, in order.
///
/// Every batch but the last is completed with `more_batches_expected` set, so
/// the executor knows to hold one transaction across all of them.
#[derive(Debug, Clone)]
pub struct BatchPreparer<G = OutputClauseSqlGenerator> {
    generator: G,
    config: BatchConfig,
}

impl Default for BatchPreparer<OutputClauseSqlGenerator> {
    fn default() -> Self {
        Self::new(OutputClauseSqlGenerator::new(), BatchConfig::default())
    }
}

impl<G: StatementGenerator + Clone> BatchPreparer<G> {
    pub fn new(generator: G, config: BatchConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn prepare(
        &self,
        commands: impl IntoIterator<Item = RowMutationCommand>,
    ) -> Result<Vec<ModificationBatch<G>>, BatchError> {
        let mut batches = Vec::new();
        let mut current = self.start_batch();

        for command in commands {
            let TryAdd::Full(command) = current.try_add(command)? else {
                continue;
            };
            if !current.commands().is_empty() {
                current.complete(true)?;
                batches.push(mem::replace(&mut current, self.start_batch()));
                tracing::debug!(batches = batches.len(), "closed full modification batch");
            }
            // A command that does not fit an empty batch still gets one.
            if let TryAdd::Full(command) = current.try_add(command)? {
                current.add(command)?;
            }
        }

        if !current.commands().is_empty() {
            current.complete(false)?;
            batches.push(current);
        }
        Ok(batches)
    }

    fn start_batch(&self) -> ModificationBatch<G> {
        ModificationBatch::with_generator(self.generator.clone(), self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::BatchPreparer;
    use crate::batch::BatchAssembler;
    use crate::command::{ColumnModification, RowMutationCommand, TableName};
    use crate::config::BatchConfig;
    use crate::sql::OutputClauseSqlGenerator;

    fn insert(value: i64) -> RowMutationCommand {
        RowMutationCommand::insert(
            TableName::new("t"),
            vec![
                ColumnModification::write("a", value),
                ColumnModification::write("b", value),
            ],
        )
    }

    fn preparer(config: BatchConfig) -> BatchPreparer {
        BatchPreparer::new(OutputClauseSqlGenerator::new(), config)
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let batches = BatchPreparer::default()
            .prepare(Vec::new())
            .expect("prepare should succeed");
        assert!(batches.is_empty());
    }

    #[test]
    fn splits_on_batch_size_and_flags_all_but_last() {
        let config = BatchConfig {
            max_batch_size: 2,
            ..BatchConfig::default()
        };
        let batches = preparer(config)
            .prepare((0..5).map(insert))
            .expect("prepare should succeed");

        let sizes: Vec<_> = batches.iter().map(|batch| batch.commands().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let more: Vec<_> = batches
            .iter()
            .map(|batch| batch.executable().map(|executable| executable.more_batches_expected))
            .collect();
        assert_eq!(more, vec![Some(true), Some(true), Some(false)]);
        assert!(batches.iter().all(|batch| batch.is_finalized()));
    }

    #[test]
    fn splits_on_parameter_ceiling() {
        // two parameters per command, ceiling of five
        let config = BatchConfig {
            max_parameter_count: 7,
            ..BatchConfig::default()
        };
        let batches = preparer(config)
            .prepare((0..5).map(insert))
            .expect("prepare should succeed");

        let sizes: Vec<_> = batches.iter().map(|batch| batch.commands().len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let second = batches[1].executable().expect("batch should be finalized");
        assert_eq!(second.parameters[0].name, "@p0");
    }

    #[test]
    fn oversized_command_still_forms_its_own_batch() {
        let config = BatchConfig {
            max_parameter_count: 3,
            reserved_parameter_slots: 2,
            ..BatchConfig::default()
        };
        let batches = preparer(config)
            .prepare((0..2).map(insert))
            .expect("prepare should succeed");

        let sizes: Vec<_> = batches.iter().map(|batch| batch.commands().len()).collect();
        assert_eq!(sizes, vec![1, 1]);
    }
}
