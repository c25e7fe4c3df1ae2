use std::mem;

use futures_util::future::{AbortRegistration, Abortable};

use crate::backend::{AsyncBatchConnection, BatchConnection};
use crate::command::{RowMutationCommand, TypeMapping};
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::reconcile;
use crate::sql::{
    GeneratedStatements, OutputClauseSqlGenerator, ResultSetMapping, StatementGenerator,
    STATEMENT_COUNT_PARAMETER,
};
use crate::Value;

use super::executable::ExecutableBatch;
use super::params::{
    assign_parameter_names, bind_column_parameters, bind_key_condition_parameters,
    clear_parameter_names, BoundParameter, ParameterDirection, ParameterNameGenerator,
};
use super::pending::{is_pending_candidate, PendingInsertGroup};

#[derive(Debug)]
pub enum TryAdd {
    Added,
    /// The batch cannot take the command; it is handed back unchanged.
    Full(RowMutationCommand),
}

impl TryAdd {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Assembles row mutation commands into one executable batch.
pub trait BatchAssembler {
    fn try_add(&mut self, command: RowMutationCommand) -> Result<TryAdd, BatchError>;

    /// Adds without checking the batch limits.
    fn add(&mut self, command: RowMutationCommand) -> Result<(), BatchError>;

    /// Undoes the most recent add.
    fn rollback_last_command(&mut self) -> Result<Option<RowMutationCommand>, BatchError>;

    fn complete(&mut self, more_batches_expected: bool) -> Result<&ExecutableBatch, BatchError>;

    fn commands(&self) -> &[RowMutationCommand];

    fn is_finalized(&self) -> bool;
}

#[derive(Debug)]
enum BatchState {
    Idle,
    Accumulating(Accumulation),
    Finalized(ExecutableBatch),
}

#[derive(Debug, Default)]
struct Accumulation {
    sql: String,
    names: ParameterNameGenerator,
    result_set_mappings: Vec<ResultSetMapping>,
    statement_count: usize,
    pending: Option<PendingInsertGroup>,
    checkpoint: Option<Checkpoint>,
}

/// Accumulation state from just before the most recent add.
#[derive(Debug, Clone)]
struct Checkpoint {
    sql_len: usize,
    names: ParameterNameGenerator,
    result_set_mapping_count: usize,
    statement_count: usize,
    pending: Option<PendingInsertGroup>,
    command_count: usize,
}

impl Accumulation {
    fn checkpoint(&self, command_count: usize) -> Checkpoint {
        Checkpoint {
            sql_len: self.sql.len(),
            names: self.names,
            result_set_mapping_count: self.result_set_mappings.len(),
            statement_count: self.statement_count,
            pending: self.pending.clone(),
            command_count,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.sql.truncate(checkpoint.sql_len);
        self.names = checkpoint.names;
        self.result_set_mappings
            .truncate(checkpoint.result_set_mapping_count);
        self.statement_count = checkpoint.statement_count;
        self.pending = checkpoint.pending;
        self.checkpoint = None;
    }

    fn absorb(&mut self, generated: GeneratedStatements) {
        self.result_set_mappings
            .extend(generated.result_set_mappings);
        self.statement_count += generated.statement_count;
    }

    fn flush_pending<G: StatementGenerator>(
        &mut self,
        generator: &G,
        commands: &[RowMutationCommand],
    ) {
        let Some(group) = self.pending.take() else {
            return;
        };
        let members: Vec<&RowMutationCommand> = group
            .positions()
            .iter()
            .map(|position| &commands[*position])
            .collect();
        let generated = generator.append_bulk_insert_operation(&mut self.sql, &members);
        self.absorb(generated);
    }

    fn is_valid(&self, config: &BatchConfig, commands: &[RowMutationCommand]) -> bool {
        if self.names.issued() > config.parameter_ceiling() {
            return false;
        }
        let mut sql_length = self.sql.len();
        if let Some(group) = &self.pending {
            let column_count = commands[group.first()].columns().len();
            sql_length += config
                .bulk_insert_estimate
                .pending_insert_length(column_count, group.len());
        }
        sql_length < config.max_script_length
    }
}

/// A single-use batch: `Idle`, then `Accumulating` while commands are added,
/// then `Finalized` by [`BatchAssembler::complete`].
#[derive(Debug)]
pub struct ModificationBatch<G = OutputClauseSqlGenerator> {
    generator: G,
    config: BatchConfig,
    commands: Vec<RowMutationCommand>,
    state: BatchState,
}

impl ModificationBatch<OutputClauseSqlGenerator> {
    pub fn new(config: BatchConfig) -> Self {
        Self::with_generator(OutputClauseSqlGenerator::new(), config)
    }
}

impl<G: StatementGenerator> ModificationBatch<G> {
    pub fn with_generator(generator: G, config: BatchConfig) -> Self {
        Self {
            generator,
            config,
            commands: Vec::new(),
            state: BatchState::Idle,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn parameter_count(&self) -> usize {
        match &self.state {
            BatchState::Idle => 0,
            BatchState::Accumulating(accumulation) => accumulation.names.issued(),
            BatchState::Finalized(executable) => executable.parameters.len(),
        }
    }

    pub fn executable(&self) -> Option<&ExecutableBatch> {
        match &self.state {
            BatchState::Finalized(executable) => Some(executable),
            BatchState::Idle | BatchState::Accumulating(_) => None,
        }
    }

    pub fn into_commands(self) -> Vec<RowMutationCommand> {
        self.commands
    }

    fn push_command(&mut self, mut command: RowMutationCommand) -> Result<(), BatchError> {
        if matches!(self.state, BatchState::Finalized(_)) {
            return Err(BatchError::AlreadyFinalized);
        }
        if let Some(reason) = command.rendering_defect() {
            return Err(BatchError::InvalidCommand {
                table: command.table().to_string(),
                reason,
            });
        }
        let key_condition_columns = self.generator.key_condition_columns(&command);
        let command_count = self.commands.len();
        let Self {
            generator,
            commands,
            state,
            ..
        } = self;
        if matches!(state, BatchState::Idle) {
            *state = BatchState::Accumulating(Accumulation::default());
        }
        let BatchState::Accumulating(accumulation) = state else {
            return Err(BatchError::AlreadyFinalized);
        };
        accumulation.checkpoint = Some(accumulation.checkpoint(command_count));

        let incompatible = accumulation
            .pending
            .as_ref()
            .is_some_and(|group| !group.accepts(commands, &command));
        if incompatible {
            accumulation.flush_pending(generator, commands);
        }

        assign_parameter_names(&mut command, &key_condition_columns, &mut accumulation.names);
        let position = commands.len();
        commands.push(command);

        if is_pending_candidate(&commands[position]) {
            match &mut accumulation.pending {
                Some(group) => group.push(position),
                None => accumulation.pending = Some(PendingInsertGroup::start(position)),
            }
        } else {
            let generated = generator.append_command(&mut accumulation.sql, &commands[position]);
            accumulation.absorb(generated);
        }
        Ok(())
    }

    /// Undoes the latest add and hands the command back.
    fn undo_last_add(&mut self) -> Option<RowMutationCommand> {
        let BatchState::Accumulating(accumulation) = &mut self.state else {
            return None;
        };
        let checkpoint = accumulation.checkpoint.take()?;
        let command_count = checkpoint.command_count;
        accumulation.restore(checkpoint);

        if self.commands.len() <= command_count {
            return None;
        }
        let mut command = self.commands.pop()?;
        clear_parameter_names(&mut command);
        if self.commands.is_empty() {
            self.state = BatchState::Idle;
        }
        Some(command)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(commands = self.commands.len()))]
    pub fn execute(&mut self, connection: &mut dyn BatchConnection) -> Result<(), BatchError> {
        let Self {
            state, commands, ..
        } = self;
        let BatchState::Finalized(executable) = state else {
            return Err(BatchError::NotFinalized);
        };
        let mut reader = connection
            .execute_batch(executable)
            .map_err(|error| reconcile::classify_failure(error, None, commands))?;
        reconcile::consume(commands, &executable.result_set_mappings, reader.as_mut())
    }

    /// Mirrors [`ModificationBatch::execute`]. Aborting `abort`'s handle ends
    /// the round trip at its next suspension point with
    /// [`BatchError::Cancelled`].
    #[tracing::instrument(level = "debug", skip_all, fields(commands = self.commands.len()))]
    pub async fn execute_async(
        &mut self,
        connection: &mut dyn AsyncBatchConnection,
        abort: Option<AbortRegistration>,
    ) -> Result<(), BatchError> {
        let Self {
            state, commands, ..
        } = self;
        let BatchState::Finalized(executable) = state else {
            return Err(BatchError::NotFinalized);
        };
        let round_trip = async {
            let mut reader = connection
                .execute_batch(executable)
                .await
                .map_err(|error| reconcile::classify_failure(error, None, commands))?;
            reconcile::consume_async(commands, &executable.result_set_mappings, reader.as_mut())
                .await
        };
        match abort {
            Some(registration) => Abortable::new(round_trip, registration)
                .await
                .unwrap_or(Err(BatchError::Cancelled)),
            None => round_trip.await,
        }
    }
}

impl<G: StatementGenerator> BatchAssembler for ModificationBatch<G> {
    fn try_add(&mut self, command: RowMutationCommand) -> Result<TryAdd, BatchError> {
        if self.is_finalized() {
            return Err(BatchError::AlreadyFinalized);
        }
        if self.commands.len() >= self.config.max_batch_size {
            return Ok(TryAdd::Full(command));
        }

        self.push_command(command)?;

        let valid = match &self.state {
            BatchState::Accumulating(accumulation) => {
                accumulation.is_valid(&self.config, &self.commands)
            }
            BatchState::Idle | BatchState::Finalized(_) => true,
        };
        if valid {
            return Ok(TryAdd::Added);
        }
        Ok(self.undo_last_add().map_or(TryAdd::Added, TryAdd::Full))
    }

    fn add(&mut self, command: RowMutationCommand) -> Result<(), BatchError> {
        self.push_command(command)
    }

    fn rollback_last_command(&mut self) -> Result<Option<RowMutationCommand>, BatchError> {
        if matches!(self.state, BatchState::Finalized(_)) {
            return Err(BatchError::AlreadyFinalized);
        }
        Ok(self.undo_last_add())
    }

    fn complete(&mut self, more_batches_expected: bool) -> Result<&ExecutableBatch, BatchError> {
        let mut accumulation = match mem::replace(&mut self.state, BatchState::Idle) {
            BatchState::Idle => Accumulation::default(),
            BatchState::Accumulating(accumulation) => accumulation,
            finalized @ BatchState::Finalized(_) => {
                self.state = finalized;
                return Err(BatchError::AlreadyFinalized);
            }
        };
        accumulation.flush_pending(&self.generator, &self.commands);
        debug_assert_eq!(
            accumulation.result_set_mappings.len(),
            self.commands.len(),
            "every command needs exactly one result set mapping"
        );

        let requires_transaction = accumulation.statement_count > 1;
        let command_text = self
            .generator
            .render_command_text(&accumulation.sql, requires_transaction);

        let mut parameters = Vec::with_capacity(accumulation.names.issued() + 1);
        for command in &self.commands {
            bind_column_parameters(command, &mut parameters);
        }
        for command in &self.commands {
            bind_key_condition_parameters(command, &mut parameters);
        }
        parameters.push(BoundParameter {
            name: STATEMENT_COUNT_PARAMETER.to_string(),
            value: Value::Integer(i64::try_from(accumulation.statement_count).unwrap_or(i64::MAX)),
            type_mapping: TypeMapping::new("int"),
            direction: ParameterDirection::Input,
        });

        tracing::debug!(
            commands = self.commands.len(),
            parameters = parameters.len(),
            statements = accumulation.statement_count,
            requires_transaction,
            more_batches_expected,
            "finalized modification batch"
        );
        tracing::trace!(sql = %command_text, "modification batch command text");

        self.state = BatchState::Finalized(ExecutableBatch {
            command_text,
            parameters,
            result_set_mappings: accumulation.result_set_mappings,
            statement_count: accumulation.statement_count,
            requires_transaction,
            more_batches_expected,
        });
        self.executable().ok_or(BatchError::NotFinalized)
    }

    fn commands(&self) -> &[RowMutationCommand] {
        &self.commands
    }

    fn is_finalized(&self) -> bool {
        matches!(self.state, BatchState::Finalized(_))
    }
}
