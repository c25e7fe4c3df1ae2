use crate::command::{MutationKind, RowMutationCommand};

/// Consecutive inserts of one shape that have not been rendered yet.
///
/// Holds positions into the batch's command list; a group is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingInsertGroup {
    positions: Vec<usize>,
}

impl PendingInsertGroup {
    pub(crate) fn start(position: usize) -> Self {
        Self {
            positions: vec![position],
        }
    }

    pub(crate) fn push(&mut self, position: usize) {
        debug_assert!(
            self.positions.last().is_some_and(|last| *last < position),
            "pending inserts must be appended in command order"
        );
        self.positions.push(position);
    }

    pub(crate) fn first(&self) -> usize {
        self.positions[0]
    }

    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Whether `candidate` can join the group's multi-row statement.
    pub(crate) fn accepts(
        &self,
        commands: &[RowMutationCommand],
        candidate: &RowMutationCommand,
    ) -> bool {
        is_pending_candidate(candidate) && commands[self.first()].has_same_insert_shape(candidate)
    }
}

/// Inserts without a dedicated execution target wait to be coalesced.
pub(crate) fn is_pending_candidate(command: &RowMutationCommand) -> bool {
    command.kind() == MutationKind::Insert && command.procedure().is_none()
}

#[cfg(test)]
mod tests {
    use super::{is_pending_candidate, PendingInsertGroup};
    use crate::command::{ColumnModification, RowMutationCommand, StoredProcedure, TableName};

    fn insert(table: &str) -> RowMutationCommand {
        RowMutationCommand::insert(TableName::new(table), vec![ColumnModification::write("a", 1)])
    }

    #[test]
    fn group_accepts_same_shape_only() {
        let commands = vec![insert("t")];
        let group = PendingInsertGroup::start(0);
        assert!(group.accepts(&commands, &insert("t")));
        assert!(!group.accepts(&commands, &insert("u")));
        assert!(!group.accepts(
            &commands,
            &RowMutationCommand::update(
                TableName::new("t"),
                vec![ColumnModification::key("id", 1), ColumnModification::write("a", 1)],
            )
        ));
    }

    #[test]
    fn procedure_inserts_are_rendered_immediately() {
        assert!(is_pending_candidate(&insert("t")));
        assert!(!is_pending_candidate(
            &insert("t").with_stored_procedure(StoredProcedure::new("insert_t"))
        ));
    }
}
