use crate::engine::apply_edit::{apply_edit, Direction, EditOutcome, NotebookEdit};
use crate::engine::store::NotebookStore;
use crate::model::error::NotebookError;
use crate::model::notebook::{CellType, Notebook};

/// Runs notebook edits against storage: load, apply in memory, save.
/// Nothing is written when the edit is rejected.
#[derive(Debug, Clone)]
pub struct NotebookEditor {
    store: NotebookStore,
}

impl NotebookEditor {
    pub fn new(store: NotebookStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &NotebookStore {
        &self.store
    }

    pub fn apply(&self, name: &str, edit: NotebookEdit) -> Result<EditOutcome, NotebookError> {
        let kind = edit.short_name();
        let mut notebook = match edit {
            // Clearing never needs the old document, corrupt or not.
            NotebookEdit::ClearAll => {
                self.store.path_for(name)?;
                Notebook::default()
            }
            _ => self.store.load(name)?,
        };

        let outcome = apply_edit(&mut notebook, edit, name)?;
        self.store.save(&notebook, name)?;

        log::info!("{} applied to '{}': {:?}", kind, name, outcome);
        Ok(outcome)
    }

    pub fn create_cell(
        &self,
        name: &str,
        cell_type: CellType,
        content: impl Into<String>,
    ) -> Result<EditOutcome, NotebookError> {
        self.apply(
            name,
            NotebookEdit::CreateCell {
                cell_type,
                content: content.into(),
            },
        )
    }

    pub fn edit_cell(
        &self,
        name: &str,
        index: i64,
        content: impl Into<String>,
    ) -> Result<EditOutcome, NotebookError> {
        self.apply(
            name,
            NotebookEdit::EditCell {
                index,
                content: content.into(),
            },
        )
    }

    pub fn delete_cell(&self, name: &str, index: i64) -> Result<EditOutcome, NotebookError> {
        self.apply(name, NotebookEdit::DeleteCell { index })
    }

    pub fn move_cell(
        &self,
        name: &str,
        index: i64,
        direction: Direction,
        places: i64,
    ) -> Result<EditOutcome, NotebookError> {
        self.apply(
            name,
            NotebookEdit::MoveCell {
                index,
                direction,
                places,
            },
        )
    }

    pub fn clear_all(&self, name: &str) -> Result<EditOutcome, NotebookError> {
        self.apply(name, NotebookEdit::ClearAll)
    }
}
