use std::fmt;
use std::str::FromStr;

use crate::model::error::NotebookError;
use crate::model::notebook::{Cell, CellType, Notebook, NBFORMAT_MINOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = NotebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(NotebookError::InvalidArgument(
                "Invalid direction. Must be \"up\" or \"down\"".to_string(),
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// A single cell-level mutation. Indices are signed so out-of-range requests
/// (including negative ones) reach the bounds check instead of failing to parse.
#[derive(Debug, Clone, PartialEq)]
pub enum NotebookEdit {
    CreateCell {
        cell_type: CellType,
        content: String,
    },
    EditCell {
        index: i64,
        content: String,
    },
    DeleteCell {
        index: i64,
    },
    MoveCell {
        index: i64,
        direction: Direction,
        places: i64,
    },
    ClearAll,
}

impl NotebookEdit {
    pub fn short_name(&self) -> &'static str {
        match self {
            NotebookEdit::CreateCell { .. } => "create_cell",
            NotebookEdit::EditCell { .. } => "edit_cell",
            NotebookEdit::DeleteCell { .. } => "delete_cell",
            NotebookEdit::MoveCell { .. } => "move_cell",
            NotebookEdit::ClearAll => "clear_all",
        }
    }
}

/// Authoritative result of an applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Created { total_cells: usize },
    Edited { index: usize, total_cells: usize },
    Deleted { index: usize, total_cells: usize },
    Moved { from: usize, to: usize, direction: Direction },
    Cleared,
}

impl EditOutcome {
    pub fn message(&self, notebook: &str) -> String {
        match self {
            EditOutcome::Created { .. } => {
                format!("Cell created successfully in {}", notebook)
            }
            EditOutcome::Edited { index, .. } => {
                format!("Cell {} in {} edited successfully", index, notebook)
            }
            EditOutcome::Deleted { index, .. } => {
                format!("Cell {} deleted from {}", index, notebook)
            }
            EditOutcome::Moved {
                from,
                to,
                direction,
            } => format!("Cell {} moved {} to position {}", from, direction, to),
            EditOutcome::Cleared => {
                format!("All cells cleared successfully from {}", notebook)
            }
        }
    }
}

fn checked_index(notebook: &Notebook, index: i64, name: &str) -> Result<usize, NotebookError> {
    match usize::try_from(index) {
        Ok(i) if i < notebook.len() => Ok(i),
        _ => Err(NotebookError::IndexOutOfRange {
            index,
            len: notebook.len(),
            notebook: name.to_string(),
        }),
    }
}

/// Apply `edit` to `notebook` in place. On error the notebook is untouched.
pub fn apply_edit(
    notebook: &mut Notebook,
    edit: NotebookEdit,
    name: &str,
) -> Result<EditOutcome, NotebookError> {
    match edit {
        NotebookEdit::CreateCell { cell_type, content } => {
            // New cells carry ids, which the schema only allows from 4.5 on.
            notebook.nbformat_minor = notebook.nbformat_minor.max(NBFORMAT_MINOR);
            notebook.cells.push(Cell::new(cell_type, content));
            Ok(EditOutcome::Created {
                total_cells: notebook.len(),
            })
        }

        NotebookEdit::EditCell { index, content } => {
            let index = checked_index(notebook, index, name)?;
            notebook.cells[index].set_source(content);
            Ok(EditOutcome::Edited {
                index,
                total_cells: notebook.len(),
            })
        }

        NotebookEdit::DeleteCell { index } => {
            let index = checked_index(notebook, index, name)?;
            notebook.cells.remove(index);
            Ok(EditOutcome::Deleted {
                index,
                total_cells: notebook.len(),
            })
        }

        NotebookEdit::MoveCell {
            index,
            direction,
            places,
        } => {
            let from = checked_index(notebook, index, name)?;
            if places < 1 {
                return Err(NotebookError::InvalidArgument(
                    "Places must be a positive integer".to_string(),
                ));
            }
            let places = usize::try_from(places).unwrap_or(usize::MAX);

            let cell = notebook.cells.remove(from);
            // Overshoot pins the cell to the first or last position.
            let to = match direction {
                Direction::Up => from.saturating_sub(places),
                Direction::Down => from.saturating_add(places).min(notebook.len()),
            };
            notebook.cells.insert(to, cell);

            Ok(EditOutcome::Moved {
                from,
                to,
                direction,
            })
        }

        NotebookEdit::ClearAll => {
            *notebook = Notebook::default();
            Ok(EditOutcome::Cleared)
        }
    }
}
