//! Inline field-name editor

use log::debug;

use crate::session::{DocumentSession, RenameError};

#[derive(Clone, Debug, PartialEq, Eq)]
struct EditState {
    field_id: usize,
    buffer: String,
    /// Cursor position in chars
    cursor: usize,
}

/// Edit buffer for one field at a time
#[derive(Clone, Debug, Default)]
pub struct FieldEditor {
    state: Option<EditState>,
}

impl FieldEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `id` with its current name. Read-only records are refused.
    pub fn begin_edit(&mut self, session: &DocumentSession, id: usize) -> bool {
        let Some(record) = session.field(id) else {
            return false;
        };
        if !record.is_editable() {
            debug!("Field #{id} is read-only");
            return false;
        }
        self.state = Some(EditState {
            field_id: id,
            buffer: record.name.clone(),
            cursor: record.name.chars().count(),
        });
        true
    }

    pub fn is_editing(&self) -> bool {
        self.state.is_some()
    }

    pub fn editing_field(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.field_id)
    }

    pub fn buffer(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.buffer.as_str())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.cursor)
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(state) = &mut self.state {
            let at = byte_index(&state.buffer, state.cursor);
            state.buffer.insert(at, c);
            state.cursor += 1;
        }
    }

    pub fn backspace(&mut self) {
        if let Some(state) = &mut self.state {
            if state.cursor == 0 {
                return;
            }
            state.cursor -= 1;
            let at = byte_index(&state.buffer, state.cursor);
            state.buffer.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(state) = &mut self.state {
            state.cursor = state.cursor.saturating_sub(1);
        }
    }

    pub fn move_right(&mut self) {
        if let Some(state) = &mut self.state {
            state.cursor = (state.cursor + 1).min(state.buffer.chars().count());
        }
    }

    /// Rename through the session. On error the edit stays open.
    pub fn commit(&mut self, session: &mut DocumentSession) -> Result<(), RenameError> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        session.rename_field(state.field_id, &state.buffer)?;
        self.state = None;
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.state = None;
    }
}

fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_index_handles_multibyte() {
        assert_eq!(byte_index("aé b", 2), 3);
        assert_eq!(byte_index("ab", 5), 2);
    }

    #[test]
    fn editing_without_state_is_inert() {
        let mut editor = FieldEditor::new();
        editor.insert_char('x');
        editor.backspace();
        assert!(!editor.is_editing());
        assert_eq!(editor.buffer(), None);
    }
}
