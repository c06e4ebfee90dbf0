//! Operations on a canvas's note list that keep ids and z-indexes unique.

use std::collections::HashSet;

use super::{entity::Note, error::NoteListError};

/// Next free note id: one past the current maximum, or 1 for an empty canvas.
///
/// Saturates at `i64::MAX`.
pub fn next_note_id(notes: &[Note]) -> i64 {
    notes.iter().map(|n| n.id).max().unwrap_or(0).saturating_add(1)
}

/// Next z-index that stacks above every existing note. Saturates at `i64::MAX`.
pub fn next_z_index(notes: &[Note]) -> i64 {
    notes
        .iter()
        .map(|n| n.z_index)
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

/// Raise a note above all others.
///
/// Returns the z-index it was given.
pub fn bring_to_front(notes: &mut [Note], note_id: i64) -> Result<i64, NoteListError> {
    let z_index = next_z_index(notes);
    let note = notes
        .iter_mut()
        .find(|n| n.id == note_id)
        .ok_or(NoteListError::NoteNotFound(note_id))?;
    note.z_index = z_index;
    Ok(z_index)
}

/// Check that ids and z-indexes are each unique.
pub fn validate_note_list(notes: &[Note]) -> Result<(), NoteListError> {
    let mut ids = HashSet::with_capacity(notes.len());
    let mut z_indexes = HashSet::with_capacity(notes.len());
    for note in notes {
        if !ids.insert(note.id) {
            return Err(NoteListError::DuplicateId(note.id));
        }
        if !z_indexes.insert(note.z_index) {
            return Err(NoteListError::DuplicateZIndex(note.z_index));
        }
    }
    Ok(())
}
