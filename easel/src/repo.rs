use crate::{
    db::{Database, ElementId, ElementRow, NoteId, STROKE_TYPE},
    element::{CanvasElement, StrokeElement},
    error::{EaselError, EaselErrorExt, ErrorKind},
    graphics, s,
    serialize,
};
use std::sync::mpsc::{Receiver, TryRecvError};

/// Per-note storage of finished canvas elements.
pub trait ElementRepository {
    fn elements_for_note(&mut self, note_id: NoteId) -> Result<Vec<CanvasElement>, EaselError>;

    /// Stores the elements, replacing any with the same id. Returns their ids in order.
    fn insert_all(&mut self, elements: &[CanvasElement]) -> Result<Vec<ElementId>, EaselError>;

    fn update_all(&mut self, elements: &[CanvasElement]) -> Result<(), EaselError>;

    fn delete(&mut self, element: &CanvasElement) -> Result<(), EaselError>;

    /// Deletes every element or none of them.
    fn delete_all(&mut self, elements: &[CanvasElement]) -> Result<(), EaselError>;

    fn delete_all_for_note(&mut self, note_id: NoteId) -> Result<(), EaselError>;
}

pub fn element_to_row(element: &CanvasElement) -> Result<ElementRow, EaselError> {
    match element {
        CanvasElement::Stroke(stroke) => Ok(ElementRow {
            id: stroke.id,
            note_id: stroke.note_id,
            element_type: String::from(STROKE_TYPE),
            transform: graphics::transform_to_string(&stroke.transform),
            data: serialize::serialize_stroke(&stroke.stroke)?,
        }),
    }
}

pub fn row_to_element(row: &ElementRow) -> Result<CanvasElement, EaselError> {
    let transform = graphics::transform_from_str(&row.transform)?;
    match row.element_type.as_str() {
        STROKE_TYPE => Ok(CanvasElement::Stroke(StrokeElement {
            id: row.id,
            note_id: row.note_id,
            transform,
            stroke: serialize::deserialize_stroke(&row.data)?,
        })),
        other => Err(EaselError::new(ErrorKind::UnknownElementType(
            other.to_string(),
        ))),
    }
}

/// Rows that can't be read back are logged and left out.
pub fn decode_rows(rows: &[ElementRow]) -> Vec<CanvasElement> {
    let elements = rows
        .iter()
        .filter_map(|row| match row_to_element(row) {
            Ok(element) => Some(element),
            Err(err) => {
                tracing::warn!(
                    "{}: element {:?}: {}",
                    s!(CouldNotDecodeElement),
                    row.id,
                    err.reasons()
                );
                None
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!("mapped {} rows to {} elements", rows.len(), elements.len());
    elements
}

/// Follows one note's elements as the database changes.
#[derive(Debug)]
pub struct ElementWatch {
    rows: Receiver<Vec<ElementRow>>,
}

impl ElementWatch {
    /// The newest element list sent since the last call, if any.
    pub fn latest(&self) -> Option<Vec<CanvasElement>> {
        let mut latest = None;
        loop {
            match self.rows.try_recv() {
                Ok(rows) => latest = Some(rows),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        latest.map(|rows| decode_rows(&rows))
    }
}

#[derive(Debug)]
pub struct LocalElementRepository {
    db: Database,
}

impl LocalElementRepository {
    pub fn new(db: Database) -> Self {
        LocalElementRepository { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    pub fn watch_note(&mut self, note_id: NoteId) -> Result<ElementWatch, EaselError> {
        Ok(ElementWatch {
            rows: self.db.watch_note_elements(note_id)?,
        })
    }

    fn rows(elements: &[CanvasElement]) -> Result<Vec<ElementRow>, EaselError> {
        elements.iter().map(element_to_row).collect()
    }
}

impl ElementRepository for LocalElementRepository {
    fn elements_for_note(&mut self, note_id: NoteId) -> Result<Vec<CanvasElement>, EaselError> {
        let rows = self
            .db
            .elements_for_note(note_id)
            .problem(s!(CouldNotLoadNote))?;
        Ok(decode_rows(&rows))
    }

    fn insert_all(&mut self, elements: &[CanvasElement]) -> Result<Vec<ElementId>, EaselError> {
        tracing::debug!("inserting {} elements", elements.len());
        let rows = Self::rows(elements)?;
        self.db.insert_all(&rows).problem(s!(CouldNotSaveStrokes))
    }

    fn update_all(&mut self, elements: &[CanvasElement]) -> Result<(), EaselError> {
        let rows = Self::rows(elements)?;
        self.db.update_all(&rows)
    }

    fn delete(&mut self, element: &CanvasElement) -> Result<(), EaselError> {
        self.db.delete(&element_to_row(element)?)
    }

    fn delete_all(&mut self, elements: &[CanvasElement]) -> Result<(), EaselError> {
        let rows = Self::rows(elements)?;
        self.db.delete_all(&rows)
    }

    fn delete_all_for_note(&mut self, note_id: NoteId) -> Result<(), EaselError> {
        self.db.delete_all_for_note(note_id)
    }
}
