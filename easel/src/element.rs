//! Finished drawables on a note, and the observable store that holds the open note's elements.

use crate::{
    db::{ElementId, NoteId},
    error::{EaselError, ErrorKind},
    graphics::Rect,
    repo::ElementRepository,
    stroke::Stroke,
};
use glam::Affine2;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeElement {
    pub id: Option<ElementId>,
    pub note_id: NoteId,
    pub transform: Affine2,
    pub stroke: Stroke,
}

impl StrokeElement {
    pub fn new(note_id: NoteId, stroke: Stroke) -> Self {
        StrokeElement {
            id: None,
            note_id,
            transform: Affine2::IDENTITY,
            stroke,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.stroke
            .bounds()
            .map(|bounds| bounds.transformed(&self.transform))
            .unwrap_or(Rect::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasElement {
    Stroke(StrokeElement),
}

impl CanvasElement {
    pub fn id(&self) -> Option<ElementId> {
        match self {
            CanvasElement::Stroke(stroke) => stroke.id,
        }
    }

    pub fn set_id(&mut self, id: ElementId) {
        match self {
            CanvasElement::Stroke(stroke) => stroke.id = Some(id),
        }
    }

    pub fn note_id(&self) -> NoteId {
        match self {
            CanvasElement::Stroke(stroke) => stroke.note_id,
        }
    }

    pub fn transform(&self) -> &Affine2 {
        match self {
            CanvasElement::Stroke(stroke) => &stroke.transform,
        }
    }

    /// Note-space bounds, `Rect::ZERO` for elements with no geometry.
    pub fn bounds(&self) -> Rect {
        match self {
            CanvasElement::Stroke(stroke) => stroke.bounds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded { note_id: NoteId, count: usize },
    Added(Vec<ElementId>),
    Removed(Vec<ElementId>),
    Cleared(NoteId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddElements(Vec<CanvasElement>),
}

#[derive(Debug)]
pub struct UndoStack {
    buffer: Vec<Action>,
    cursor: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        UndoStack {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn last(&self) -> Option<&Action> {
        if self.cursor == 0 {
            return None;
        }

        self.buffer.get(self.cursor - 1)
    }

    /// The action [UndoStack::redo] would return, without moving the cursor.
    #[must_use]
    pub fn next_redo(&self) -> Option<&Action> {
        self.buffer.get(self.cursor)
    }

    pub fn push(&mut self, action: Action) {
        if self.cursor == self.buffer.len() {
            tracing::debug!("append");
            // [a, b, c, d]
            //           ^ c=4
            // [a, b, c, d, e]
            //              ^ c=5
            self.buffer.push(action);
        } else if 1 <= self.cursor && self.cursor < self.buffer.len() {
            tracing::debug!("split off");
            // [a, b, c, d]
            //        ^ c=3
            // [a, b, e]
            //        ^ c=3
            self.buffer.truncate(self.cursor);
            self.buffer.push(action);
        } else {
            tracing::debug!("replace");
            // [a, b, c, d]
            //  ^ c=0
            // [e]
            //  ^ c=1
            self.buffer = vec![action];
        }

        self.cursor = self.buffer.len();
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.buffer.len()
    }

    #[must_use]
    pub fn undo(&mut self) -> Option<Action> {
        let last = self.last().cloned();
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        last
    }

    #[must_use]
    pub fn redo(&mut self) -> Option<Action> {
        if self.cursor < self.buffer.len() {
            self.cursor += 1;
            self.last().cloned()
        } else {
            None
        }
    }
}

/// The open note's finished elements, kept in step with the repository.
pub struct ElementStore<R: ElementRepository> {
    repo: R,
    note_id: Option<NoteId>,
    elements: Vec<CanvasElement>,
    history: UndoStack,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl<R: ElementRepository> ElementStore<R> {
    pub fn new(repo: R) -> Self {
        ElementStore {
            repo,
            note_id: None,
            elements: Vec::new(),
            history: UndoStack::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn note_id(&self) -> Option<NoteId> {
        self.note_id
    }

    pub fn elements(&self) -> &[CanvasElement] {
        &self.elements
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: StoreEvent) {
        tracing::trace!("{event:?}");
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn open_note_id(&self) -> Result<NoteId, EaselError> {
        self.note_id
            .ok_or_else(|| EaselError::new(ErrorKind::InvalidState("no note is open")))
    }

    pub fn open_note(&mut self, note_id: NoteId) -> Result<(), EaselError> {
        let elements = self.repo.elements_for_note(note_id)?;
        tracing::debug!("opened note {note_id} with {} elements", elements.len());

        self.note_id = Some(note_id);
        self.elements = elements;
        self.history.clear();
        self.notify(StoreEvent::Loaded {
            note_id,
            count: self.elements.len(),
        });

        Ok(())
    }

    /// Commits finished strokes to the open note.
    pub fn add_strokes(
        &mut self,
        strokes: impl IntoIterator<Item = Stroke>,
    ) -> Result<Vec<ElementId>, EaselError> {
        let note_id = self.open_note_id()?;
        let mut elements = strokes
            .into_iter()
            .map(|stroke| CanvasElement::Stroke(StrokeElement::new(note_id, stroke)))
            .collect::<Vec<_>>();

        if elements.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.repo.insert_all(&elements)?;
        for (element, id) in elements.iter_mut().zip(ids.iter()) {
            element.set_id(*id);
        }

        tracing::debug!("added {} strokes to note {note_id}", ids.len());
        self.elements.extend(elements.iter().cloned());
        self.history.push(Action::AddElements(elements));
        self.notify(StoreEvent::Added(ids.clone()));

        Ok(ids)
    }

    /// Union of every element's bounds, or `Rect::ZERO` for an empty note.
    pub fn total_size(&self) -> Rect {
        let mut bounds = self.elements.iter().map(CanvasElement::bounds);
        match bounds.next() {
            Some(first) => bounds.fold(first, |total, rect| total.union(&rect)),
            None => Rect::ZERO,
        }
    }

    pub fn clear_note(&mut self) -> Result<(), EaselError> {
        let note_id = self.open_note_id()?;
        self.repo.delete_all_for_note(note_id)?;

        tracing::debug!("cleared note {note_id}");
        self.elements.clear();
        self.history.clear();
        self.notify(StoreEvent::Cleared(note_id));

        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Returns whether anything was undone. History only moves once the repository agrees.
    pub fn undo(&mut self) -> Result<bool, EaselError> {
        let action = match self.history.last() {
            Some(action) => action.clone(),
            None => return Ok(false),
        };

        match action {
            Action::AddElements(added) => {
                self.repo.delete_all(&added)?;

                let ids = added
                    .iter()
                    .filter_map(CanvasElement::id)
                    .collect::<Vec<_>>();
                self.elements
                    .retain(|element| !element.id().map_or(false, |id| ids.contains(&id)));

                tracing::debug!("undo: removed {} elements", ids.len());
                self.notify(StoreEvent::Removed(ids));
            }
        }

        let _ = self.history.undo();
        Ok(true)
    }

    /// Returns whether anything was redone.
    pub fn redo(&mut self) -> Result<bool, EaselError> {
        let action = match self.history.next_redo() {
            Some(action) => action.clone(),
            None => return Ok(false),
        };

        match action {
            Action::AddElements(added) => {
                // the elements keep their ids, so this puts the same rows back
                let ids = self.repo.insert_all(&added)?;
                self.elements.extend(added);

                tracing::debug!("redo: restored {} elements", ids.len());
                self.notify(StoreEvent::Added(ids));
            }
        }

        let _ = self.history.redo();
        Ok(true)
    }
}
