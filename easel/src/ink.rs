//! The low-latency surface strokes are drawn on before they are committed.
//!
//! A surface receives raw pointer events for one pointer per stroke, maps them into note space
//! and keeps the live geometry until the stroke is finished or cancelled. Finished strokes wait
//! on the surface until their owner takes them.

use crate::{
    error::{EaselError, ErrorKind},
    event::{PointerEvent, PointerId, ToolType},
    graphics::{self, StrokePos},
    stroke::{Brush, Stroke, StrokeInput, StrokeInputBatch},
};
use glam::{Affine2, Vec2};
use indexmap::IndexMap;

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
pub struct InProgressStrokeId(u64);

impl std::fmt::Display for InProgressStrokeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stroke#{}", self.0)
    }
}

pub trait InkSurface {
    /// Ask for pointer events as soon as they arrive instead of once per frame.
    fn request_unbuffered_dispatch(&mut self, event: &PointerEvent);

    fn start_stroke(
        &mut self,
        event: &PointerEvent,
        pointer_id: PointerId,
        brush: Brush,
        motion_to_world: Affine2,
    ) -> Result<InProgressStrokeId, EaselError>;

    fn add_to_stroke(
        &mut self,
        event: &PointerEvent,
        pointer_id: PointerId,
        stroke_id: InProgressStrokeId,
        prediction: Option<&PointerEvent>,
    ) -> Result<(), EaselError>;

    fn finish_stroke(
        &mut self,
        event: &PointerEvent,
        pointer_id: PointerId,
        stroke_id: InProgressStrokeId,
    ) -> Result<(), EaselError>;

    fn cancel_stroke(&mut self, stroke_id: InProgressStrokeId, event: Option<&PointerEvent>);

    /// Hands over every finished stroke and forgets about them.
    fn take_finished_strokes(&mut self) -> IndexMap<InProgressStrokeId, Stroke>;
}

#[derive(Debug)]
pub struct InProgressStroke {
    pointer_id: PointerId,
    brush: Brush,
    motion_to_world: Affine2,
    stroke_unit_length_cm: f32,
    start_time: i64,
    inputs: StrokeInputBatch,
    predicted: Vec<StrokeInput>,
    pending: Option<StrokeInput>,
}

impl InProgressStroke {
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Committed inputs followed by the predicted tail.
    pub fn live_inputs(&self) -> impl Iterator<Item = &StrokeInput> + '_ {
        self.inputs
            .inputs()
            .iter()
            .chain(self.pending.iter())
            .chain(self.predicted.iter())
    }

    fn to_input(&self, event: &PointerEvent, pointer_id: PointerId) -> Option<StrokeInput> {
        let pointer = event.find_pointer(pointer_id)?;
        let world = self
            .motion_to_world
            .transform_point2(Vec2::from(pointer.location));

        Some(StrokeInput {
            x: world.x,
            y: world.y,
            time_millis: (event.time_millis - self.start_time).max(0),
            pressure: pointer.pressure,
            tilt_radians: pointer.tilt,
            orientation_radians: pointer.orientation,
            stroke_unit_length_cm: self.stroke_unit_length_cm,
        })
    }

    fn tool_type(&self, event: &PointerEvent) -> ToolType {
        event
            .find_pointer(self.pointer_id)
            .map(|pointer| pointer.tool)
            .unwrap_or_default()
    }

    /// Keeps the sample only once it is at least epsilon away from the last kept one. The most
    /// recent rejected sample is held so finishing can still land exactly on the pen-up point.
    fn push(&mut self, tool: ToolType, input: StrokeInput) -> Result<(), EaselError> {
        let far_enough = match self.inputs.last() {
            Some(last) => {
                Vec2::from(StrokePos::from(last)).distance(Vec2::from(StrokePos::from(input)))
                    >= self.brush.epsilon
            }
            None => true,
        };

        if far_enough {
            self.pending = None;
            self.inputs.push(tool, input)
        } else {
            self.pending = Some(input);
            Ok(())
        }
    }

    fn finish(mut self) -> Result<Stroke, EaselError> {
        if let Some(pending) = self.pending.take() {
            let tool = self.inputs.tool_type();
            self.inputs.push(tool, pending)?;
        }

        Ok(Stroke::new(self.brush, self.inputs))
    }
}

/// Default [InkSurface]: keeps live strokes in memory for a renderer to draw.
#[derive(Debug)]
pub struct InProgressStrokes {
    next_id: u64,
    dpi: f32,
    unbuffered: bool,
    strokes: IndexMap<InProgressStrokeId, InProgressStroke>,
    finished: IndexMap<InProgressStrokeId, Stroke>,
}

impl InProgressStrokes {
    pub fn new(dpi: f32) -> Self {
        InProgressStrokes {
            next_id: 0,
            dpi,
            unbuffered: false,
            strokes: IndexMap::new(),
            finished: IndexMap::new(),
        }
    }

    pub fn in_progress(&self) -> impl Iterator<Item = (&InProgressStrokeId, &InProgressStroke)> {
        self.strokes.iter()
    }

    pub fn is_drawing(&self) -> bool {
        !self.strokes.is_empty()
    }

    pub fn unbuffered(&self) -> bool {
        self.unbuffered
    }

    fn stroke_mut(
        &mut self,
        stroke_id: InProgressStrokeId,
    ) -> Result<&mut InProgressStroke, EaselError> {
        self.strokes
            .get_mut(&stroke_id)
            .ok_or_else(|| EaselError::new(ErrorKind::NoSuchStroke))
    }
}

impl InkSurface for InProgressStrokes {
    fn request_unbuffered_dispatch(&mut self, _: &PointerEvent) {
        self.unbuffered = true;
    }

    fn start_stroke(
        &mut self,
        event: &PointerEvent,
        pointer_id: PointerId,
        brush: Brush,
        motion_to_world: Affine2,
    ) -> Result<InProgressStrokeId, EaselError> {
        let pointer = event
            .find_pointer(pointer_id)
            .ok_or_else(|| EaselError::new(ErrorKind::InvalidInput("pointer not in event")))?;

        // one device pixel in centimeters, in stroke units
        let stroke_unit_length_cm = 2.54 / self.dpi / graphics::matrix_scale(&motion_to_world);

        let mut stroke = InProgressStroke {
            pointer_id,
            brush,
            motion_to_world,
            stroke_unit_length_cm,
            start_time: event.time_millis,
            inputs: StrokeInputBatch::new(pointer.tool, stroke_unit_length_cm),
            predicted: Vec::new(),
            pending: None,
        };

        if let Some(input) = stroke.to_input(event, pointer_id) {
            stroke.push(pointer.tool, input)?;
        }

        let id = InProgressStrokeId(self.next_id);
        self.next_id += 1;
        tracing::debug!("start {id} for pointer {pointer_id}");
        self.strokes.insert(id, stroke);

        Ok(id)
    }

    fn add_to_stroke(
        &mut self,
        event: &PointerEvent,
        pointer_id: PointerId,
        stroke_id: InProgressStrokeId,
        prediction: Option<&PointerEvent>,
    ) -> Result<(), EaselError> {
        let stroke = self.stroke_mut(stroke_id)?;
        if stroke.pointer_id != pointer_id {
            return Err(EaselError::new(ErrorKind::InvalidInput(
                "pointer does not own this stroke",
            )));
        }

        let tool = stroke.tool_type(event);
        if let Some(input) = stroke.to_input(event, pointer_id) {
            stroke.push(tool, input)?;
        }

        stroke.predicted = prediction
            .and_then(|prediction| stroke.to_input(prediction, pointer_id))
            .into_iter()
            .collect();

        Ok(())
    }

    fn finish_stroke(
        &mut self,
        event: &PointerEvent,
        pointer_id: PointerId,
        stroke_id: InProgressStrokeId,
    ) -> Result<(), EaselError> {
        let stroke = self.stroke_mut(stroke_id)?;
        if stroke.pointer_id != pointer_id {
            return Err(EaselError::new(ErrorKind::InvalidInput(
                "pointer does not own this stroke",
            )));
        }

        let tool = stroke.tool_type(event);
        if let Some(input) = stroke.to_input(event, pointer_id) {
            stroke.push(tool, input)?;
        }
        stroke.predicted.clear();

        let stroke = self
            .strokes
            .shift_remove(&stroke_id)
            .ok_or_else(|| EaselError::new(ErrorKind::NoSuchStroke))?;
        let stroke = stroke.finish()?;

        tracing::debug!("finish {stroke_id}: {} inputs", stroke.inputs().len());
        self.finished.insert(stroke_id, stroke);
        self.unbuffered = self.is_drawing();

        Ok(())
    }

    fn cancel_stroke(&mut self, stroke_id: InProgressStrokeId, _: Option<&PointerEvent>) {
        if self.strokes.shift_remove(&stroke_id).is_some() {
            tracing::debug!("cancel {stroke_id}");
        }
        self.unbuffered = self.is_drawing();
    }

    fn take_finished_strokes(&mut self) -> IndexMap<InProgressStrokeId, Stroke> {
        std::mem::take(&mut self.finished)
    }
}
