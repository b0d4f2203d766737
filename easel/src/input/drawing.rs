use super::{invalid_state, InputContext, InputMode, ModeId};
use crate::{
    error::EaselError,
    event::{PointerAction, PointerEvent, PointerId},
    graphics,
    ink::{InProgressStrokeId, InkSurface},
    predict::MotionPredictor,
};

/// Follows a single pointer and feeds it to the ink surface as one stroke.
#[derive(Debug)]
pub struct DrawingMode {
    predictor: MotionPredictor,
    pointer: Option<PointerId>,
    stroke: Option<InProgressStrokeId>,
}

impl DrawingMode {
    pub fn new(predictor: MotionPredictor) -> Self {
        DrawingMode {
            predictor,
            pointer: None,
            stroke: None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    fn check_pointer(&self, event: &PointerEvent) -> Result<PointerId, EaselError> {
        match event.pointer_id(event.action_index) {
            Some(id) if Some(id) == self.pointer => Ok(id),
            _ => Err(invalid_state("event is not from the drawing pointer")),
        }
    }
}

impl<I: InkSurface> InputMode<I> for DrawingMode {
    fn id(&self) -> ModeId {
        ModeId::Drawing
    }

    fn on_enter(
        &mut self,
        event: Option<&PointerEvent>,
        cx: &mut InputContext<'_, I>,
    ) -> Result<(), EaselError> {
        let event = event.ok_or_else(|| invalid_state("drawing starts from a pointer event"))?;
        if event.pointer_count() != 1 {
            return Err(invalid_state("drawing starts with exactly one pointer"));
        }
        if self.pointer.is_some() || self.stroke.is_some() {
            return Err(invalid_state("already drawing"));
        }

        cx.surface.request_unbuffered_dispatch(event);

        let pointer_id = event
            .pointer_id(event.action_index)
            .ok_or_else(|| invalid_state("no pointer at action index"))?;
        let motion_to_world = cx.world_to_screen.inverse();

        // epsilon is in screen terms, so it shrinks as you zoom in
        let scale = graphics::matrix_scale(&motion_to_world);
        let brush = cx.brush.with_epsilon(cx.brush.epsilon * scale);

        let stroke = cx
            .surface
            .start_stroke(event, pointer_id, brush, motion_to_world)?;
        tracing::debug!("drawing {stroke} with pointer {pointer_id} at scale {scale:.03}");

        self.pointer = Some(pointer_id);
        self.stroke = Some(stroke);
        self.predictor.record(event);

        Ok(())
    }

    fn on_exit(&mut self, event: Option<&PointerEvent>, cx: &mut InputContext<'_, I>) {
        if let Some(stroke) = self.stroke.take() {
            cx.surface.cancel_stroke(stroke, event);
        }
        self.pointer = None;
    }

    fn handle(
        &mut self,
        event: &PointerEvent,
        cx: &mut InputContext<'_, I>,
    ) -> Result<Option<ModeId>, EaselError> {
        self.predictor.record(event);

        match event.action {
            PointerAction::PointerDown => {
                // a second finger means the user wants to pan or zoom instead
                if let Some(stroke) = self.stroke.take() {
                    cx.surface.cancel_stroke(stroke, Some(event));
                }
                Ok(Some(ModeId::PinchZoom))
            }

            PointerAction::Move => {
                let (pointer, stroke) = match (self.pointer, self.stroke) {
                    (Some(pointer), Some(stroke)) => (pointer, stroke),
                    _ => return Err(invalid_state("move without a stroke")),
                };

                if event.find_pointer(pointer).is_some() {
                    let prediction = self.predictor.predict();
                    cx.surface
                        .add_to_stroke(event, pointer, stroke, prediction.as_ref())?;
                }

                Ok(None)
            }

            PointerAction::Up => {
                let pointer = self.check_pointer(event)?;
                let stroke = self
                    .stroke
                    .take()
                    .ok_or_else(|| invalid_state("pen-up without a stroke"))?;
                cx.surface.finish_stroke(event, pointer, stroke)?;
                Ok(Some(ModeId::Idle))
            }

            PointerAction::Cancel => {
                self.check_pointer(event)?;
                if let Some(stroke) = self.stroke.take() {
                    cx.surface.cancel_stroke(stroke, Some(event));
                }
                Ok(Some(ModeId::Idle))
            }

            PointerAction::Down | PointerAction::PointerUp => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        event::{Pointer, PointerAction, PointerEvent},
        ink::InkSurface,
        input::{
            test::{one, two, Harness},
            ModeId,
        },
        stroke::Brush,
    };
    use glam::{Affine2, Vec2};

    #[test]
    fn pen_up_commits_stroke() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        assert!(harness.surface.unbuffered());
        harness.send(one(PointerAction::Move, 8, 5., 0.)).unwrap();
        harness.send(one(PointerAction::Move, 16, 10., 0.)).unwrap();
        harness.send(one(PointerAction::Up, 24, 15., 0.)).unwrap();

        assert_eq!(harness.mode(), Some(ModeId::Idle));
        let finished = harness.surface.take_finished_strokes();
        assert_eq!(finished.len(), 1);
        let stroke = finished.values().next().unwrap();
        assert_eq!(stroke.inputs().len(), 4);
    }

    #[test]
    fn cancel_discards_stroke() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        harness.send(one(PointerAction::Move, 8, 5., 0.)).unwrap();
        harness
            .send(one(PointerAction::Cancel, 16, 5., 0.))
            .unwrap();

        assert_eq!(harness.mode(), Some(ModeId::Idle));
        assert!(!harness.surface.is_drawing());
        assert!(harness.surface.take_finished_strokes().is_empty());
    }

    #[test]
    fn samples_land_in_world_space() {
        let mut harness = Harness::new();
        harness.world_to_screen =
            Affine2::from_translation(Vec2::new(100., 0.)) * Affine2::from_scale(Vec2::splat(2.));

        harness
            .send(one(PointerAction::Down, 0, 100., 0.))
            .unwrap();
        harness.send(one(PointerAction::Up, 8, 120., 40.)).unwrap();

        let finished = harness.surface.take_finished_strokes();
        let stroke = finished.values().next().unwrap();
        let inputs = stroke.inputs().inputs();
        assert_eq!((inputs[0].x, inputs[0].y), (0., 0.));
        assert_eq!((inputs[1].x, inputs[1].y), (10., 20.));
        // zoomed in 2x, so the screen epsilon covers half the world distance
        assert!((stroke.brush().epsilon - Brush::default().epsilon / 2.).abs() < 1e-6);
    }

    #[test]
    fn ignores_other_pointers_moving() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        harness
            .send(PointerEvent::new(
                PointerAction::Move,
                8,
                vec![Pointer::new(7, 50., 50.)],
            ))
            .unwrap();
        harness.send(one(PointerAction::Up, 16, 1., 0.)).unwrap();

        let finished = harness.surface.take_finished_strokes();
        let stroke = finished.values().next().unwrap();
        assert!(stroke.inputs().inputs().iter().all(|input| input.x <= 1.));
    }

    #[test]
    fn second_pointer_cancels_and_pinches() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        harness
            .send(two(PointerAction::PointerDown, 8, (0., 0.), (10., 0.)).with_action_index(1))
            .unwrap();

        assert_eq!(harness.mode(), Some(ModeId::PinchZoom));
        assert!(!harness.surface.is_drawing());
        assert!(harness.surface.take_finished_strokes().is_empty());
    }

    #[test]
    fn moves_carry_a_predicted_tail() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        harness.send(one(PointerAction::Move, 8, 10., 0.)).unwrap();

        let (_, stroke) = harness.surface.in_progress().next().unwrap();
        let live = stroke.live_inputs().collect::<Vec<_>>();
        assert_eq!(live.len(), 3);
        // 10 px in 8 ms, predicted 8 ms ahead
        assert!((live[2].x - 20.).abs() < 1e-4);
        assert_eq!(live[2].time_millis, 16);

        harness.send(one(PointerAction::Up, 16, 12., 0.)).unwrap();
        let finished = harness.surface.take_finished_strokes();
        let stroke = finished.values().next().unwrap();
        assert!(stroke.inputs().inputs().iter().all(|input| input.x <= 12.));
    }

    #[test]
    fn unit_length_follows_zoom() {
        let mut harness = Harness::new();
        harness.world_to_screen = Affine2::from_scale(Vec2::splat(2.));

        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        harness.send(one(PointerAction::Up, 8, 40., 0.)).unwrap();

        let finished = harness.surface.take_finished_strokes();
        let stroke = finished.values().next().unwrap();
        // one world unit covers two 160 dpi pixels
        let expected = 2.54 / 160. * 2.;
        assert!((stroke.inputs().stroke_unit_length_cm() - expected).abs() < 1e-6);
        assert!(stroke
            .inputs()
            .inputs()
            .iter()
            .all(|input| (input.stroke_unit_length_cm - expected).abs() < 1e-6));
    }

    #[test]
    fn tap_makes_a_dot() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 5., 5.)).unwrap();
        harness.send(one(PointerAction::Up, 40, 5., 5.)).unwrap();

        let finished = harness.surface.take_finished_strokes();
        let stroke = finished.values().next().unwrap();
        let bounds = stroke.bounds().unwrap();
        assert!(bounds.width() > 0. && bounds.height() > 0.);
        assert!(bounds.left < 5. && bounds.right > 5.);
    }
}
