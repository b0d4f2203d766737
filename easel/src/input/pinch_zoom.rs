use super::{invalid_state, InputContext, InputMode, ModeId};
use crate::{
    error::EaselError,
    event::{PointerAction, PointerEvent},
    graphics::PixelPos,
    ink::InkSurface,
};
use glam::{Affine2, Vec2};

/// Two-finger pan and zoom. Every move reports the change since the previous move.
#[derive(Default, Debug, Clone, Copy)]
pub struct PinchZoomMode {
    previous_center: PixelPos,
    previous_distance: f32,
}

impl PinchZoomMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn center_and_distance(event: &PointerEvent) -> Option<(PixelPos, f32)> {
        let a = event.pointer(0)?.location;
        let b = event.pointer(1)?.location;
        Some((a.midpoint(b), a.distance(b)))
    }

    fn update_previous(&mut self, event: &PointerEvent) {
        if let Some((center, distance)) = Self::center_and_distance(event) {
            self.previous_center = center;
            self.previous_distance = distance;
        }
    }

    /// Translation by the centroid's movement, then scaling about the previous centroid.
    fn delta(&self, center: PixelPos, scale: f32) -> Affine2 {
        let pivot = Vec2::from(self.previous_center);
        let translate = Affine2::from_translation(Vec2::from(center) - pivot);
        let zoom = Affine2::from_translation(pivot)
            * Affine2::from_scale(Vec2::splat(scale))
            * Affine2::from_translation(-pivot);
        zoom * translate
    }
}

impl<I: InkSurface> InputMode<I> for PinchZoomMode {
    fn id(&self) -> ModeId {
        ModeId::PinchZoom
    }

    fn on_enter(
        &mut self,
        event: Option<&PointerEvent>,
        _: &mut InputContext<'_, I>,
    ) -> Result<(), EaselError> {
        let event = event.ok_or_else(|| invalid_state("pinch starts from a pointer event"))?;
        if event.pointer_count() != 2 {
            return Err(invalid_state("pinch needs exactly two pointers"));
        }

        self.update_previous(event);
        Ok(())
    }

    fn handle(
        &mut self,
        event: &PointerEvent,
        cx: &mut InputContext<'_, I>,
    ) -> Result<Option<ModeId>, EaselError> {
        match event.action {
            PointerAction::Move => {
                let (center, distance) = match Self::center_and_distance(event) {
                    Some(pair) if event.pointer_count() == 2 => pair,
                    _ => return Ok(Some(ModeId::Idle)),
                };

                let scale = if self.previous_distance > 0. {
                    distance / self.previous_distance
                } else {
                    1.
                };
                let scale = cx.clamp_scale_factor(scale);

                cx.report_transform(&self.delta(center, scale));
                self.update_previous(event);
                Ok(None)
            }

            PointerAction::Up | PointerAction::PointerUp | PointerAction::Cancel => {
                Ok(Some(ModeId::Idle))
            }

            PointerAction::Down | PointerAction::PointerDown => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        graphics,
        input::test::{one, two, Harness},
    };

    fn pinching() -> Harness {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        harness
            .send(two(PointerAction::PointerDown, 8, (0., 0.), (100., 0.)).with_action_index(1))
            .unwrap();
        assert_eq!(harness.mode(), Some(ModeId::PinchZoom));
        harness
    }

    #[test]
    fn spreading_zooms_about_the_centroid() {
        let mut harness = pinching();
        harness
            .send(two(PointerAction::Move, 16, (-50., 0.), (150., 0.)))
            .unwrap();

        assert!((graphics::matrix_scale(&harness.world_to_screen) - 2.).abs() < 1e-5);
        // the centroid stays put on screen
        let center = harness
            .world_to_screen
            .transform_point2(Vec2::new(50., 0.));
        assert!((center - Vec2::new(50., 0.)).length() < 1e-4);
    }

    #[test]
    fn deltas_accumulate() {
        let mut harness = pinching();
        harness
            .send(two(PointerAction::Move, 16, (10., 5.), (110., 5.)))
            .unwrap();
        harness
            .send(two(PointerAction::Move, 24, (20., 10.), (120., 10.)))
            .unwrap();

        assert_eq!(harness.world_to_screen.translation, Vec2::new(20., 10.));
        assert_eq!(graphics::matrix_scale(&harness.world_to_screen), 1.);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut harness = pinching();
        harness
            .send(two(PointerAction::Move, 16, (49.9, 0.), (50.1, 0.)))
            .unwrap();
        assert!((graphics::matrix_scale(&harness.world_to_screen) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn lifting_a_finger_ends_the_pinch() {
        let mut harness = pinching();
        harness
            .send(two(PointerAction::PointerUp, 16, (0., 0.), (100., 0.)).with_action_index(1))
            .unwrap();
        assert_eq!(harness.mode(), Some(ModeId::Idle));
    }

    #[test]
    fn needs_two_pointers() {
        let mut harness = Harness::new();
        harness.send(one(PointerAction::Down, 0, 0., 0.)).unwrap();
        let three = PointerEvent::new(
            PointerAction::PointerDown,
            8,
            vec![
                crate::event::Pointer::new(0, 0., 0.),
                crate::event::Pointer::new(1, 10., 0.),
                crate::event::Pointer::new(2, 20., 0.),
            ],
        );

        assert!(harness.send(three).is_err());
        assert_eq!(harness.mode(), Some(ModeId::Idle));
    }
}
