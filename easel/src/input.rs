//! Pointer input state machine.
//!
//! Raw pointer events go to exactly one mode at a time. Each mode owns the state of the gesture
//! it is tracking and answers every event with the mode to switch to, if any.

use crate::{
    error::{EaselError, ErrorKind},
    event::{PointerAction, PointerEvent},
    graphics,
    ink::InkSurface,
    stroke::Brush,
};
use glam::Affine2;
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

pub mod drawing;
pub mod pinch_zoom;

pub use drawing::DrawingMode;
pub use pinch_zoom::PinchZoomMode;

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum ModeId {
    Idle,
    Drawing,
    PinchZoom,
}

impl ModeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeId::Idle => "idle",
            ModeId::Drawing => "drawing",
            ModeId::PinchZoom => "pinch-zoom",
        }
    }
}

impl Display for ModeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the owner of the canvas lends to a mode while it handles an event.
pub struct InputContext<'a, I: InkSurface> {
    pub surface: &'a mut I,
    pub world_to_screen: &'a mut Affine2,
    pub brush: &'a Brush,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl<'a, I: InkSurface> InputContext<'a, I> {
    /// Applies an incremental screen-space transform after the current one.
    pub fn report_transform(&mut self, delta: &Affine2) {
        *self.world_to_screen = graphics::post_concat(self.world_to_screen, delta);
        tracing::trace!(
            "transform now scale={:.03} translate={}",
            graphics::matrix_scale(self.world_to_screen),
            self.world_to_screen.translation
        );
    }

    /// Limits a scale step so the resulting zoom stays in range. The result is always positive.
    pub fn clamp_scale_factor(&self, factor: f32) -> f32 {
        let current = graphics::matrix_scale(self.world_to_screen);
        if !(current > 0.) || !factor.is_finite() || factor < 0. {
            return 1.;
        }

        let min_zoom = self.min_zoom.max(f32::MIN_POSITIVE);
        let max_zoom = self.max_zoom.max(min_zoom);
        (current * factor).clamp(min_zoom, max_zoom) / current
    }
}

pub trait InputMode<I: InkSurface> {
    fn id(&self) -> ModeId;

    fn on_enter(
        &mut self,
        _event: Option<&PointerEvent>,
        _cx: &mut InputContext<'_, I>,
    ) -> Result<(), EaselError> {
        Ok(())
    }

    fn on_exit(&mut self, _event: Option<&PointerEvent>, _cx: &mut InputContext<'_, I>) {}

    /// Returns the mode to switch to, or `None` to stay.
    fn handle(
        &mut self,
        event: &PointerEvent,
        cx: &mut InputContext<'_, I>,
    ) -> Result<Option<ModeId>, EaselError>;
}

#[derive(Default, Debug, Clone, Copy)]
pub struct IdleMode;

impl<I: InkSurface> InputMode<I> for IdleMode {
    fn id(&self) -> ModeId {
        ModeId::Idle
    }

    fn handle(
        &mut self,
        event: &PointerEvent,
        _: &mut InputContext<'_, I>,
    ) -> Result<Option<ModeId>, EaselError> {
        Ok(
            if event.action == PointerAction::Down && event.pointer_count() == 1 {
                Some(ModeId::Drawing)
            } else {
                None
            },
        )
    }
}

pub struct InputStateMachine<I: InkSurface> {
    nodes: IndexMap<ModeId, Box<dyn InputMode<I>>>,
    current: Option<ModeId>,
}

impl<I: InkSurface> Default for InputStateMachine<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InkSurface> InputStateMachine<I> {
    pub fn new() -> Self {
        InputStateMachine {
            nodes: IndexMap::new(),
            current: None,
        }
    }

    pub fn register(&mut self, node: impl InputMode<I> + 'static) {
        let id = node.id();
        if self.nodes.insert(id, Box::new(node)).is_some() {
            tracing::debug!("replaced {id} mode");
        }
    }

    pub fn is_registered(&self, id: ModeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn current(&self) -> Option<ModeId> {
        self.current
    }

    pub fn set_current(
        &mut self,
        id: ModeId,
        event: Option<&PointerEvent>,
        cx: &mut InputContext<'_, I>,
    ) -> Result<(), EaselError> {
        tracing::debug!("setting mode to {id}");

        if let Some(node) = self
            .current
            .and_then(|current| self.nodes.get_mut(&current))
        {
            node.on_exit(event, cx);
        }

        self.current = Some(id).filter(|id| self.nodes.contains_key(id));
        let node = match self.current.and_then(|current| self.nodes.get_mut(&current)) {
            Some(node) => node,
            None => {
                tracing::warn!("no {id} mode registered, ignoring input");
                return Ok(());
            }
        };

        if let Err(err) = node.on_enter(event, cx) {
            node.on_exit(event, cx);
            self.enter_idle(event, cx);
            return Err(err);
        }

        Ok(())
    }

    pub fn handle(
        &mut self,
        event: &PointerEvent,
        cx: &mut InputContext<'_, I>,
    ) -> Result<(), EaselError> {
        let result = match self.current.and_then(|current| self.nodes.get_mut(&current)) {
            Some(node) => node.handle(event, cx),
            None => return Ok(()),
        };

        match result {
            Ok(Some(next)) if self.nodes.contains_key(&next) => {
                self.set_current(next, Some(event), cx)
            }

            Ok(Some(next)) => {
                tracing::warn!("no {next} mode registered, staying put");
                Ok(())
            }

            Ok(None) => Ok(()),

            Err(err) => {
                if let Some(node) = self.current.and_then(|current| self.nodes.get_mut(&current)) {
                    tracing::error!("{} mode failed: {}", node.id(), err);
                    node.on_exit(Some(event), cx);
                }
                self.enter_idle(Some(event), cx);
                Err(err)
            }
        }
    }

    /// Falls back to idle without running the failed mode's exit hook twice.
    fn enter_idle(&mut self, event: Option<&PointerEvent>, cx: &mut InputContext<'_, I>) {
        self.current = None;
        if let Some(idle) = self.nodes.get_mut(&ModeId::Idle) {
            self.current = Some(ModeId::Idle);
            if let Err(err) = idle.on_enter(event, cx) {
                tracing::error!("could not enter idle mode: {err}");
            }
        }
    }
}

pub(crate) fn invalid_state(what: &'static str) -> EaselError {
    EaselError::new(ErrorKind::InvalidState(what))
}
