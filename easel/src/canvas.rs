use crate::{
    config::Config,
    db::{ElementId, NoteId},
    element::{CanvasElement, ElementStore},
    error::{EaselError, EaselErrorExt, ErrorKind},
    event::PointerEvent,
    graphics::{self, Rect},
    ink::InkSurface,
    input::{DrawingMode, IdleMode, InputContext, InputStateMachine, ModeId, PinchZoomMode},
    predict::MotionPredictor,
    repo::ElementRepository,
    s,
    stroke::{Brush, Stroke},
    Tool, DEFAULT_ZOOM,
};
use glam::{Affine2, Vec2};

/// One note on screen: pointer input, the live ink layer, the view transform and the committed
/// elements.
pub struct NoteCanvas<I: InkSurface, R: ElementRepository> {
    machine: InputStateMachine<I>,
    surface: I,
    store: ElementStore<R>,
    uncommitted: Vec<Stroke>,
    world_to_screen: Affine2,
    tool: Tool,
    brush: Brush,
    viewport: Rect,
    min_zoom: f32,
    max_zoom: f32,
}

impl<I: InkSurface, R: ElementRepository> NoteCanvas<I, R> {
    pub fn new(
        surface: I,
        store: ElementStore<R>,
        brush: Brush,
        (min_zoom, max_zoom): (f32, f32),
    ) -> Result<Self, EaselError> {
        if !(min_zoom > 0. && min_zoom <= max_zoom && max_zoom.is_finite()) {
            return Err(EaselError::new(ErrorKind::InvalidInput(
                "zoom limits must be positive and ordered",
            )));
        }

        let mut machine = InputStateMachine::new();
        machine.register(IdleMode);
        machine.register(PinchZoomMode::new());

        let mut canvas = NoteCanvas {
            machine,
            surface,
            store,
            uncommitted: Vec::new(),
            world_to_screen: Affine2::from_scale(Vec2::splat(DEFAULT_ZOOM)),
            tool: Tool::Pen(brush),
            brush,
            viewport: Rect::ZERO,
            min_zoom,
            max_zoom,
        };

        canvas.set_mode(ModeId::Idle)?;
        Ok(canvas)
    }

    /// Builds a canvas with drawing enabled and the brush, zoom limits and prediction from
    /// `config`.
    pub fn from_config(
        surface: I,
        store: ElementStore<R>,
        config: &Config,
    ) -> Result<Self, EaselError> {
        config.check()?;
        let mut canvas = Self::new(surface, store, config.pen_brush(), config.zoom_range())?;
        canvas.attach_drawing(MotionPredictor::new(
            config.prediction_enabled,
            config.prediction_ms,
        ));
        Ok(canvas)
    }

    /// Drawing needs the ink surface to be ready, so it is registered separately.
    pub fn attach_drawing(&mut self, predictor: MotionPredictor) {
        self.machine.register(DrawingMode::new(predictor));
    }

    fn set_mode(&mut self, id: ModeId) -> Result<(), EaselError> {
        let mut cx = InputContext {
            surface: &mut self.surface,
            world_to_screen: &mut self.world_to_screen,
            brush: &self.brush,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
        };
        self.machine.set_current(id, None, &mut cx)
    }

    /// Switches notes. A stroke still being drawn is dropped, and strokes that could not be
    /// saved yet go to the note that was open when possible, otherwise to the new one.
    pub fn open_note(&mut self, note_id: NoteId) -> Result<(), EaselError> {
        self.set_mode(ModeId::Idle)?;

        if self.store.note_id().is_some() {
            if let Err(err) = self.commit_uncommitted() {
                tracing::warn!("{}: {}", s!(CouldNotSaveStrokes), err.reasons());
            }
        }

        self.store
            .open_note(note_id)
            .problem(s!(CouldNotLoadNote))?;
        self.reset_view();
        self.commit_uncommitted()?;
        Ok(())
    }

    /// Finished strokes that are waiting on a successful save.
    pub fn uncommitted(&self) -> &[Stroke] {
        &self.uncommitted
    }

    fn commit_uncommitted(&mut self) -> Result<Vec<ElementId>, EaselError> {
        if self.uncommitted.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("committing {} finished strokes", self.uncommitted.len());
        let ids = self
            .store
            .add_strokes(self.uncommitted.iter().cloned())
            .problem(s!(CouldNotSaveStrokes))?;
        self.uncommitted.clear();
        Ok(ids)
    }

    /// Runs the event through the input modes, then commits any strokes that finished. Strokes
    /// that fail to save are kept and retried on the next event or note switch.
    pub fn handle_pointer_event(
        &mut self,
        event: &PointerEvent,
    ) -> Result<Vec<ElementId>, EaselError> {
        let handled = {
            let mut cx = InputContext {
                surface: &mut self.surface,
                world_to_screen: &mut self.world_to_screen,
                brush: &self.brush,
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
            };
            self.machine.handle(event, &mut cx)
        };

        self.uncommitted
            .extend(self.surface.take_finished_strokes().into_values());
        let ids = self.commit_uncommitted()?;

        handled.map(|_| ids)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Switching to a pen changes the brush for the next stroke. Other tools keep it.
    pub fn set_tool(&mut self, tool: Tool) {
        tracing::debug!("tool {tool:?}");
        if let Tool::Pen(brush) = tool {
            self.brush = brush;
        }
        self.tool = tool;
    }

    pub fn reset_view(&mut self) {
        self.world_to_screen = Affine2::from_scale(Vec2::splat(DEFAULT_ZOOM));
    }

    pub fn transform(&self) -> &Affine2 {
        &self.world_to_screen
    }

    pub fn zoom(&self) -> f32 {
        graphics::matrix_scale(&self.world_to_screen)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Rect::new(0., 0., width as f32, height as f32);
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Elements whose on-screen bounds touch the viewport.
    pub fn visible_elements(&self) -> impl Iterator<Item = &CanvasElement> + '_ {
        self.store.elements().iter().filter(move |element| {
            element
                .bounds()
                .transformed(&self.world_to_screen)
                .intersects(&self.viewport)
        })
    }

    pub fn mode(&self) -> Option<ModeId> {
        self.machine.current()
    }

    pub fn surface(&self) -> &I {
        &self.surface
    }

    pub fn store(&self) -> &ElementStore<R> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ElementStore<R> {
        &mut self.store
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        db::Database,
        element::StoreEvent,
        event::{Pointer, PointerAction},
        graphics::{Color, ColorExt},
        ink::InProgressStrokes,
        repo::LocalElementRepository,
    };

    type Canvas = NoteCanvas<InProgressStrokes, LocalElementRepository>;

    fn canvas() -> Canvas {
        let mut db = Database::open_in_memory().unwrap();
        let note = db.insert_note_at(1).unwrap();
        let store = ElementStore::new(LocalElementRepository::new(db));

        let mut canvas =
            Canvas::from_config(InProgressStrokes::new(160.), store, &Config::new()).unwrap();
        canvas.open_note(note.id).unwrap();
        canvas.resize(200, 100);
        canvas
    }

    fn one(action: PointerAction, time: i64, x: f32, y: f32) -> PointerEvent {
        PointerEvent::new(action, time, vec![Pointer::new(0, x, y)])
    }

    fn two(action: PointerAction, time: i64, a: (f32, f32), b: (f32, f32)) -> PointerEvent {
        PointerEvent::new(
            action,
            time,
            vec![Pointer::new(0, a.0, a.1), Pointer::new(1, b.0, b.1)],
        )
    }

    fn draw(canvas: &mut Canvas, from: (f32, f32), to: (f32, f32)) -> Vec<ElementId> {
        assert!(canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, from.0, from.1))
            .unwrap()
            .is_empty());
        canvas
            .handle_pointer_event(&one(PointerAction::Move, 8, to.0, to.1))
            .unwrap();
        canvas
            .handle_pointer_event(&one(PointerAction::Up, 16, to.0, to.1))
            .unwrap()
    }

    #[test]
    fn finished_strokes_are_committed() {
        let mut canvas = canvas();
        let events = canvas.store_mut().subscribe();

        let ids = draw(&mut canvas, (10., 10.), (50., 10.));
        assert_eq!(ids.len(), 1);
        assert_eq!(canvas.store().elements().len(), 1);
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Added(ids));
        assert_eq!(canvas.mode(), Some(ModeId::Idle));
    }

    #[test]
    fn without_drawing_only_pinch_works() {
        let mut db = Database::open_in_memory().unwrap();
        let note = db.insert_note_at(1).unwrap();
        let mut store = ElementStore::new(LocalElementRepository::new(db));
        store.open_note(note.id).unwrap();
        let mut canvas =
            Canvas::new(InProgressStrokes::new(160.), store, Brush::default(), (0.5, 4.)).unwrap();

        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 0., 0.))
            .unwrap();
        canvas
            .handle_pointer_event(&one(PointerAction::Up, 8, 10., 0.))
            .unwrap();
        assert!(canvas.store().elements().is_empty());
        assert_eq!(canvas.mode(), Some(ModeId::Idle));
    }

    #[test]
    fn pen_sets_brush_other_tools_keep_it() {
        let mut canvas = canvas();
        let red = Brush::default().with_color(Color::RED);
        canvas.set_tool(Tool::Pen(red));
        canvas.set_tool(Tool::Eraser(30.));
        assert_eq!(*canvas.brush(), red);
        assert_eq!(canvas.tool(), Tool::Eraser(30.));

        draw(&mut canvas, (0., 0.), (5., 5.));
        let CanvasElement::Stroke(stroke) = &canvas.store().elements()[0];
        assert_eq!(stroke.stroke.brush().color, Color::RED);
    }

    #[test]
    fn pinch_pans_then_reset() {
        let mut canvas = canvas();
        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 0., 0.))
            .unwrap();
        canvas
            .handle_pointer_event(
                &two(PointerAction::PointerDown, 8, (0., 0.), (100., 0.)).with_action_index(1),
            )
            .unwrap();
        canvas
            .handle_pointer_event(&two(PointerAction::Move, 16, (10., 20.), (110., 20.)))
            .unwrap();
        canvas
            .handle_pointer_event(&two(PointerAction::Up, 24, (10., 20.), (110., 20.)))
            .unwrap();

        assert_eq!(canvas.transform().translation, Vec2::new(10., 20.));
        assert!(canvas.store().elements().is_empty());

        canvas.reset_view();
        assert_eq!(*canvas.transform(), Affine2::IDENTITY);
    }

    #[test]
    fn zoom_stays_in_configured_range() {
        let mut canvas = canvas();
        let (_, max_zoom) = Config::new().zoom_range();
        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 99., 50.))
            .unwrap();
        canvas
            .handle_pointer_event(
                &two(PointerAction::PointerDown, 8, (99., 50.), (101., 50.)).with_action_index(1),
            )
            .unwrap();
        canvas
            .handle_pointer_event(&two(PointerAction::Move, 16, (0., 50.), (200., 50.)))
            .unwrap();

        assert!((canvas.zoom() - max_zoom).abs() < 1e-4);
    }

    #[test]
    fn only_visible_elements_are_listed() {
        let mut canvas = canvas();
        draw(&mut canvas, (10., 10.), (20., 10.));
        draw(&mut canvas, (150., 50.), (160., 50.));
        assert_eq!(canvas.visible_elements().count(), 2);

        canvas.resize(100, 100);
        assert_eq!(canvas.visible_elements().count(), 1);
    }

    #[test]
    fn strokes_wait_for_a_note() {
        let mut db = Database::open_in_memory().unwrap();
        let note = db.insert_note_at(1).unwrap();
        let store = ElementStore::new(LocalElementRepository::new(db));
        let mut canvas =
            Canvas::from_config(InProgressStrokes::new(160.), store, &Config::new()).unwrap();

        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 0., 0.))
            .unwrap();
        assert!(canvas
            .handle_pointer_event(&one(PointerAction::Up, 8, 10., 0.))
            .is_err());
        assert_eq!(canvas.uncommitted().len(), 1);

        canvas.open_note(note.id).unwrap();
        assert!(canvas.uncommitted().is_empty());
        assert_eq!(canvas.store().elements().len(), 1);
        assert_eq!(canvas.store().elements()[0].note_id(), note.id);
    }

    #[test]
    fn switching_notes_drops_live_stroke() {
        let mut canvas = canvas();
        let other = canvas
            .store_mut()
            .repository_mut()
            .database_mut()
            .insert_note_at(2)
            .unwrap();

        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 0., 0.))
            .unwrap();
        canvas
            .handle_pointer_event(&one(PointerAction::Move, 8, 10., 0.))
            .unwrap();
        assert!(canvas.surface().is_drawing());

        canvas.open_note(other.id).unwrap();
        assert!(!canvas.surface().is_drawing());
        assert_eq!(canvas.mode(), Some(ModeId::Idle));

        canvas
            .handle_pointer_event(&one(PointerAction::Up, 16, 20., 0.))
            .unwrap();
        assert!(canvas.store().elements().is_empty());
    }

    #[test]
    fn zoom_limits_are_validated() {
        let store = || {
            ElementStore::new(LocalElementRepository::new(
                Database::open_in_memory().unwrap(),
            ))
        };
        assert!(
            Canvas::new(InProgressStrokes::new(160.), store(), Brush::default(), (0., 4.)).is_err()
        );
        let config = Config {
            min_zoom: 0.,
            ..Config::new()
        };
        assert!(Canvas::from_config(InProgressStrokes::new(160.), store(), &config).is_err());
    }

    #[test]
    fn tap_is_visible() {
        let mut canvas = canvas();
        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 150., 50.))
            .unwrap();
        let ids = canvas
            .handle_pointer_event(&one(PointerAction::Up, 30, 150., 50.))
            .unwrap();
        assert_eq!(ids.len(), 1);

        let size = canvas.store().total_size();
        assert!(size.left > 140. && size.top > 40.);
        canvas.resize(100, 100);
        assert_eq!(canvas.visible_elements().count(), 0);
    }

    #[test]
    fn errors_still_leave_machine_idle() {
        let mut canvas = canvas();
        canvas
            .handle_pointer_event(&one(PointerAction::Down, 0, 0., 0.))
            .unwrap();
        let stranger = PointerEvent::new(PointerAction::Up, 8, vec![Pointer::new(5, 1., 1.)]);

        assert!(canvas.handle_pointer_event(&stranger).is_err());
        assert_eq!(canvas.mode(), Some(ModeId::Idle));
        assert!(canvas.store().elements().is_empty());
    }
}
