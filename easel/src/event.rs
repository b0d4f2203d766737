use crate::graphics::PixelPos;

pub type PointerId = u32;

#[derive(Default, PartialEq, Eq, Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum ToolType {
    Stylus,
    Touch,
    Mouse,
    #[default]
    Unknown,
}

/// One contact in a [PointerEvent].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub id: PointerId,
    pub location: PixelPos,
    pub pressure: f32,
    pub tilt: f32,
    pub orientation: f32,
    pub tool: ToolType,
}

impl Pointer {
    pub fn new(id: PointerId, x: f32, y: f32) -> Pointer {
        Pointer {
            id,
            location: PixelPos { x, y },
            pressure: 1.,
            tilt: 0.,
            orientation: 0.,
            tool: ToolType::Touch,
        }
    }

    pub fn with_tool(self, tool: ToolType) -> Pointer {
        Pointer { tool, ..self }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum PointerAction {
    /// First pointer went down.
    Down,
    /// Another pointer went down while at least one was already down.
    PointerDown,
    Move,
    /// A non-final pointer went up.
    PointerUp,
    /// Final pointer went up.
    Up,
    Cancel,
}

/// All pointers currently in contact, plus which of them the action is about.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub action_index: usize,
    pub time_millis: i64,
    pub pointers: Vec<Pointer>,
}

impl PointerEvent {
    pub fn new(action: PointerAction, time_millis: i64, pointers: Vec<Pointer>) -> Self {
        PointerEvent {
            action,
            action_index: 0,
            time_millis,
            pointers,
        }
    }

    pub fn with_action_index(self, action_index: usize) -> Self {
        PointerEvent {
            action_index,
            ..self
        }
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn pointer(&self, index: usize) -> Option<&Pointer> {
        self.pointers.get(index)
    }

    pub fn pointer_id(&self, index: usize) -> Option<PointerId> {
        self.pointer(index).map(|pointer| pointer.id)
    }

    pub fn find_pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.iter().find(|pointer| pointer.id == id)
    }

    pub fn action_pointer(&self) -> Option<&Pointer> {
        self.pointer(self.action_index)
    }

    pub fn tool_type(&self) -> ToolType {
        self.action_pointer()
            .map(|pointer| pointer.tool)
            .unwrap_or_default()
    }
}
