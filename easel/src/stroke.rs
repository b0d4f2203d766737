use crate::{
    error::{EaselError, ErrorKind},
    event::ToolType,
    graphics::{Color, ColorExt, Rect, StrokePos},
    tess::{self, Mesh},
};
use once_cell::unsync::OnceCell;

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct StrokeInput {
    pub x: f32,
    pub y: f32,
    pub time_millis: i64,
    pub pressure: f32,
    pub tilt_radians: f32,
    pub orientation_radians: f32,
    pub stroke_unit_length_cm: f32,
}

impl From<StrokeInput> for StrokePos {
    fn from(input: StrokeInput) -> StrokePos {
        StrokePos {
            x: input.x,
            y: input.y,
        }
    }
}

impl From<&StrokeInput> for StrokePos {
    fn from(input: &StrokeInput) -> StrokePos {
        StrokePos {
            x: input.x,
            y: input.y,
        }
    }
}

impl std::fmt::Display for StrokeInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.02},{:.02},{:.02}@{}",
            self.x, self.y, self.pressure, self.time_millis
        )
    }
}

/// Samples of one stroke, all from the same kind of tool.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct StrokeInputBatch {
    tool_type: ToolType,
    stroke_unit_length_cm: f32,
    inputs: Vec<StrokeInput>,
}

impl StrokeInputBatch {
    pub fn new(tool_type: ToolType, stroke_unit_length_cm: f32) -> Self {
        StrokeInputBatch {
            tool_type,
            stroke_unit_length_cm,
            inputs: Vec::new(),
        }
    }

    pub fn tool_type(&self) -> ToolType {
        self.tool_type
    }

    pub fn stroke_unit_length_cm(&self) -> f32 {
        self.stroke_unit_length_cm
    }

    pub fn inputs(&self) -> &[StrokeInput] {
        &self.inputs
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn last(&self) -> Option<&StrokeInput> {
        self.inputs.last()
    }

    pub fn push(&mut self, tool_type: ToolType, input: StrokeInput) -> Result<(), EaselError> {
        if !self.inputs.is_empty() && tool_type != self.tool_type {
            return Err(EaselError::new(ErrorKind::InvalidInput(
                "tool type changed within a stroke",
            )));
        }

        if let Some(last) = self.inputs.last() {
            if input.time_millis < last.time_millis {
                return Err(EaselError::new(ErrorKind::InvalidInput(
                    "input time went backwards",
                )));
            }
        }

        self.tool_type = tool_type;
        self.inputs.push(input);
        Ok(())
    }
}

#[derive(Default, PartialEq, Eq, Debug, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
pub enum BrushFamily {
    #[default]
    Marker,
    PressurePen,
    Highlighter,
}

impl BrushFamily {
    pub const LATEST_PEN: BrushFamily = BrushFamily::PressurePen;

    pub fn uses_pressure(&self) -> bool {
        !matches!(self, BrushFamily::Highlighter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Brush {
    pub family: BrushFamily,
    pub color: Color,
    pub size: f32,
    /// Smallest distance between kept samples, in stroke units.
    pub epsilon: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Brush {
            family: BrushFamily::LATEST_PEN,
            color: Color::BLACK,
            size: crate::DEFAULT_BRUSH_SIZE,
            epsilon: crate::DEFAULT_EPSILON,
        }
    }
}

impl Brush {
    pub fn new(family: BrushFamily, color: Color, size: f32, epsilon: f32) -> Self {
        Brush {
            family,
            color,
            size,
            epsilon,
        }
    }

    pub fn with_epsilon(self, epsilon: f32) -> Self {
        Brush { epsilon, ..self }
    }

    pub fn with_color(self, color: Color) -> Self {
        Brush { color, ..self }
    }
}

/// A finished stroke. Geometry is tessellated on first use.
#[derive(Debug, Clone)]
pub struct Stroke {
    inputs: StrokeInputBatch,
    brush: Brush,
    mesh: OnceCell<Mesh>,
}

impl PartialEq for Stroke {
    fn eq(&self, other: &Self) -> bool {
        self.inputs == other.inputs && self.brush == other.brush
    }
}

impl Stroke {
    pub fn new(brush: Brush, inputs: StrokeInputBatch) -> Self {
        Stroke {
            inputs,
            brush,
            mesh: OnceCell::new(),
        }
    }

    pub fn inputs(&self) -> &StrokeInputBatch {
        &self.inputs
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
            .get_or_init(|| tess::tessellate(self.inputs.inputs(), &self.brush))
    }

    pub fn bounds(&self) -> Option<Rect> {
        tess::mesh_bounds(self.mesh())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn input(x: f32, y: f32, time_millis: i64) -> StrokeInput {
        StrokeInput {
            x,
            y,
            time_millis,
            pressure: 1.,
            ..Default::default()
        }
    }

    #[test]
    fn batch_rejects_time_travel_and_tool_changes() {
        let mut batch = StrokeInputBatch::new(ToolType::Stylus, 0.01);
        batch.push(ToolType::Stylus, input(0., 0., 0)).unwrap();
        batch.push(ToolType::Stylus, input(1., 0., 5)).unwrap();

        assert!(batch.push(ToolType::Stylus, input(2., 0., 4)).is_err());
        assert!(batch.push(ToolType::Touch, input(2., 0., 6)).is_err());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.tool_type(), ToolType::Stylus);
    }

    #[test]
    fn stroke_bounds_cover_inputs_and_width() {
        let mut batch = StrokeInputBatch::new(ToolType::Touch, 0.);
        batch.push(ToolType::Touch, input(0., 0., 0)).unwrap();
        batch.push(ToolType::Touch, input(10., 0., 16)).unwrap();
        let stroke = Stroke::new(Brush::default().with_epsilon(0.), batch);

        let bounds = stroke.bounds().unwrap();
        let half = Brush::default().size / 2.;
        assert!(bounds.left <= 0. && bounds.left >= -half - 0.01);
        assert!(bounds.right >= 10. && bounds.right <= 10. + half + 0.01);
        assert!(bounds.top < 0. && bounds.bottom > 0.);
    }

    #[test]
    fn empty_stroke_has_no_bounds() {
        let stroke = Stroke::new(Brush::default(), StrokeInputBatch::default());
        assert!(stroke.bounds().is_none());
    }
}
