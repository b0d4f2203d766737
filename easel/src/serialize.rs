//! JSON interchange for strokes and brushes.
//!
//! Colors are written as signed 64-bit color longs so other readers of the same rows see the
//! value they expect.

use crate::{
    error::{EaselError, EaselErrorExt},
    event::ToolType,
    graphics::{Color, ColorExt},
    stroke::{Brush, BrushFamily, Stroke, StrokeInput, StrokeInputBatch},
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStroke {
    pub inputs: SerializedStrokeInputBatch,
    pub brush: SerializedBrush,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBrush {
    pub size: f32,
    pub color: i64,
    pub epsilon: f32,
    #[serde(default)]
    pub stock_brush: SerializedStockBrush,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerializedStockBrush {
    #[default]
    MarkerV1,
    PressurePenV1,
    HighlighterV1,
    /// Any name this version doesn't know. Read back as a marker.
    #[serde(other, skip_serializing)]
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStrokeInputBatch {
    #[serde(default)]
    pub tool_type: SerializedToolType,
    pub stroke_unit_length_cm: f32,
    pub inputs: Vec<SerializedStrokeInput>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedStrokeInput {
    pub x: f32,
    pub y: f32,
    pub time_millis: f32,
    pub pressure: f32,
    pub tilt_radians: f32,
    pub orientation_radians: f32,
    pub stroke_unit_length_cm: f32,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerializedToolType {
    Stylus,
    Touch,
    Mouse,
    #[default]
    #[serde(other)]
    Unknown,
}

impl From<BrushFamily> for SerializedStockBrush {
    fn from(family: BrushFamily) -> Self {
        match family {
            BrushFamily::Marker => SerializedStockBrush::MarkerV1,
            BrushFamily::PressurePen => SerializedStockBrush::PressurePenV1,
            BrushFamily::Highlighter => SerializedStockBrush::HighlighterV1,
        }
    }
}

impl From<SerializedStockBrush> for BrushFamily {
    fn from(stock: SerializedStockBrush) -> Self {
        match stock {
            SerializedStockBrush::MarkerV1 | SerializedStockBrush::Unknown => BrushFamily::Marker,
            SerializedStockBrush::PressurePenV1 => BrushFamily::PressurePen,
            SerializedStockBrush::HighlighterV1 => BrushFamily::Highlighter,
        }
    }
}

impl From<ToolType> for SerializedToolType {
    fn from(tool: ToolType) -> Self {
        match tool {
            ToolType::Stylus => SerializedToolType::Stylus,
            ToolType::Touch => SerializedToolType::Touch,
            ToolType::Mouse => SerializedToolType::Mouse,
            ToolType::Unknown => SerializedToolType::Unknown,
        }
    }
}

impl From<SerializedToolType> for ToolType {
    fn from(tool: SerializedToolType) -> Self {
        match tool {
            SerializedToolType::Stylus => ToolType::Stylus,
            SerializedToolType::Touch => ToolType::Touch,
            SerializedToolType::Mouse => ToolType::Mouse,
            SerializedToolType::Unknown => ToolType::Unknown,
        }
    }
}

impl From<&Brush> for SerializedBrush {
    fn from(brush: &Brush) -> Self {
        SerializedBrush {
            size: brush.size,
            color: brush.color.to_color_long() as i64,
            epsilon: brush.epsilon,
            stock_brush: brush.family.into(),
        }
    }
}

impl From<&SerializedBrush> for Brush {
    fn from(brush: &SerializedBrush) -> Self {
        Brush::new(
            brush.stock_brush.into(),
            Color::from_color_long(brush.color as u64),
            brush.size,
            brush.epsilon,
        )
    }
}

impl From<&StrokeInput> for SerializedStrokeInput {
    fn from(input: &StrokeInput) -> Self {
        SerializedStrokeInput {
            x: input.x,
            y: input.y,
            time_millis: input.time_millis as f32,
            pressure: input.pressure,
            tilt_radians: input.tilt_radians,
            orientation_radians: input.orientation_radians,
            stroke_unit_length_cm: input.stroke_unit_length_cm,
        }
    }
}

impl From<&SerializedStrokeInput> for StrokeInput {
    fn from(input: &SerializedStrokeInput) -> Self {
        StrokeInput {
            x: input.x,
            y: input.y,
            time_millis: input.time_millis as i64,
            pressure: input.pressure,
            tilt_radians: input.tilt_radians,
            orientation_radians: input.orientation_radians,
            stroke_unit_length_cm: input.stroke_unit_length_cm,
        }
    }
}

impl From<&StrokeInputBatch> for SerializedStrokeInputBatch {
    fn from(batch: &StrokeInputBatch) -> Self {
        SerializedStrokeInputBatch {
            tool_type: batch.tool_type().into(),
            stroke_unit_length_cm: batch.stroke_unit_length_cm(),
            inputs: batch.inputs().iter().map(SerializedStrokeInput::from).collect(),
        }
    }
}

impl TryFrom<&SerializedStrokeInputBatch> for StrokeInputBatch {
    type Error = EaselError;

    fn try_from(serialized: &SerializedStrokeInputBatch) -> Result<Self, EaselError> {
        let tool = ToolType::from(serialized.tool_type);
        let mut batch = StrokeInputBatch::new(tool, serialized.stroke_unit_length_cm);
        for (i, input) in serialized.inputs.iter().enumerate() {
            batch
                .push(tool, StrokeInput::from(input))
                .problem(format!("input {i}"))?;
        }
        Ok(batch)
    }
}

pub fn serialize_stroke(stroke: &Stroke) -> Result<String, EaselError> {
    Ok(serde_json::to_string(&SerializedStroke {
        inputs: stroke.inputs().into(),
        brush: stroke.brush().into(),
    })?)
}

pub fn deserialize_stroke(json: &str) -> Result<Stroke, EaselError> {
    let serialized: SerializedStroke = serde_json::from_str(json)?;
    let inputs = StrokeInputBatch::try_from(&serialized.inputs)?;
    Ok(Stroke::new(Brush::from(&serialized.brush), inputs))
}

pub fn brush_to_string(brush: &Brush) -> Result<String, EaselError> {
    Ok(serde_json::to_string(&SerializedBrush::from(brush))?)
}

pub fn string_to_brush(json: &str) -> Result<Brush, EaselError> {
    let serialized: SerializedBrush = serde_json::from_str(json)?;
    Ok(Brush::from(&serialized))
}
