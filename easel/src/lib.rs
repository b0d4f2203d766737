#![allow(clippy::new_without_default, clippy::derive_partial_eq_without_eq)]

pub mod canvas;
pub mod config;
pub mod db;
pub mod element;
pub mod error;
pub mod event;
pub mod graphics;
pub mod i18n;
pub mod ink;
pub mod input;
pub mod predict;
pub mod repo;
pub mod serialize;
pub mod stroke;
pub mod tess;

pub extern crate dirs;
pub extern crate glam;
pub extern crate gumdrop;
pub extern crate lyon;

use crate::stroke::Brush;
use std::path::PathBuf;

pub const DEFAULT_ZOOM: f32 = 1.;
pub const MAX_ZOOM: f32 = 20.;
pub const MIN_ZOOM: f32 = 0.1;

pub const DEFAULT_BRUSH_SIZE: f32 = 3.;
pub const DEFAULT_EPSILON: f32 = 0.1;
pub const DEFAULT_ERASER_SIZE: f32 = 20.;

pub const DEFAULT_DPI: f32 = 160.;
pub const PREDICTION_MS: i64 = 8;

#[derive(gumdrop::Options, Debug)]
pub struct Args {
    #[options(help = "Show this message")]
    help: bool,

    #[options(help = "Print the version", short = "V")]
    pub version: bool,

    #[options(help = "Config file location")]
    pub config: Option<PathBuf>,

    #[options(help = "Note database location")]
    pub database: Option<PathBuf>,

    #[options(help = "Print the default config and exit", no_short)]
    pub print_default_config: bool,

    #[options(command)]
    pub command: Option<Command>,
}

#[derive(gumdrop::Options, Debug)]
pub enum Command {
    #[options(help = "List notes, newest first")]
    List(NoArgs),

    #[options(help = "Create an empty note")]
    New(NoArgs),

    #[options(help = "Delete a note and everything on it")]
    Delete(NoteArgs),

    #[options(help = "Write a note's strokes as JSON lines")]
    Export(NoteArgs),

    #[options(help = "Add strokes from a JSON lines file to a note")]
    Import(ImportArgs),
}

#[derive(gumdrop::Options, Debug)]
pub struct NoArgs {
    #[options(help = "Show this message")]
    help: bool,
}

#[derive(gumdrop::Options, Debug)]
pub struct NoteArgs {
    #[options(help = "Show this message")]
    help: bool,

    #[options(free, required, help = "Note id")]
    pub note: i64,
}

#[derive(gumdrop::Options, Debug)]
pub struct ImportArgs {
    #[options(help = "Show this message")]
    help: bool,

    #[options(free, required, help = "Note id")]
    pub note: i64,

    #[options(free, required, help = "JSON lines file to read")]
    pub file: PathBuf,
}

#[derive(PartialEq, Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub enum Tool {
    Pen(Brush),
    Eraser(f32),
    Selection,
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Pen(Brush::default())
    }
}

/// Per-tool settings, so switching tools keeps what each one was set to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    pub pen: Brush,
    pub eraser_size: f32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        ToolSettings {
            pen: Brush::default(),
            eraser_size: DEFAULT_ERASER_SIZE,
        }
    }
}

impl ToolSettings {
    pub fn from_config(config: &config::Config) -> Self {
        ToolSettings {
            pen: config.pen_brush(),
            eraser_size: config.eraser_size,
        }
    }

    pub fn tool(&self, which: ToolKind) -> Tool {
        match which {
            ToolKind::Pen => Tool::Pen(self.pen),
            ToolKind::Eraser => Tool::Eraser(self.eraser_size),
            ToolKind::Selection => Tool::Selection,
        }
    }

    pub fn update(&mut self, tool: Tool) {
        match tool {
            Tool::Pen(brush) => self.pen = brush,
            Tool::Eraser(size) => self.eraser_size = size,
            Tool::Selection => {}
        }
    }
}

#[derive(Default, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Selection,
}

impl From<Tool> for ToolKind {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Pen(_) => ToolKind::Pen,
            Tool::Eraser(_) => ToolKind::Eraser,
            Tool::Selection => ToolKind::Selection,
        }
    }
}
