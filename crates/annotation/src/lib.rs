//! Freehand annotation engine
//!
//! Captures pointer strokes per page and plans full overlay redraws. Points
//! are stored page-normalized so overlays can be resized or rotated freely.

pub mod engine;
pub mod geometry;
pub mod style;

pub use engine::{
    AnnotationEngine, DrawCommand, OverlayFrame, Stroke, CONSTRAINED_STROKE_LIMIT,
    DOWNSAMPLE_THRESHOLD,
};
pub use geometry::{OverlayGeometry, PagePoint};
pub use style::{Color, HighlighterHue, StrokeStyle, Tool};
