//! Stroke capture and overlay render plans.

use crate::geometry::{OverlayGeometry, PagePoint};
use crate::style::{HighlighterHue, StrokeStyle, Tool};

/// Strokes drawn per page when rendering is constrained
pub const CONSTRAINED_STROKE_LIMIT: usize = 50;

/// Point count above which constrained rendering down-samples a stroke
pub const DOWNSAMPLE_THRESHOLD: usize = 100;

const FINISHED_STROKE_STEP: usize = 3;
const ACTIVE_STROKE_STEP: usize = 2;

/// One finished freehand gesture
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// 1-based page the stroke belongs to
    pub page: u32,
    pub tool: Tool,
    pub style: StrokeStyle,
    /// Page-normalized points in drawing order, at least two
    pub points: Vec<PagePoint>,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveStroke {
    page: u32,
    tool: Tool,
    style: StrokeStyle,
    points: Vec<PagePoint>,
}

/// One drawing instruction for the overlay
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Wipe the whole overlay
    Clear { width_px: f32, height_px: f32 },
    /// Connected polyline with round caps and joins
    Polyline { points: Vec<(f32, f32)>, style: StrokeStyle },
}

/// Full redraw of one page's overlay
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayFrame {
    pub commands: Vec<DrawCommand>,
}

impl OverlayFrame {
    /// Number of polylines in the frame
    pub fn polyline_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Polyline { .. }))
            .count()
    }
}

/// In-memory annotation state for the open document
///
/// Strokes live only as long as the document stays open; callers reset the
/// engine with [`clear_all`](Self::clear_all) when another document opens.
#[derive(Debug, Clone, Default)]
pub struct AnnotationEngine {
    tool: Tool,
    hue: HighlighterHue,
    constrained: bool,
    overlay: OverlayGeometry,
    strokes: Vec<Stroke>,
    active: Option<ActiveStroke>,
}

impl AnnotationEngine {
    pub fn new(overlay: OverlayGeometry) -> Self {
        Self { overlay, ..Self::default() }
    }

    /// Engine whose renders apply the constrained-device limits
    pub fn constrained(overlay: OverlayGeometry) -> Self {
        Self { overlay, constrained: true, ..Self::default() }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches the active tool. Switching to [`Tool::None`] drops any
    /// stroke in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        if !tool.is_drawing() {
            self.active = None;
        }
        self.tool = tool;
    }

    pub fn hue(&self) -> HighlighterHue {
        self.hue
    }

    pub fn set_highlighter_hue(&mut self, hue: HighlighterHue) {
        self.hue = hue;
    }

    pub fn set_constrained(&mut self, constrained: bool) {
        self.constrained = constrained;
    }

    pub fn overlay(&self) -> &OverlayGeometry {
        &self.overlay
    }

    /// Adopts a new overlay size or orientation. Stored strokes are page
    /// relative and need no adjustment.
    pub fn resize(&mut self, overlay: OverlayGeometry) {
        self.overlay = overlay;
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    /// Begins a stroke on `page` at an overlay-local position.
    ///
    /// Returns `false` when no drawing tool is active, in which case the
    /// input belongs to the document underneath.
    pub fn pointer_down(&mut self, page: u32, x_px: f32, y_px: f32) -> bool {
        let Some(style) = self.tool.style(self.hue) else {
            return false;
        };
        if !self.overlay.is_usable() {
            return false;
        }

        self.active = Some(ActiveStroke {
            page,
            tool: self.tool,
            style,
            points: vec![self.overlay.to_page(x_px, y_px)],
        });
        true
    }

    /// Extends the stroke in progress.
    pub fn pointer_move(&mut self, x_px: f32, y_px: f32) -> bool {
        let point = self.overlay.to_page(x_px, y_px);
        match self.active.as_mut() {
            Some(active) => {
                active.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Finishes the stroke in progress. Taps shorter than two points are
    /// discarded and yield `None`.
    pub fn pointer_up(&mut self) -> Option<&Stroke> {
        let active = self.active.take()?;
        if active.points.len() < 2 {
            tracing::trace!(page = active.page, "discarding single-point tap");
            return None;
        }

        self.strokes.push(Stroke {
            page: active.page,
            tool: active.tool,
            style: active.style,
            points: active.points,
        });
        self.strokes.last()
    }

    /// Abandons the stroke in progress.
    pub fn pointer_cancel(&mut self) {
        self.active = None;
    }

    /// Removes every stroke on `page`. Returns how many were removed.
    pub fn clear(&mut self, page: u32) -> usize {
        let before = self.strokes.len();
        self.strokes.retain(|stroke| stroke.page != page);
        if self.active.as_ref().is_some_and(|active| active.page == page) {
            self.active = None;
        }

        let removed = before - self.strokes.len();
        tracing::debug!(page, removed, "cleared page annotations");
        removed
    }

    /// Drops all strokes, as on document change.
    pub fn clear_all(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn strokes_on(&self, page: u32) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().filter(move |stroke| stroke.page == page)
    }

    /// Builds a full redraw of `page` under the current overlay geometry.
    pub fn render(&self, page: u32) -> OverlayFrame {
        let mut commands = vec![DrawCommand::Clear {
            width_px: self.overlay.width_px,
            height_px: self.overlay.height_px,
        }];

        let on_page: Vec<&Stroke> = self.strokes_on(page).collect();
        let skip = if self.constrained {
            on_page.len().saturating_sub(CONSTRAINED_STROKE_LIMIT)
        } else {
            0
        };

        for stroke in &on_page[skip..] {
            if let Some(points) = self.project(&stroke.points, FINISHED_STROKE_STEP) {
                commands.push(DrawCommand::Polyline { points, style: stroke.style });
            }
        }

        if let Some(active) = self.active.as_ref().filter(|active| active.page == page) {
            if let Some(points) = self.project(&active.points, ACTIVE_STROKE_STEP) {
                commands.push(DrawCommand::Polyline { points, style: active.style });
            }
        }

        OverlayFrame { commands }
    }

    fn project(&self, points: &[PagePoint], step: usize) -> Option<Vec<(f32, f32)>> {
        let (first, rest) = points.split_first()?;
        if rest.is_empty() {
            return None;
        }

        let step = if self.constrained && points.len() > DOWNSAMPLE_THRESHOLD { step } else { 1 };
        let projected = std::iter::once(first)
            .chain(rest.iter().step_by(step))
            .map(|point| self.overlay.to_overlay(*point))
            .collect();
        Some(projected)
    }
}
