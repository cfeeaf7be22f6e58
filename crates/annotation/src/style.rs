//! Drawing tools and their stroke appearance.

/// RGBA color with 8-bit channels and fractional alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    /// Create a new color
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// CSS `rgba(...)` form
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Tool colors
impl Color {
    pub const PENCIL_GRAY: Color = Color::rgb(0x66, 0x66, 0x66);
    pub const PEN_BLACK: Color = Color::rgb(0, 0, 0);
    pub const HIGHLIGHT_YELLOW: Color = Color::new(255, 255, 0, 0.3);
    pub const HIGHLIGHT_BLUE: Color = Color::new(0, 191, 255, 0.3);
    pub const HIGHLIGHT_PINK: Color = Color::new(255, 105, 180, 0.3);
}

/// Active drawing tool
///
/// `None` disables capture so pointer input reaches the document underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    None,
    Highlighter,
    Pencil,
    Pen,
}

impl Tool {
    pub fn is_drawing(self) -> bool {
        self != Tool::None
    }

    /// Stroke width in overlay pixels
    pub fn width(self) -> f32 {
        match self {
            Tool::Highlighter => 20.0,
            Tool::Pen => 4.0,
            Tool::Pencil => 2.0,
            Tool::None => 0.0,
        }
    }

    /// Layer opacity applied on top of the stroke color
    pub fn opacity(self) -> f32 {
        match self {
            Tool::Highlighter => 0.4,
            _ => 1.0,
        }
    }

    /// Resolved style, or `None` when the tool does not draw
    pub fn style(self, hue: HighlighterHue) -> Option<StrokeStyle> {
        let color = match self {
            Tool::None => return None,
            Tool::Highlighter => hue.color(),
            Tool::Pencil => Color::PENCIL_GRAY,
            Tool::Pen => Color::PEN_BLACK,
        };
        Some(StrokeStyle { color, width: self.width(), opacity: self.opacity() })
    }
}

/// User-selectable highlighter hue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HighlighterHue {
    #[default]
    Yellow,
    Blue,
    Pink,
}

impl HighlighterHue {
    pub fn color(self) -> Color {
        match self {
            HighlighterHue::Yellow => Color::HIGHLIGHT_YELLOW,
            HighlighterHue::Blue => Color::HIGHLIGHT_BLUE,
            HighlighterHue::Pink => Color::HIGHLIGHT_PINK,
        }
    }
}

/// Stroke appearance, fixed when the stroke begins
///
/// Strokes are always drawn with round caps and joins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
}
