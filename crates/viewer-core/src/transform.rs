use pdf_engine::PageSize;

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    pub fn counter_clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg270,
            Self::Deg90 => Self::Deg0,
            Self::Deg180 => Self::Deg90,
            Self::Deg270 => Self::Deg180,
        }
    }

    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Zoom and rotation applied to every page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale: f32,
    rotation: Rotation,
}

impl ViewTransform {
    pub fn new(scale: f32) -> Self {
        Self { scale: clamp_scale(scale), rotation: Rotation::Deg0 }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.scale = clamp_scale(self.scale + ZOOM_STEP);
        self.scale
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.scale = clamp_scale(self.scale - ZOOM_STEP);
        self.scale
    }

    pub fn rotate_clockwise(&mut self) -> Rotation {
        self.rotation = self.rotation.clockwise();
        self.rotation
    }

    pub fn rotate_counter_clockwise(&mut self) -> Rotation {
        self.rotation = self.rotation.counter_clockwise();
        self.rotation
    }

    /// Displayed size of a page in pixels.
    pub fn display_size(&self, page: PageSize) -> (f32, f32) {
        let page = if self.rotation.is_quarter_turn() { page.transposed() } else { page };
        (pt_to_px(page.width_pt) * self.scale, pt_to_px(page.height_pt) * self.scale)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// 72pt to 96px at scale 1.0.
fn pt_to_px(pt: f32) -> f32 {
    pt * 4.0 / 3.0
}

// Scales stay on a two-decimal grid.
fn clamp_scale(scale: f32) -> f32 {
    ((scale * 100.0).round() / 100.0).clamp(MIN_SCALE, MAX_SCALE)
}
