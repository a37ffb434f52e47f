/// Vertical extent of an element relative to the top of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    /// Zero-height marker at `y`, the usual shape of a sentinel.
    pub fn marker(y: f64) -> Self {
        Self { top: y, bottom: y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub height: f64,
}

impl Viewport {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityRule {
    /// Top edge within `[0, height]` and bottom edge at or above `height`.
    #[default]
    Contained,
    /// Bottom edge at or above `height` only. Also matches elements that have
    /// scrolled off the top of the viewport.
    BottomEdge,
}

impl VisibilityRule {
    pub fn is_visible(self, rect: Rect, viewport: Viewport) -> bool {
        let bottom_in = rect.bottom <= viewport.height;
        match self {
            VisibilityRule::BottomEdge => bottom_in,
            VisibilityRule::Contained => {
                bottom_in && rect.top >= 0.0 && rect.top <= viewport.height
            }
        }
    }
}
