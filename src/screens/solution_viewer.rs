//! Pinch-zoom and pan over a single solution image.
//!
//! The image is laid out to fill its container at scale 1. Zooming multiplies the scale
//! (bounded to [`MIN_SCALE`, `MAX_SCALE`]) and panning moves the image, but never so far
//! that empty space beyond the scaled image's edge comes into view.

pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Offset { x, y }
    }
}

impl std::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Size { width, height }
    }
}

/// One incremental transform event: `zoom` is a scale factor relative to the
/// current scale, `pan` a translation delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub zoom: f32,
    pub pan: Offset,
}

impl Gesture {
    pub fn zoom(zoom: f32) -> Self {
        Gesture {
            zoom,
            pan: Offset::ZERO,
        }
    }

    pub fn pan(dx: f32, dy: f32) -> Self {
        Gesture {
            zoom: 1.0,
            pan: Offset::new(dx, dy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    scale: f32,
    offset: Offset,
    container: Size,
}

impl ZoomState {
    pub fn new(container: Size) -> Self {
        ZoomState {
            scale: MIN_SCALE,
            offset: Offset::ZERO,
            container,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// Largest offset magnitude per axis at `scale`.
    fn bounds(&self, scale: f32) -> Offset {
        Offset::new(
            ((self.container.width * scale - self.container.width) / 2.0).max(0.0),
            ((self.container.height * scale - self.container.height) / 2.0).max(0.0),
        )
    }

    pub fn apply(&mut self, gesture: Gesture) {
        let scale = clamp_scale(self.scale * gesture.zoom);
        let bounds = self.bounds(scale);
        let moved = self.offset + gesture.pan;
        self.offset = Offset::new(
            moved.x.clamp(-bounds.x, bounds.x),
            moved.y.clamp(-bounds.y, bounds.y),
        );
        self.scale = scale;
    }

    /// Container changed size; keep the current offset inside the new bounds.
    pub fn resize(&mut self, container: Size) {
        self.container = container;
        self.apply(Gesture::zoom(1.0));
    }
}

fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return MIN_SCALE;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Full-screen viewer for one image URL. State starts fresh on every open.
#[derive(Debug, Clone)]
pub struct SolutionViewerScreen {
    image_url: String,
    zoom: ZoomState,
}

impl SolutionViewerScreen {
    pub fn new(image_url: impl Into<String>, container: Size) -> Self {
        SolutionViewerScreen {
            image_url: image_url.into(),
            zoom: ZoomState::new(container),
        }
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn on_gesture(&mut self, gesture: Gesture) {
        self.zoom.apply(gesture);
        tracing::trace!(scale = self.zoom.scale, x = self.zoom.offset.x, y = self.zoom.offset.y, "gesture");
    }

    pub fn on_resize(&mut self, container: Size) {
        self.zoom.resize(container);
    }
}
