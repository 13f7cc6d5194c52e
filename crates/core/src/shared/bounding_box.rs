/// An axis-aligned face box in frame pixel coordinates.
///
/// Detectors produce sub-pixel geometry, so coordinates stay `f32` until a
/// consumer needs whole pixels. A box carries no identity: two passes over
/// consecutive frames yield unrelated boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
}

/// Labels closer than this to the top edge are drawn inside the box.
const LABEL_TOP_MARGIN: f32 = 20.0;
const LABEL_LIFT: f32 = 5.0;

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, width: f32, height: f32) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }

    pub fn x_max(&self) -> f32 {
        self.x_min + self.width
    }

    pub fn y_max(&self) -> f32 {
        self.y_min + self.height
    }

    /// The box grown by `padding` pixels on every side.
    pub fn padded(&self, padding: f32) -> Self {
        Self {
            x_min: self.x_min - padding,
            y_min: self.y_min - padding,
            width: self.width + padding * 2.0,
            height: self.height + padding * 2.0,
        }
    }

    /// Horizontal position of the left edge as a whole percentage of the
    /// frame width. Positional only, not an identity.
    pub fn horizontal_percent(&self, frame_width: u32) -> i32 {
        if frame_width == 0 {
            return 0;
        }
        (100.0 * self.x_min / frame_width as f32).round() as i32
    }

    /// Baseline position for the overlay label: just above the box, or
    /// just inside it when the box hugs the top edge.
    pub fn label_anchor(&self) -> (f32, f32) {
        let y = if self.y_min > LABEL_TOP_MARGIN {
            self.y_min - LABEL_LIFT
        } else {
            self.y_min + LABEL_TOP_MARGIN
        };
        (self.x_min, y)
    }

    /// Whole-pixel size, rounding each dimension and never below 1.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x_min.max(other.x_min);
        let iy1 = self.y_min.max(other.y_min);
        let ix2 = self.x_max().min(other.x_max());
        let iy2 = self.y_max().min(other.y_max());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let area_a = self.width * self.height;
        let area_b = other.width * other.height;
        inter / (area_a + area_b - inter)
    }
}
