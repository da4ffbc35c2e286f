//! Pixel to absolute-pointer coordinate scaling

use ch9329_protocol::protocol::absolute;

/// Size of the captured video area, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    width: u32,
    height: u32,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl ScreenGeometry {
    /// Zero dimensions are treated as one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Map a pixel position to the 0..=4095 absolute coordinate space.
    ///
    /// Points outside the area are clamped to its edge.
    pub fn to_absolute(&self, x: i64, y: i64) -> (u16, u16) {
        (scale(x, self.width), scale(y, self.height))
    }
}

fn scale(v: i64, extent: u32) -> u16 {
    let v = v.clamp(0, i64::from(extent) - 1) as u64;
    let scaled = v * u64::from(absolute::RESOLUTION) / u64::from(extent);
    scaled.min(u64::from(absolute::MAX)) as u16
}
