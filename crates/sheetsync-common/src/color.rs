#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Linear RGB color with channels in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Build from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: f64::from(r) / 255.0,
            g: f64::from(g) / 255.0,
            b: f64::from(b) / 255.0,
        }
    }

    /// Round back to 8-bit channels.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let to8 = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (to8(self.r), to8(self.g), to8(self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb8_roundtrip() {
        let c = Rgb::from_rgb8(255, 0, 128);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert_eq!(c.to_rgb8(), (255, 0, 128));
    }
}
