use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An RGBA color. Each channel is a float in the `0.0..=1.0` range.
///
/// The default color is opaque black.
///
/// # Example
/// ```
/// use pdg_structures::Color;
///
/// let translucent_red = Color::new(1.0, 0.0, 0.0, 0.5);
/// assert!(!translucent_red.is_opaque());
///
/// let packed = Color::from_argb(0xFF00FF00);
/// assert_eq!(packed, Color::rgb(0.0, 1.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color.
    pub const fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self::new(red, green, blue, 1.0)
    }

    /// Creates a color from 8 bit channel values.
    pub fn from_bytes(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::new(
            red as f32 / 255.0,
            green as f32 / 255.0,
            blue as f32 / 255.0,
            alpha as f32 / 255.0,
        )
    }

    /// Creates a color from a packed `0xAARRGGBB` value.
    pub fn from_argb(packed: u32) -> Self {
        Self::from_bytes(
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
            ((packed >> 24) & 0xff) as u8,
        )
    }

    /// Packs the color into a `0xAARRGGBB` value, truncating each channel to 8 bits.
    pub fn to_argb(&self) -> u32 {
        (channel_to_byte(self.alpha) as u32) << 24
            | (channel_to_byte(self.red) as u32) << 16
            | (channel_to_byte(self.green) as u32) << 8
            | channel_to_byte(self.blue) as u32
    }

    /// Quantizes the channels to bytes, in `[red, green, blue, alpha]` order.
    ///
    /// # Example
    /// ```
    /// use pdg_structures::Color;
    ///
    /// assert_eq!(Color::new(1.0, 0.5, 0.0, 1.0).to_bytes(), [255, 127, 0, 255]);
    /// ```
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            channel_to_byte(self.red),
            channel_to_byte(self.green),
            channel_to_byte(self.blue),
            channel_to_byte(self.alpha),
        ]
    }

    /// True if the alpha channel quantizes to a full 255.
    pub fn is_opaque(&self) -> bool {
        channel_to_byte(self.alpha) == u8::MAX
    }

    pub fn to_grayscale(&self) -> Self {
        let value = (self.red + self.green + self.blue) / 3.0;
        Self::new(value, value, value, self.alpha)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Color(r: {}, g: {}, b: {}, a: {})",
            self.red, self.green, self.blue, self.alpha
        )
    }
}

/// Quantizes a `0.0..=1.0` channel to a byte. Truncates, and saturates outside the range.
pub(crate) fn channel_to_byte(channel: f32) -> u8 {
    (channel * 255.0) as u8
}
