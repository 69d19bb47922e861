use std::fmt;

/// An 8-bit RGBA color
///
/// The memory layout matches the byte order of an RGBA bitmap,
/// so a slice of colors can be handed to an image encoder as is.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
pub const BLACK: Color = Color::rgb(0, 0, 0);
pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const RED: Color = Color::rgb(255, 0, 0);
pub const GREEN: Color = Color::rgb(0, 255, 0);
pub const BLUE: Color = Color::rgb(0, 0, 255);
/// CSS `darkred`
pub const DARK_RED: Color = Color::rgb(139, 0, 0);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }

    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Packs the color in a u32 with the same byte order as the memory layout
    pub const fn to_bits(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    pub const fn from_bits(bits: u32) -> Self {
        let [r, g, b, a] = bits.to_le_bytes();
        Color { r, g, b, a }
    }

    /// Formats as `#RRGGBB`, the alpha channel is only included when the color is not opaque
    pub fn to_hex_string(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

/// Reinterprets a color slice as RGBA bytes
pub fn as_rgba_bytes(colors: &[Color]) -> &[u8] {
    // SAFETY: Color is #[repr(C)] with four u8 fields, so it has no padding and an alignment of 1
    unsafe { std::slice::from_raw_parts(colors.as_ptr().cast::<u8>(), std::mem::size_of_val(colors)) }
}
