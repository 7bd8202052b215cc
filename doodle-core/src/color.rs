/// A straight (non-premultiplied) 8-bit RGBA color.
///
/// On disk this is a hex string, `#rrggbb` for opaque colors and `#rrggbbaa` otherwise.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color code must be 3, 6 or 8 hex digits, found {0}")]
    Length(usize),
    #[error("invalid hex digit in color code {0:?}")]
    Digit(String),
}

impl Color {
    pub const INVISIBLE: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const DARK_GREEN: Self = Self::rgb(0, 153, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const GREY: Self = Self::rgb(153, 153, 153);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.a == 255
    }
    #[must_use]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
    /// Shift every color channel by `by`, saturating. Alpha is untouched.
    #[must_use = "returns a new color and does not modify `self`"]
    pub fn add(self, by: i16) -> Self {
        let shift = |c: u8| (i16::from(c) + by).clamp(0, 255) as u8;
        Self {
            r: shift(self.r),
            g: shift(self.g),
            b: shift(self.b),
            a: self.a,
        }
    }
    #[must_use = "returns a new color and does not modify `self`"]
    pub fn lighten(self, by: u8) -> Self {
        self.add(i16::from(by))
    }
    #[must_use = "returns a new color and does not modify `self`"]
    pub fn darken(self, by: u8) -> Self {
        self.add(-i16::from(by))
    }
}

impl std::str::FromStr for Color {
    type Err = ColorParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(ColorParseError::Digit(s.to_owned()));
        }
        let digit = |i: usize, len: usize| {
            u8::from_str_radix(&hex[i..i + len], 16).map_err(|_| ColorParseError::Digit(s.to_owned()))
        };
        match hex.len() {
            3 => {
                // Short form doubles each digit: F -> FF
                let (r, g, b) = (digit(0, 1)?, digit(1, 1)?, digit(2, 1)?);
                Ok(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Ok(Self::rgb(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?)),
            8 => Ok(Self::rgba(
                digit(0, 2)?,
                digit(2, 2)?,
                digit(4, 2)?,
                digit(6, 2)?,
            )),
            len => Err(ColorParseError::Length(len)),
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if !self.is_opaque() {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(value: Color) -> Self {
        image::Rgba(value.to_array())
    }
}

#[cfg(test)]
mod test {
    use super::{Color, ColorParseError};

    #[test]
    fn parse_forms() {
        assert_eq!("#FF9900".parse(), Ok(Color::rgba(255, 153, 0, 255)));
        assert_eq!("#F90".parse(), Ok(Color::rgba(255, 153, 0, 255)));
        assert_eq!("#FF9900AA".parse(), Ok(Color::rgba(255, 153, 0, 170)));
        // The hash is optional
        assert_eq!("ff9900".parse(), Ok(Color::rgb(255, 153, 0)));
    }
    #[test]
    fn parse_errors() {
        assert!(matches!(
            "#XYZ".parse::<Color>(),
            Err(ColorParseError::Digit(_))
        ));
        assert_eq!("#12345".parse::<Color>(), Err(ColorParseError::Length(5)));
        // Multi-byte chars must not split a slice mid-codepoint.
        assert!("#é12".parse::<Color>().is_err());
    }
    #[test]
    fn display() {
        assert_eq!(Color::rgb(255, 153, 0).to_string(), "#ff9900");
        assert_eq!(Color::rgba(0, 0, 255, 180).to_string(), "#0000ffb4");
    }
    #[test]
    fn json() {
        let water = Color::rgba(0, 0, 255, 180);
        let json = serde_json::to_string(&water).unwrap();
        assert_eq!(json, "\"#0000ffb4\"");
        assert_eq!(serde_json::from_str::<Color>(&json).unwrap(), water);
        assert!(serde_json::from_str::<Color>("\"#nope\"").is_err());
    }
    #[test]
    fn shading() {
        assert_eq!(Color::rgb(250, 10, 100).lighten(10), Color::rgb(255, 20, 110));
        assert_eq!(Color::rgb(250, 10, 100).darken(20), Color::rgb(230, 0, 80));
    }
}
