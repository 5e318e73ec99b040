//! Watermark style descriptors.
//!
//! A descriptor is a comma separated list of `key:value` pairs, for example
//! `font:Helvetica, points:12, pos:bc, off:0 10, fillc:#808080, op:0.5, rot:0`.
//! Keys are case-insensitive and accept a long and a short spelling. Keys that are not
//! given keep their default.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Descriptor applied by the watermark endpoint.
pub const DEFAULT_DESCRIPTOR: &str =
    "font:Helvetica, points:12, pos:bc, off:0 10, fillc:#808080, op:0.5, rot:0";

#[derive(Debug, Error, PartialEq)]
pub enum StyleError {
    #[error("malformed descriptor entry '{0}'")]
    Malformed(String),

    #[error("unknown descriptor key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("unsupported font '{0}'")]
    UnsupportedFont(String),
}

/// The 14 standard Type1 fonts every PDF reader ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    const ALL: [StandardFont; 14] = [
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// PostScript name used as `BaseFont`.
    pub fn base_name(self) -> &'static str {
        match self {
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    pub fn is_monospaced(self) -> bool {
        matches!(
            self,
            StandardFont::Courier
                | StandardFont::CourierBold
                | StandardFont::CourierOblique
                | StandardFont::CourierBoldOblique
        )
    }

    /// Symbol and ZapfDingbats carry their own built-in encoding.
    pub fn uses_win_ansi(self) -> bool {
        !matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }
}

impl FromStr for StandardFont {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardFont::ALL
            .into_iter()
            .find(|font| font.base_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| StyleError::UnsupportedFont(s.to_string()))
    }
}

impl fmt::Display for StandardFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Anchor of the watermark on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    TopLeft,
    TopCenter,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl Position {
    pub fn code(self) -> &'static str {
        match self {
            Position::TopLeft => "tl",
            Position::TopCenter => "tc",
            Position::TopRight => "tr",
            Position::Left => "l",
            Position::Center => "c",
            Position::Right => "r",
            Position::BottomLeft => "bl",
            Position::BottomCenter => "bc",
            Position::BottomRight => "br",
        }
    }

    pub fn horizontal(self) -> HorizontalAlign {
        match self {
            Position::TopLeft | Position::Left | Position::BottomLeft => HorizontalAlign::Left,
            Position::TopCenter | Position::Center | Position::BottomCenter => {
                HorizontalAlign::Center
            }
            Position::TopRight | Position::Right | Position::BottomRight => HorizontalAlign::Right,
        }
    }

    pub fn vertical(self) -> VerticalAlign {
        match self {
            Position::TopLeft | Position::TopCenter | Position::TopRight => VerticalAlign::Top,
            Position::Left | Position::Center | Position::Right => VerticalAlign::Middle,
            Position::BottomLeft | Position::BottomCenter | Position::BottomRight => {
                VerticalAlign::Bottom
            }
        }
    }
}

impl FromStr for Position {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tl" => Ok(Position::TopLeft),
            "tc" => Ok(Position::TopCenter),
            "tr" => Ok(Position::TopRight),
            "l" => Ok(Position::Left),
            "c" => Ok(Position::Center),
            "r" => Ok(Position::Right),
            "bl" => Ok(Position::BottomLeft),
            "bc" => Ok(Position::BottomCenter),
            "br" => Ok(Position::BottomRight),
            _ => Err(StyleError::InvalidValue {
                key: "position",
                value: s.to_string(),
            }),
        }
    }
}

/// 8-bit RGB fill colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GRAY: Rgb = Rgb {
        r: 0x80,
        g: 0x80,
        b: 0x80,
    };

    /// Components scaled to the 0..=1 range used by the `rg` operator.
    pub fn components(self) -> [f64; 3] {
        [self.r, self.g, self.b].map(|c| f64::from(c) / 255.0)
    }
}

impl FromStr for Rgb {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StyleError::InvalidValue {
            key: "fillcolor",
            value: s.to_string(),
        };

        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Font, size, placement, colour, opacity and rotation of a text watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkStyle {
    pub font: StandardFont,
    pub points: f64,
    pub position: Position,
    /// Horizontal and vertical displacement from the anchor, in points.
    pub offset: (f64, f64),
    pub fill_color: Rgb,
    pub opacity: f64,
    /// Counter-clockwise rotation in degrees around the text centre.
    pub rotation: f64,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            font: StandardFont::Helvetica,
            points: 12.0,
            position: Position::BottomCenter,
            offset: (0.0, 10.0),
            fill_color: Rgb::GRAY,
            opacity: 0.5,
            rotation: 0.0,
        }
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<f64, StyleError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StyleError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

impl FromStr for WatermarkStyle {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut style = WatermarkStyle::default();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once(':')
                .ok_or_else(|| StyleError::Malformed(entry.to_string()))?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "font" | "fo" => style.font = value.parse()?,
                "points" | "po" => {
                    let points = parse_number("points", value)?;
                    if points <= 0.0 {
                        return Err(StyleError::InvalidValue {
                            key: "points",
                            value: value.to_string(),
                        });
                    }
                    style.points = points;
                }
                "position" | "pos" => style.position = value.parse()?,
                "offset" | "off" => {
                    let parts: Vec<&str> = value.split_whitespace().collect();
                    let [dx, dy] = parts.as_slice() else {
                        return Err(StyleError::InvalidValue {
                            key: "offset",
                            value: value.to_string(),
                        });
                    };
                    style.offset = (parse_number("offset", dx)?, parse_number("offset", dy)?);
                }
                "fillcolor" | "fillc" | "color" => style.fill_color = value.parse()?,
                "opacity" | "op" => {
                    let opacity = parse_number("opacity", value)?;
                    if !(0.0..=1.0).contains(&opacity) {
                        return Err(StyleError::InvalidValue {
                            key: "opacity",
                            value: value.to_string(),
                        });
                    }
                    style.opacity = opacity;
                }
                "rotation" | "rot" => {
                    let rotation = parse_number("rotation", value)?;
                    if !(-180.0..=180.0).contains(&rotation) {
                        return Err(StyleError::InvalidValue {
                            key: "rotation",
                            value: value.to_string(),
                        });
                    }
                    style.rotation = rotation;
                }
                other => return Err(StyleError::UnknownKey(other.to_string())),
            }
        }

        Ok(style)
    }
}

impl fmt::Display for WatermarkStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "font:{}, points:{}, pos:{}, off:{} {}, fillc:{}, op:{}, rot:{}",
            self.font,
            self.points,
            self.position.code(),
            self.offset.0,
            self.offset.1,
            self.fill_color,
            self.opacity,
            self.rotation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_matches_default_descriptor() {
        let parsed: WatermarkStyle = DEFAULT_DESCRIPTOR.parse().unwrap();

        assert_eq!(parsed, WatermarkStyle::default());
        assert_eq!(WatermarkStyle::default().to_string(), DEFAULT_DESCRIPTOR);
    }

    #[test]
    fn empty_descriptor_keeps_defaults() {
        let parsed: WatermarkStyle = "".parse().unwrap();
        assert_eq!(parsed, WatermarkStyle::default());
    }

    #[test]
    fn accepts_long_keys_in_any_case() {
        let parsed: WatermarkStyle =
            "Font:courier-bold, POINTS:36, position:c, offset:-5 0, color:#FF0000, opacity:1, rotation:45"
                .parse()
                .unwrap();

        assert_eq!(parsed.font, StandardFont::CourierBold);
        assert_eq!(parsed.points, 36.0);
        assert_eq!(parsed.position, Position::Center);
        assert_eq!(parsed.offset, (-5.0, 0.0));
        assert_eq!(parsed.fill_color, Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(parsed.opacity, 1.0);
        assert_eq!(parsed.rotation, 45.0);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = "font:Helvetica, glow:yes".parse::<WatermarkStyle>().unwrap_err();
        assert_eq!(err, StyleError::UnknownKey("glow".to_string()));
    }

    #[test]
    fn rejects_entries_without_separator() {
        let err = "Helvetica".parse::<WatermarkStyle>().unwrap_err();
        assert_eq!(err, StyleError::Malformed("Helvetica".to_string()));
    }

    #[test]
    fn rejects_fonts_outside_the_standard_fourteen() {
        let err = "font:Comic Sans".parse::<WatermarkStyle>().unwrap_err();
        assert_eq!(err, StyleError::UnsupportedFont("Comic Sans".to_string()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!("op:1.5".parse::<WatermarkStyle>().is_err());
        assert!("rot:270".parse::<WatermarkStyle>().is_err());
        assert!("points:0".parse::<WatermarkStyle>().is_err());
        assert!("off:10".parse::<WatermarkStyle>().is_err());
        assert!("fillc:808080".parse::<WatermarkStyle>().is_err());
        assert!("fillc:#80808".parse::<WatermarkStyle>().is_err());
        assert!("pos:middle".parse::<WatermarkStyle>().is_err());
    }

    #[test]
    fn gray_components_are_half_intensity() {
        let [r, g, b] = Rgb::GRAY.components();
        assert!((r - 0.50196).abs() < 1e-4);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn position_alignment() {
        assert_eq!(Position::BottomCenter.horizontal(), HorizontalAlign::Center);
        assert_eq!(Position::BottomCenter.vertical(), VerticalAlign::Bottom);
        assert_eq!(Position::TopLeft.horizontal(), HorizontalAlign::Left);
        assert_eq!(Position::Right.vertical(), VerticalAlign::Middle);
    }
}
