//! Report theming.
//!
//! Passed explicitly into the renderer; nothing here is process-wide state.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use validator::{Validate, ValidationError};

/// An sRGB colour, written as `#RRGGBB` in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Components scaled to the 0.0..=1.0 range PDF colour operators expect.
    pub fn components(self) -> [f32; 3] {
        [
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        ]
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl std::str::FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid colour (expected #RRGGBB): {}", s));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_printable_area"))]
pub struct ReportStyle {
    /// Page size in points (A4 by default)
    pub page_width: f32,
    pub page_height: f32,
    #[validate(range(min = 0.0))]
    pub margin: f32,

    #[validate(range(exclusive_min = 0.0))]
    pub title_font_size: f32,
    #[validate(range(exclusive_min = 0.0))]
    pub heading_font_size: f32,
    #[validate(range(exclusive_min = 0.0))]
    pub body_font_size: f32,
    /// Font size of the row-sample table
    #[validate(range(exclusive_min = 0.0))]
    pub sample_font_size: f32,

    pub title_color: Rgb,
    pub heading_color: Rgb,
    pub text_color: Rgb,
    pub header_fill: Rgb,
    pub header_text: Rgb,
    pub label_fill: Rgb,
    pub body_fill: Rgb,
    pub grid_color: Rgb,

    /// Slice colours for the distribution chart, reused cyclically
    pub palette: Vec<Rgb>,

    /// Flate-compress page content streams
    pub compress: bool,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin: 56.0,
            title_font_size: 18.0,
            heading_font_size: 14.0,
            body_font_size: 10.0,
            sample_font_size: 8.0,
            title_color: Rgb(0x00, 0x00, 0x8B),
            heading_color: Rgb(0x00, 0x00, 0x8B),
            text_color: Rgb(0x00, 0x00, 0x00),
            header_fill: Rgb(0x80, 0x80, 0x80),
            header_text: Rgb(0xF5, 0xF5, 0xF5),
            label_fill: Rgb(0xD3, 0xD3, 0xD3),
            body_fill: Rgb(0xF5, 0xF5, 0xDC),
            grid_color: Rgb(0x00, 0x00, 0x00),
            palette: vec![
                Rgb(0xFF, 0x6B, 0x6B),
                Rgb(0x4E, 0xCD, 0xC4),
                Rgb(0x45, 0xB7, 0xD1),
                Rgb(0x96, 0xCE, 0xB4),
                Rgb(0xFF, 0xEA, 0xA7),
                Rgb(0xDD, 0xA0, 0xDD),
                Rgb(0x98, 0xD8, 0xC8),
                Rgb(0xF7, 0xDC, 0x6F),
            ],
            compress: true,
        }
    }
}

impl ReportStyle {
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn slice_color(&self, index: usize) -> Rgb {
        if self.palette.is_empty() {
            return self.header_fill;
        }
        self.palette[index % self.palette.len()]
    }
}

fn validate_printable_area(style: &ReportStyle) -> Result<(), ValidationError> {
    if style.page_width <= 2.0 * style.margin || style.page_height <= 2.0 * style.margin {
        let mut err = ValidationError::new("printable_area");
        err.message = Some(Cow::Borrowed("margins leave no printable area"));
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_parse_and_display() {
        let c: Rgb = "#4ecdc4".parse().unwrap();
        assert_eq!(c, Rgb(0x4E, 0xCD, 0xC4));
        assert_eq!(c.to_string(), "#4ECDC4");
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_default_style_is_valid() {
        let style = ReportStyle::default();
        assert!(style.validate().is_ok());
        assert_eq!(style.slice_color(8), style.palette[0]);
    }

    #[test]
    fn test_style_rejects_oversized_margins() {
        let style = ReportStyle {
            margin: 400.0,
            ..Default::default()
        };
        let errors = style.validate().unwrap_err();
        assert!(errors.to_string().contains("printable area"));
    }

    #[test]
    fn test_style_rejects_non_positive_font_size() {
        let style = ReportStyle {
            body_font_size: 0.0,
            ..Default::default()
        };
        let errors = style.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("body_font_size"));
    }
}
