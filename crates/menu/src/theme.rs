//! Per-venue display theme.
//!
//! An immutable value: every `with_*` call returns a new theme and leaves the
//! original untouched. The infra `ThemeStore` swaps whole snapshots per tenant.

use serde::{Deserialize, Serialize};

use bistro_core::{DomainError, DomainResult, ValueObject};

/// `#RRGGBB` color, stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let raw = raw.as_ref().trim();
        let digits = raw
            .strip_prefix('#')
            .ok_or_else(|| DomainError::validation(format!("color '{raw}' must start with '#'")))?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::validation(format!(
                "color '{raw}' must be #RRGGBB"
            )));
        }
        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

impl core::fmt::Display for HexColor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: HexColor,
    pub secondary: HexColor,
    pub background: HexColor,
    pub text: HexColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: HexColor("#8b4513".to_string()),
            secondary: HexColor("#d2691e".to_string()),
            background: HexColor("#fffaf0".to_string()),
            text: HexColor("#2f2f2f".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuLayout {
    Grid,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTheme {
    palette: Palette,
    font_family: String,
    layout: MenuLayout,
    show_prices: bool,
    show_descriptions: bool,
}

impl ValueObject for MenuTheme {}

impl Default for MenuTheme {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            font_family: "Inter".to_string(),
            layout: MenuLayout::Grid,
            show_prices: true,
            show_descriptions: true,
        }
    }
}

impl MenuTheme {
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn layout(&self) -> MenuLayout {
        self.layout
    }

    pub fn show_prices(&self) -> bool {
        self.show_prices
    }

    pub fn show_descriptions(&self) -> bool {
        self.show_descriptions
    }

    pub fn with_palette(&self, palette: Palette) -> Self {
        Self {
            palette,
            ..self.clone()
        }
    }

    pub fn with_primary(&self, color: HexColor) -> Self {
        let mut palette = self.palette.clone();
        palette.primary = color;
        self.with_palette(palette)
    }

    pub fn with_font_family(&self, font_family: impl Into<String>) -> DomainResult<Self> {
        let font_family = font_family.into();
        if font_family.trim().is_empty() {
            return Err(DomainError::validation("font family cannot be empty"));
        }
        Ok(Self {
            font_family,
            ..self.clone()
        })
    }

    pub fn with_layout(&self, layout: MenuLayout) -> Self {
        Self {
            layout,
            ..self.clone()
        }
    }

    pub fn with_show_prices(&self, show_prices: bool) -> Self {
        Self {
            show_prices,
            ..self.clone()
        }
    }

    pub fn with_show_descriptions(&self, show_descriptions: bool) -> Self {
        Self {
            show_descriptions,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_are_validated_and_lowercased() {
        assert_eq!(HexColor::parse("#AABBCC").unwrap().as_str(), "#aabbcc");
        assert!(HexColor::parse("AABBCC").is_err());
        assert!(HexColor::parse("#abc").is_err());
        assert!(HexColor::parse("#gggggg").is_err());
        assert!(serde_json::from_str::<HexColor>("\"#12345\"").is_err());
    }

    #[test]
    fn updates_leave_original_untouched() {
        let original = MenuTheme::default();
        let dark = original
            .with_primary(HexColor::parse("#000000").unwrap())
            .with_layout(MenuLayout::List)
            .with_show_prices(false);

        assert_eq!(original, MenuTheme::default());
        assert_eq!(dark.palette().primary.as_str(), "#000000");
        assert_eq!(dark.layout(), MenuLayout::List);
        assert!(!dark.show_prices());
        assert_eq!(dark.font_family(), original.font_family());
    }

    #[test]
    fn empty_font_is_rejected() {
        assert!(MenuTheme::default().with_font_family(" ").is_err());
        let serif = MenuTheme::default().with_font_family("Georgia").unwrap();
        assert_eq!(serif.font_family(), "Georgia");
    }
}
