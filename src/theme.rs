//! Color palette handed to every module so blocks agree on what "warning"
//! and "error" look like.

#[cfg(test)]
const GREEN: &str = "#b5bd68";
const RED: &str = "#cc6666";
const YELLOW: &str = "#f0c674";
const FOREGROUND_DARK: &str = "#ffffff";
const FOREGROUND_LIGHT: &str = "#000000";

/// Bar background the palette is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

/// Display configuration passed to modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub variant: ThemeVariant,
}

impl Theme {
    pub fn new(variant: ThemeVariant) -> Self {
        Self { variant }
    }

    #[cfg(test)]
    pub(crate) fn green(&self) -> &'static str {
        GREEN
    }

    pub fn red(&self) -> &'static str {
        RED
    }

    pub fn yellow(&self) -> &'static str {
        YELLOW
    }

    /// Foreground color readable on the variant's background.
    pub fn normal(&self) -> &'static str {
        match self.variant {
            ThemeVariant::Dark => FOREGROUND_DARK,
            ThemeVariant::Light => FOREGROUND_LIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_follows_variant() {
        assert_eq!(Theme::new(ThemeVariant::Dark).normal(), "#ffffff");
        assert_eq!(Theme::new(ThemeVariant::Light).normal(), "#000000");
    }

    #[test]
    fn accent_colors_are_shared() {
        let dark = Theme::new(ThemeVariant::Dark);
        let light = Theme::new(ThemeVariant::Light);
        assert_eq!(dark.red(), light.red());
        assert_eq!(dark.yellow(), "#f0c674");
        assert_eq!(light.green(), "#b5bd68");
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(ThemeVariant::from_name("Light"), Some(ThemeVariant::Light));
        assert_eq!(ThemeVariant::from_name("DARK"), Some(ThemeVariant::Dark));
        assert_eq!(ThemeVariant::from_name("sepia"), None);
    }
}
