use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Color scheme preference. `System` follows the desktop setting.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ThemeChoice {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeChoice {
    /// Resolves `System` against the desktop preference
    pub fn is_dark(self, system_prefers_dark: bool) -> bool {
        match self {
            Self::Light => false,
            Self::Dark => true,
            Self::System => system_prefers_dark,
        }
    }

    /// Light → Dark → System → Light, as a toolbar toggle cycles
    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::System,
            Self::System => Self::Light,
        }
    }
}

/// How document lists are laid out
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Layout {
    #[default]
    Table,
    Cards,
    Kanban,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_theme_serde_matches_display() {
        for theme in ThemeChoice::iter() {
            let json = serde_json::to_string(&theme).unwrap();
            assert_eq!(json, format!("\"{theme}\""));
            assert_eq!(theme.to_string().parse::<ThemeChoice>().unwrap(), theme);
        }
    }

    #[test]
    fn test_next_cycles_back() {
        let start = ThemeChoice::Light;
        assert_eq!(start.next().next().next(), start);
    }

    #[test]
    fn test_is_dark() {
        assert!(ThemeChoice::Dark.is_dark(false));
        assert!(!ThemeChoice::Light.is_dark(true));
        assert!(ThemeChoice::System.is_dark(true));
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("KANBAN".parse::<Layout>().unwrap(), Layout::Kanban);
        assert!("grid".parse::<Layout>().is_err());
    }
}
