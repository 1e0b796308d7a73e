//! Sidebar/content split and other persisted view preferences.

use serde::{Deserialize, Serialize};

/// Smallest sidebar share (percent) an expanded layout may have.
pub const MIN_SIDEBAR: f64 = 18.0;

/// Sidebar shares at or below this are treated as collapsed.
const COLLAPSE_THRESHOLD: f64 = 0.1;

/// Horizontal split between the sidebar and the port list, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelLayout {
    pub layout: [f64; 2],
    pub collapsed: bool,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            layout: Self::DEFAULT_SPLIT,
            collapsed: false,
        }
    }
}

impl PanelLayout {
    pub const DEFAULT_SPLIT: [f64; 2] = [24.0, 76.0];
    pub const COLLAPSED_SPLIT: [f64; 2] = [0.0, 100.0];

    /// Keep the sidebar above its minimum so reopening never restores a
    /// zero-width panel.
    pub fn normalize(split: [f64; 2]) -> [f64; 2] {
        let sidebar = if split[0].is_finite() {
            split[0].max(MIN_SIDEBAR).min(100.0)
        } else {
            Self::DEFAULT_SPLIT[0]
        };
        [sidebar, 100.0 - sidebar]
    }

    /// Split actually rendered.
    pub fn effective(&self) -> [f64; 2] {
        if self.collapsed {
            Self::COLLAPSED_SPLIT
        } else {
            Self::normalize(self.layout)
        }
    }

    /// Apply a split reported by the consumer after a drag.
    pub fn resize(&mut self, split: [f64; 2]) {
        if split[0] <= Self::COLLAPSED_SPLIT[0] + COLLAPSE_THRESHOLD {
            self.collapsed = true;
            return;
        }
        self.layout = Self::normalize(split);
        self.collapsed = false;
    }

    /// Collapse, or restore the last expanded split.
    pub fn toggle_collapsed(&mut self) {
        self.collapsed = !self.collapsed;
        if !self.collapsed {
            self.layout = Self::normalize(self.layout);
        }
    }
}

/// Content shown in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SidebarMode {
    #[default]
    Favorites,
    Stats,
}

impl SidebarMode {
    pub fn toggle(self) -> Self {
        match self {
            SidebarMode::Favorites => SidebarMode::Stats,
            SidebarMode::Stats => SidebarMode::Favorites,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SidebarMode::Favorites => "Port Explorer",
            SidebarMode::Stats => "Port Stats",
        }
    }
}

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl std::str::FromStr for Theme {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(crate::Error::Config(format!("Unknown theme: {}", other))),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_enforces_minimum() {
        assert_eq!(PanelLayout::normalize([5.0, 95.0]), [18.0, 82.0]);
        assert_eq!(PanelLayout::normalize([30.0, 70.0]), [30.0, 70.0]);
        assert_eq!(PanelLayout::normalize([f64::NAN, 0.0]), [24.0, 76.0]);
    }

    #[test]
    fn test_resize_near_zero_collapses() {
        let mut layout = PanelLayout::default();
        layout.resize([30.0, 70.0]);
        layout.resize([0.05, 99.95]);
        assert!(layout.collapsed);
        assert_eq!(layout.effective(), PanelLayout::COLLAPSED_SPLIT);

        layout.toggle_collapsed();
        assert!(!layout.collapsed);
        assert_eq!(layout.effective(), [30.0, 70.0]);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("neon".parse::<Theme>().is_err());
        assert_eq!(Theme::System.to_string(), "system");
    }
}
