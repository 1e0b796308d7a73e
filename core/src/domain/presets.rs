//! Saved filter presets.

use serde::{Deserialize, Serialize};

/// A user-saved search shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoritePreset {
    pub label: String,
    pub query: String,
}

impl FavoritePreset {
    pub fn new(label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query: query.into(),
        }
    }

    /// Trim both fields. Returns `None` if either ends up empty.
    pub fn normalized(&self) -> Option<Self> {
        let label = self.label.trim();
        let query = self.query.trim();
        if label.is_empty() || query.is_empty() {
            return None;
        }
        Some(Self::new(label, query))
    }

    /// Presets shipped with a fresh install.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("Frontend (3000)", "3000"),
            Self::new("API (8080)", "8080"),
            Self::new("Database (5432)", "5432"),
        ]
    }
}

/// Ordered list of presets with the editing rules of the favorites panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresetList {
    items: Vec<FavoritePreset>,
}

impl PresetList {
    pub fn new(items: Vec<FavoritePreset>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[FavoritePreset] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a preset. Blank or exact-duplicate presets are ignored.
    pub fn add(&mut self, preset: FavoritePreset) -> bool {
        let Some(preset) = preset.normalized() else {
            return false;
        };
        if self.items.contains(&preset) {
            return false;
        }
        self.items.push(preset);
        true
    }

    /// Replace the preset at `index`.
    pub fn update(&mut self, index: usize, preset: FavoritePreset) -> bool {
        let Some(preset) = preset.normalized() else {
            return false;
        };
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = preset;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<FavoritePreset> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }
}
