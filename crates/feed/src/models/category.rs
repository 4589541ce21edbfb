// ABOUTME: Categories (tags, subjects) of feeds and entries.
// ABOUTME: CategoryCollection builds unique display lists preferring human-friendly labels.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Machine name; categories without one are not kept.
    pub name: String,
    /// Human-friendly display variant.
    pub label: Option<String>,
    /// Scheme or taxonomy identifier.
    pub domain: Option<String>,
    pub subcategory: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn display(&self, human_friendly: bool) -> &str {
        match self.label.as_deref() {
            Some(label) if human_friendly && !label.trim().is_empty() => label,
            _ => &self.name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display(true))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCollection(Vec<Category>);

impl CategoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a category unless its name is empty.
    pub fn push(&mut self, category: Category) {
        if !category.name.trim().is_empty() {
            self.0.push(category);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.0.iter()
    }

    /// Unique display strings in first-seen order.
    pub fn list(&self, human_friendly: bool) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for category in &self.0 {
            let display = category.display(human_friendly).trim();
            if display.is_empty() || out.iter().any(|seen| seen == display) {
                continue;
            }
            out.push(display.to_string());
        }
        out
    }
}

impl FromIterator<Category> for CategoryCollection {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut out = CategoryCollection::new();
        for category in iter {
            out.push(category);
        }
        out
    }
}

impl<'a> IntoIterator for &'a CategoryCollection {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
