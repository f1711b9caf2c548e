use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed spending taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Clothes,
    Transport,
    Entertainment,
    Bills,
    Health,
    Education,
    Travel,
    Gadgets,
    Friends,
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Food,
        Category::Clothes,
        Category::Transport,
        Category::Entertainment,
        Category::Bills,
        Category::Health,
        Category::Education,
        Category::Travel,
        Category::Gadgets,
        Category::Friends,
        Category::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Clothes => "Clothes",
            Self::Transport => "Transport",
            Self::Entertainment => "Entertainment",
            Self::Bills => "Bills",
            Self::Health => "Health",
            Self::Education => "Education",
            Self::Travel => "Travel",
            Self::Gadgets => "Gadgets",
            Self::Friends => "Friends",
            Self::Miscellaneous => "Miscellaneous",
        }
    }

    /// Case-insensitive exact match against the taxonomy.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }

    /// Map any classifier label onto the taxonomy; unknown labels become
    /// `Miscellaneous`.
    pub fn normalize(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::Miscellaneous)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
