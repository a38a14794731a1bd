use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use super::case::TestCase;

/// Feature area a test case belongs to, used for the per-category breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Messaging,
    Friendships,
    Leaderboards,
    Notifications,
    Teams,
    Users,
    Health,
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Messaging => "Messaging",
            Category::Friendships => "Friendships",
            Category::Leaderboards => "Leaderboards",
            Category::Notifications => "Notifications",
            Category::Teams => "Teams",
            Category::Users => "Users",
            Category::Health => "Health",
            Category::Other => "Other",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered keyword rules; the first keyword found in the test name wins.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<(String, Category)>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::from_rules([
            ("message", Category::Messaging),
            ("conversation", Category::Messaging),
            ("friend", Category::Friendships),
            ("leaderboard", Category::Leaderboards),
            ("ranking", Category::Leaderboards),
            ("notification", Category::Notifications),
            ("team", Category::Teams),
            ("user", Category::Users),
            ("profile", Category::Users),
            ("health", Category::Health),
        ])
    }
}

impl CategoryRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_rules<K: Into<String>>(rules: impl IntoIterator<Item = (K, Category)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(keyword, category)| (keyword.into().to_lowercase(), category))
                .collect(),
        }
    }

    /// Append a rule; it is evaluated after every existing rule.
    pub fn push(&mut self, keyword: impl Into<String>, category: Category) {
        self.rules.push((keyword.into().to_lowercase(), category));
    }

    pub fn classify(&self, test_name: &str) -> Category {
        let name = test_name.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| name.contains(keyword.as_str()))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Other)
    }

    /// Explicit case category first, then the keyword rules.
    pub fn categorize(&self, case: &TestCase) -> Category {
        case.category.unwrap_or_else(|| self.classify(&case.name))
    }
}
