//! Product categories and the minerals subcategory split
//!
//! Category + subcategory select the unit conversion rule; both are
//! immutable once items reference them.

use serde::{Deserialize, Serialize};

/// Top-level product class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Draught,
    Bottled,
    Spirits,
    Wine,
    Minerals,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Draught => "draught",
            Category::Bottled => "bottled",
            Category::Spirits => "spirits",
            Category::Wine => "wine",
            Category::Minerals => "minerals",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draught" => Some(Category::Draught),
            "bottled" => Some(Category::Bottled),
            "spirits" => Some(Category::Spirits),
            "wine" => Some(Category::Wine),
            "minerals" => Some(Category::Minerals),
            _ => None,
        }
    }

    pub const ALL: [Category; 5] = [
        Category::Draught,
        Category::Bottled,
        Category::Spirits,
        Category::Wine,
        Category::Minerals,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Draught => write!(f, "Draught"),
            Category::Bottled => write!(f, "Bottled"),
            Category::Spirits => write!(f, "Spirits"),
            Category::Wine => write!(f, "Wine"),
            Category::Minerals => write!(f, "Minerals"),
        }
    }
}

/// Subcategory for minerals items; other categories carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MineralsSubcategory {
    SoftDrinks,
    Syrups,
    Juices,
    Cordials,
    BagInBox,
    BulkJuices,
}

impl MineralsSubcategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MineralsSubcategory::SoftDrinks => "soft_drinks",
            MineralsSubcategory::Syrups => "syrups",
            MineralsSubcategory::Juices => "juices",
            MineralsSubcategory::Cordials => "cordials",
            MineralsSubcategory::BagInBox => "bag_in_box",
            MineralsSubcategory::BulkJuices => "bulk_juices",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "soft_drinks" => Some(MineralsSubcategory::SoftDrinks),
            "syrups" => Some(MineralsSubcategory::Syrups),
            "juices" => Some(MineralsSubcategory::Juices),
            "cordials" => Some(MineralsSubcategory::Cordials),
            "bag_in_box" => Some(MineralsSubcategory::BagInBox),
            "bulk_juices" => Some(MineralsSubcategory::BulkJuices),
            _ => None,
        }
    }
}
