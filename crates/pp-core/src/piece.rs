//! Saved pieces and recipes.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cost::CostBreakdown;
use crate::materials::{MaterialLine, YarnLine};
use crate::types::{PieceId, RecipeId, ValidationError};

/// A finalized, priced piece as handed to the piece store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    pub name: String,
    pub piece_type: String,
    pub breakdown: CostBreakdown,
    pub yarns: Vec<YarnLine>,
    pub materials: Vec<MaterialLine>,
    pub productive_seconds: u64,
    #[serde(default)]
    pub rework_seconds: u64,
    pub hourly_rate: f64,
    pub indirect_percent: f64,
    pub margin_percent: f64,
    pub saved_at: DateTime<Utc>,
}

impl PieceSnapshot {
    /// Name of the first amount that is NaN or infinite, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        self.breakdown
            .amounts()
            .into_iter()
            .chain([
                ("hourly_rate", self.hourly_rate),
                ("indirect_percent", self.indirect_percent),
                ("margin_percent", self.margin_percent),
            ])
            .find(|(_, value)| !value.is_finite())
            .map(|(field, _)| field)
    }
}

/// A piece stored in the history.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPiece {
    pub id: PieceId,
    pub piece: PieceSnapshot,
}

/// A reusable list of materials with notes on how to make the piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSnapshot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: String,
    #[serde(default)]
    pub sale_price: f64,
    #[serde(default)]
    pub piece_type: String,
    #[serde(default)]
    pub yarns: Vec<YarnLine>,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
    #[serde(default)]
    pub productive_seconds: u64,
    #[serde(default)]
    pub indirect_percent: Option<f64>,
    #[serde(default)]
    pub margin_percent: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A recipe stored in the recipe book.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecipe {
    pub id: RecipeId,
    pub recipe: RecipeSnapshot,
}

/// Ordering of the piece history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySort {
    /// Most recently saved first.
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
    NameDesc,
}

impl HistorySort {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
        }
    }

    fn compare(self, a: &SavedPiece, b: &SavedPiece) -> Ordering {
        match self {
            Self::DateDesc => b.piece.saved_at.cmp(&a.piece.saved_at),
            Self::DateAsc => a.piece.saved_at.cmp(&b.piece.saved_at),
            Self::NameAsc => compare_names(&a.piece.name, &b.piece.name),
            Self::NameDesc => compare_names(&b.piece.name, &a.piece.name),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl fmt::Display for HistorySort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HistorySort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_desc" => Ok(Self::DateDesc),
            "date_asc" => Ok(Self::DateAsc),
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            _ => Err(ValidationError::InvalidSortOrder {
                value: s.to_string(),
            }),
        }
    }
}

/// Search and ordering applied to the piece history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Case-insensitive substring matched against name and type.
    pub search: String,
    pub sort: HistorySort,
}

impl HistoryQuery {
    fn matches(&self, piece: &PieceSnapshot) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || piece.name.to_lowercase().contains(&needle)
            || piece.piece_type.to_lowercase().contains(&needle)
    }

    /// Filters and orders `pieces`. The sort is stable.
    pub fn apply<'a>(&self, pieces: &'a [SavedPiece]) -> Vec<&'a SavedPiece> {
        let mut selected: Vec<&SavedPiece> = pieces
            .iter()
            .filter(|saved| self.matches(&saved.piece))
            .collect();
        selected.sort_by(|a, b| self.sort.compare(a, b));
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn saved(id: &str, name: &str, piece_type: &str, day: u32) -> SavedPiece {
        SavedPiece {
            id: PieceId::new(id).unwrap(),
            piece: PieceSnapshot {
                name: name.to_string(),
                piece_type: piece_type.to_string(),
                breakdown: CostBreakdown::default(),
                yarns: Vec::new(),
                materials: Vec::new(),
                productive_seconds: 0,
                rework_seconds: 0,
                hourly_rate: 30.0,
                indirect_percent: 15.0,
                margin_percent: 30.0,
                saved_at: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
            },
        }
    }

    fn history() -> Vec<SavedPiece> {
        vec![
            saved("a", "Bunny", "Amigurumi", 3),
            saved("b", "beanie", "Hat", 1),
            saved("c", "Dragon", "Amigurumi", 2),
        ]
    }

    fn ids(pieces: &[&SavedPiece]) -> Vec<String> {
        pieces.iter().map(|saved| saved.id.to_string()).collect()
    }

    #[test]
    fn non_finite_field_names_the_bad_amount() {
        let mut piece = saved("a", "Bunny", "Amigurumi", 1).piece;
        assert_eq!(piece.non_finite_field(), None);
        piece.breakdown.final_price = f64::INFINITY;
        assert_eq!(piece.non_finite_field(), Some("final_price"));
        piece.breakdown.final_price = 0.0;
        piece.hourly_rate = f64::NAN;
        assert_eq!(piece.non_finite_field(), Some("hourly_rate"));
    }

    #[test]
    fn default_query_sorts_newest_first() {
        let pieces = history();
        let result = HistoryQuery::default().apply(&pieces);
        assert_eq!(ids(&result), ["a", "c", "b"]);
    }

    #[test]
    fn sort_orders() {
        let pieces = history();
        let by = |sort| {
            ids(&HistoryQuery {
                search: String::new(),
                sort,
            }
            .apply(&pieces))
        };
        assert_eq!(by(HistorySort::DateAsc), ["b", "c", "a"]);
        assert_eq!(by(HistorySort::NameAsc), ["b", "a", "c"]);
        assert_eq!(by(HistorySort::NameDesc), ["c", "a", "b"]);
    }

    #[test]
    fn search_matches_name_or_type_case_insensitively() {
        let pieces = history();
        let query = HistoryQuery {
            search: "AMIGU".to_string(),
            sort: HistorySort::NameAsc,
        };
        assert_eq!(ids(&query.apply(&pieces)), ["a", "c"]);

        let query = HistoryQuery {
            search: "bean".to_string(),
            sort: HistorySort::default(),
        };
        assert_eq!(ids(&query.apply(&pieces)), ["b"]);
    }

    #[test]
    fn sort_parses_from_str() {
        assert_eq!("name_desc".parse::<HistorySort>().unwrap(), HistorySort::NameDesc);
        assert_eq!(HistorySort::DateAsc.to_string(), "date_asc");
        assert!(matches!(
            "newest".parse::<HistorySort>(),
            Err(ValidationError::InvalidSortOrder { .. })
        ));
    }

    #[test]
    fn recipe_tolerates_missing_optional_fields() {
        let recipe: RecipeSnapshot = serde_json::from_str(
            r#"{"name": "Bunny", "created_at": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(recipe.name, "Bunny");
        assert!(recipe.yarns.is_empty());
        assert_eq!(recipe.indirect_percent, None);
    }
}
