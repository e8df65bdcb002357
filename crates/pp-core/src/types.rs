//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for user-entered values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A value that must be strictly positive was zero, negative or not a number.
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    /// A value that must not be negative was negative or not a number.
    #[error("{field} cannot be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A yarn was weighed heavier after use than before.
    #[error("final weight ({final_weight} g) exceeds initial weight ({initial_weight} g)")]
    FinalExceedsInitial {
        initial_weight: f64,
        final_weight: f64,
    },

    /// Invalid history sort order.
    #[error("invalid sort order: {value}")]
    InvalidSortOrder { value: String },
}

/// Rejects blank (empty or whitespace-only) text.
pub fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Rejects values that are not finite and strictly positive.
pub fn require_positive(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}

/// Rejects values that are not finite and at least zero.
pub fn require_non_negative(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}

/// Identifier of a yarn or material line within one calculator session.
///
/// Ids are shared between the yarn and material lists so that a single
/// number is unambiguous on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(u64);

impl LineId {
    /// The id given to the first line of an empty session.
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LineId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated saved-piece identifier.
    ///
    /// Assigned by the piece store when a finalized piece is saved.
    PieceId, "piece ID"
);

define_string_id!(
    /// A validated recipe identifier.
    RecipeId, "recipe ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_rejects_blank() {
        assert_eq!(
            require_text("   ", "yarn name"),
            Err(ValidationError::Empty { field: "yarn name" })
        );
        assert!(require_text("Cotton", "yarn name").is_ok());
    }

    #[test]
    fn require_positive_rejects_zero_and_nan() {
        assert!(require_positive(0.0, "price").is_err());
        assert!(require_positive(-1.0, "price").is_err());
        assert!(require_positive(f64::NAN, "price").is_err());
        assert!(require_positive(f64::INFINITY, "price").is_err());
        assert!(require_positive(0.01, "price").is_ok());
    }

    #[test]
    fn require_non_negative_accepts_zero() {
        assert!(require_non_negative(0.0, "weight").is_ok());
        assert!(require_non_negative(-0.5, "weight").is_err());
    }

    #[test]
    fn line_id_parses_and_advances() {
        let id: LineId = " 7 ".parse().unwrap();
        assert_eq!(id, LineId::new(7));
        assert_eq!(id.next(), LineId::new(8));
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn piece_id_rejects_empty() {
        assert!(PieceId::new("").is_err());
        let id = PieceId::new("abc").unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn piece_id_deserialize_validates() {
        let result: Result<PieceId, _> = serde_json::from_str(r#""""#);
        assert!(result.is_err());
        let id: PieceId = serde_json::from_str(r#""p-1""#).unwrap();
        assert_eq!(id.to_string(), "p-1");
    }
}
