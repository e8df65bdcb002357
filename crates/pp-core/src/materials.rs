//! Yarn and auxiliary material lines.
//!
//! Line costs are always derived from their inputs and never stored.

use serde::{Deserialize, Serialize};

use crate::numeric::non_negative;
use crate::types::{LineId, ValidationError, require_non_negative, require_positive, require_text};

/// A yarn weighed before and after use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YarnLine {
    pub id: LineId,
    pub name: String,
    pub price_per_gram: f64,
    #[serde(default)]
    pub initial_weight: f64,
    #[serde(default)]
    pub final_weight: f64,
}

impl YarnLine {
    /// Grams consumed: `max(0, initial - final)`.
    pub fn used_weight(&self) -> f64 {
        non_negative(self.initial_weight - self.final_weight)
    }

    pub fn cost(&self) -> f64 {
        self.used_weight() * non_negative(self.price_per_gram)
    }
}

/// An auxiliary material bought by the unit (eyes, stuffing, keyrings...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub id: LineId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl MaterialLine {
    pub fn cost(&self) -> f64 {
        f64::from(self.quantity) * non_negative(self.unit_price)
    }
}

/// User input for a new yarn line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewYarn {
    pub name: String,
    pub price_per_gram: f64,
    pub initial_weight: f64,
    pub final_weight: f64,
}

impl NewYarn {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "yarn name")?;
        require_positive(self.price_per_gram, "price per gram")?;
        validate_weights(self.initial_weight, self.final_weight)
    }

    pub(crate) fn into_line(self, id: LineId) -> YarnLine {
        YarnLine {
            id,
            name: self.name.trim().to_string(),
            price_per_gram: self.price_per_gram,
            initial_weight: self.initial_weight,
            final_weight: self.final_weight,
        }
    }
}

/// User input for a new material line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaterial {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl NewMaterial {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "material name")?;
        validate_quantity(self.quantity)?;
        require_positive(self.unit_price, "unit price")
    }

    pub(crate) fn into_line(self, id: LineId) -> MaterialLine {
        MaterialLine {
            id,
            name: self.name.trim().to_string(),
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Checks a material quantity.
pub const fn validate_quantity(quantity: u32) -> Result<(), ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::NotPositive {
            field: "quantity",
            value: 0.0,
        });
    }
    Ok(())
}

/// Checks a before/after weighing.
pub fn validate_weights(initial_weight: f64, final_weight: f64) -> Result<(), ValidationError> {
    require_non_negative(initial_weight, "initial weight")?;
    require_non_negative(final_weight, "final weight")?;
    if final_weight > initial_weight {
        return Err(ValidationError::FinalExceedsInitial {
            initial_weight,
            final_weight,
        });
    }
    Ok(())
}

/// Allocates the id for the next line, unique across both lists.
pub fn next_line_id(yarns: &[YarnLine], materials: &[MaterialLine]) -> LineId {
    yarns
        .iter()
        .map(|yarn| yarn.id)
        .chain(materials.iter().map(|material| material.id))
        .max()
        .map_or(LineId::FIRST, LineId::next)
}
