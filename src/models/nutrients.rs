//! Nutrient profile shared by ingredients and aggregated mixtures
//!
//! Holds the eight values required on an EU nutrition declaration.

use serde::{Deserialize, Serialize};

/// Sentinel marking a nutrient value as unknown
pub const MISSING: f64 = -1.0;

/// One of the eight declared nutrients
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    EnergyKj,
    EnergyKcal,
    Fat,
    Saturates,
    Carbohydrates,
    Sugars,
    Protein,
    Salt,
}

impl Nutrient {
    /// All nutrients in declaration order
    pub const ALL: [Nutrient; 8] = [
        Nutrient::EnergyKj,
        Nutrient::EnergyKcal,
        Nutrient::Fat,
        Nutrient::Saturates,
        Nutrient::Carbohydrates,
        Nutrient::Sugars,
        Nutrient::Protein,
        Nutrient::Salt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::EnergyKj => "energy_kj",
            Nutrient::EnergyKcal => "energy_kcal",
            Nutrient::Fat => "fat",
            Nutrient::Saturates => "saturates",
            Nutrient::Carbohydrates => "carbohydrates",
            Nutrient::Sugars => "sugars",
            Nutrient::Protein => "protein",
            Nutrient::Salt => "salt",
        }
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nutrient values per 100 g
///
/// Energy is in kJ and kcal, everything else in grams (salt included).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub energy_kj: f64,
    pub energy_kcal: f64,
    pub fat: f64,
    pub saturates: f64,
    pub carbohydrates: f64,
    pub sugars: f64,
    pub protein: f64,
    pub salt: f64,
}

impl NutrientProfile {
    /// Profile with all values set to zero
    pub fn zero() -> Self {
        Self::default()
    }

    /// Profile with every value marked missing
    pub fn missing() -> Self {
        Self::from_values([MISSING; 8])
    }

    /// Build from values in declaration order
    pub fn from_values(values: [f64; 8]) -> Self {
        Self {
            energy_kj: values[0],
            energy_kcal: values[1],
            fat: values[2],
            saturates: values[3],
            carbohydrates: values[4],
            sugars: values[5],
            protein: values[6],
            salt: values[7],
        }
    }

    /// Values in declaration order
    pub fn values(&self) -> [f64; 8] {
        Nutrient::ALL.map(|n| self.get(n))
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::EnergyKj => self.energy_kj,
            Nutrient::EnergyKcal => self.energy_kcal,
            Nutrient::Fat => self.fat,
            Nutrient::Saturates => self.saturates,
            Nutrient::Carbohydrates => self.carbohydrates,
            Nutrient::Sugars => self.sugars,
            Nutrient::Protein => self.protein,
            Nutrient::Salt => self.salt,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        let slot = match nutrient {
            Nutrient::EnergyKj => &mut self.energy_kj,
            Nutrient::EnergyKcal => &mut self.energy_kcal,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Saturates => &mut self.saturates,
            Nutrient::Carbohydrates => &mut self.carbohydrates,
            Nutrient::Sugars => &mut self.sugars,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Salt => &mut self.salt,
        };
        *slot = value;
    }

    /// Whether the value for a nutrient is the missing sentinel
    pub fn is_missing(&self, nutrient: Nutrient) -> bool {
        self.get(nutrient) == MISSING
    }

    /// Nutrients whose values are the missing sentinel
    pub fn missing_nutrients(&self) -> Vec<Nutrient> {
        Nutrient::ALL
            .into_iter()
            .filter(|n| self.is_missing(*n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_round_trip_declaration_order() {
        let values = [1500.0, 358.0, 7.0, 1.2, 60.0, 1.0, 13.0, 0.01];
        let profile = NutrientProfile::from_values(values);
        assert_eq!(profile.values(), values);
        assert_eq!(profile.get(Nutrient::Saturates), 1.2);
        assert_eq!(profile.get(Nutrient::Salt), 0.01);
    }

    #[test]
    fn test_missing_sentinel() {
        let mut profile = NutrientProfile::zero();
        assert!(profile.missing_nutrients().is_empty());

        profile.set(Nutrient::Sugars, MISSING);
        assert!(profile.is_missing(Nutrient::Sugars));
        assert!(!profile.is_missing(Nutrient::Fat));
        assert_eq!(profile.missing_nutrients(), vec![Nutrient::Sugars]);

        assert_eq!(NutrientProfile::missing().missing_nutrients().len(), 8);
    }

    #[test]
    fn test_zero_is_not_missing() {
        let profile = NutrientProfile::zero();
        assert!(!profile.is_missing(Nutrient::Salt));
    }
}
