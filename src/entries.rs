// src/entries.rs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::Date;

/// Default monthly budget, kg CO2.
pub const DEFAULT_MONTHLY_GOAL: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Transportation,
    Energy,
    Food,
    Waste,
    Water,
    Other,
}

impl EntryType {
    /// Ranking order used when two categories have the same total.
    pub const RANKED: [EntryType; 5] = [
        EntryType::Transportation,
        EntryType::Energy,
        EntryType::Food,
        EntryType::Waste,
        EntryType::Water,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Transportation => "transportation",
            EntryType::Energy => "energy",
            EntryType::Food => "food",
            EntryType::Waste => "waste",
            EntryType::Water => "water",
            EntryType::Other => "other",
        }
    }

    pub fn tips(self) -> &'static [&'static str] {
        match self {
            EntryType::Transportation => &[
                "Use public transportation instead of driving alone",
                "Consider carpooling or ridesharing",
                "Walk or bike for short distances",
                "Maintain your vehicle properly for better fuel efficiency",
                "Consider switching to an electric or hybrid vehicle",
            ],
            EntryType::Energy => &[
                "Switch to LED light bulbs",
                "Unplug electronics when not in use",
                "Use a programmable thermostat",
                "Wash clothes in cold water",
                "Consider installing solar panels",
            ],
            EntryType::Food => &[
                "Reduce meat consumption",
                "Buy local and seasonal produce",
                "Reduce food waste",
                "Grow your own vegetables",
                "Choose organic and sustainably produced food",
            ],
            EntryType::Waste => &[
                "Recycle properly",
                "Compost food scraps",
                "Reduce single-use plastics",
                "Buy products with less packaging",
                "Repair items instead of replacing them",
            ],
            EntryType::Water => &[
                "Fix leaky faucets",
                "Take shorter showers",
                "Install water-efficient fixtures",
                "Collect rainwater for gardening",
                "Only run full loads in dishwasher and washing machine",
            ],
            EntryType::Other => &[],
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transportation" => Ok(EntryType::Transportation),
            "energy" => Ok(EntryType::Energy),
            "food" => Ok(EntryType::Food),
            "waste" => Ok(EntryType::Waste),
            "water" => Ok(EntryType::Water),
            "other" => Ok(EntryType::Other),
            other => Err(EntryError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryUnit {
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "km")]
    Km,
    #[serde(rename = "kWh")]
    KWh,
    #[serde(rename = "L")]
    Litre,
    #[serde(rename = "pieces")]
    Pieces,
    #[serde(rename = "hours")]
    Hours,
    #[serde(rename = "days")]
    Days,
}

impl EntryUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryUnit::Kg => "kg",
            EntryUnit::Km => "km",
            EntryUnit::KWh => "kWh",
            EntryUnit::Litre => "L",
            EntryUnit::Pieces => "pieces",
            EntryUnit::Hours => "hours",
            EntryUnit::Days => "days",
        }
    }
}

impl fmt::Display for EntryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryUnit {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "kg" => Ok(EntryUnit::Kg),
            "km" => Ok(EntryUnit::Km),
            "kWh" | "kwh" => Ok(EntryUnit::KWh),
            "L" | "l" => Ok(EntryUnit::Litre),
            "pieces" => Ok(EntryUnit::Pieces),
            "hours" => Ok(EntryUnit::Hours),
            "days" => Ok(EntryUnit::Days),
            other => Err(EntryError::UnknownUnit(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EntryError {
    #[error("Unknown entry type: {0}")]
    UnknownType(String),
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
    #[error("Quantity must be a positive number, got {0}")]
    InvalidQuantity(f64),
    #[error("Description is required")]
    MissingDescription,
}

/// kg CO2 for one logged activity. Pairings without a known factor emit 0.
pub fn entry_emission(entry_type: EntryType, quantity: f64, unit: EntryUnit) -> f64 {
    match (entry_type, unit) {
        // average car, per km
        (EntryType::Transportation, EntryUnit::Km) => quantity * 0.12,
        // grid electricity, per kWh
        (EntryType::Energy, EntryUnit::KWh) => quantity * 0.5,
        (EntryType::Food, EntryUnit::Kg) => quantity * 2.0,
        (EntryType::Waste, EntryUnit::Kg) => quantity * 0.5,
        (EntryType::Water, EntryUnit::Litre) => quantity * 0.001,
        (EntryType::Other, _) => quantity * 0.1,
        _ => 0.0,
    }
}

/// An activity the user wants to log, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub description: String,
    pub quantity: f64,
    pub unit: EntryUnit,
    pub date: Date,
}

impl NewEntry {
    pub fn validate(&self) -> Result<(), EntryError> {
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(EntryError::InvalidQuantity(self.quantity));
        }
        if self.description.trim().is_empty() {
            return Err(EntryError::MissingDescription);
        }
        Ok(())
    }

    pub fn carbon_emission(&self) -> f64 {
        entry_emission(self.entry_type, self.quantity, self.unit)
    }
}

/// A logged activity as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonEntry {
    pub id: i64,
    pub user: String,
    pub entry_type: EntryType,
    pub description: String,
    pub quantity: f64,
    pub unit: EntryUnit,
    pub carbon_emission: f64,
    pub date: Date,
}

/// Per-category totals over a user's logged entries, kg CO2.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintSummary {
    pub total_emission: f64,
    pub transportation_emission: f64,
    pub energy_emission: f64,
    pub food_emission: f64,
    pub waste_emission: f64,
    pub water_emission: f64,
    pub other_emission: f64,
    pub monthly_goal: f64,
}

impl FootprintSummary {
    pub fn from_entries(entries: &[CarbonEntry], monthly_goal: f64) -> Self {
        let mut s = FootprintSummary {
            monthly_goal,
            ..Default::default()
        };
        for e in entries {
            let slot = match e.entry_type {
                EntryType::Transportation => &mut s.transportation_emission,
                EntryType::Energy => &mut s.energy_emission,
                EntryType::Food => &mut s.food_emission,
                EntryType::Waste => &mut s.waste_emission,
                EntryType::Water => &mut s.water_emission,
                EntryType::Other => &mut s.other_emission,
            };
            *slot += e.carbon_emission;
        }
        s.total_emission = s.transportation_emission
            + s.energy_emission
            + s.food_emission
            + s.waste_emission
            + s.water_emission
            + s.other_emission;
        s
    }

    fn emission_for(&self, t: EntryType) -> f64 {
        match t {
            EntryType::Transportation => self.transportation_emission,
            EntryType::Energy => self.energy_emission,
            EntryType::Food => self.food_emission,
            EntryType::Waste => self.waste_emission,
            EntryType::Water => self.water_emission,
            EntryType::Other => self.other_emission,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTips {
    pub highest_category: EntryType,
    pub tips: Vec<String>,
}

/// Tips for the two categories with the most logged emissions.
pub fn category_tips(summary: &FootprintSummary) -> CategoryTips {
    let mut ranked: Vec<(EntryType, f64)> = EntryType::RANKED
        .iter()
        .map(|&t| (t, summary.emission_for(t)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let top: [EntryType; 2] = [ranked[0].0, ranked[1].0];
    let tips = EntryType::RANKED
        .iter()
        .filter(|t| top.contains(t))
        .flat_map(|t| t.tips().iter().map(|s| s.to_string()))
        .collect();

    CategoryTips {
        highest_category: top[0],
        tips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn stored(entry_type: EntryType, carbon_emission: f64) -> CarbonEntry {
        CarbonEntry {
            id: 0,
            user: "dana".into(),
            entry_type,
            description: "x".into(),
            quantity: 1.0,
            unit: EntryUnit::Kg,
            carbon_emission,
            date: date!(2025 - 03 - 01),
        }
    }

    #[test]
    fn test_entry_emission_factors() {
        assert!(
            (entry_emission(EntryType::Transportation, 100.0, EntryUnit::Km) - 12.0).abs() < 1e-9
        );
        assert_eq!(entry_emission(EntryType::Energy, 300.0, EntryUnit::KWh), 150.0);
        assert_eq!(entry_emission(EntryType::Food, 3.0, EntryUnit::Kg), 6.0);
        assert_eq!(entry_emission(EntryType::Waste, 4.0, EntryUnit::Kg), 2.0);
        assert!((entry_emission(EntryType::Water, 1000.0, EntryUnit::Litre) - 1.0).abs() < 1e-9);
        assert!((entry_emission(EntryType::Other, 10.0, EntryUnit::Hours) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_unit_emits_nothing() {
        assert_eq!(entry_emission(EntryType::Transportation, 100.0, EntryUnit::Kg), 0.0);
        assert_eq!(entry_emission(EntryType::Energy, 100.0, EntryUnit::Days), 0.0);
    }

    #[test]
    fn test_validate() {
        let mut e = NewEntry {
            entry_type: EntryType::Food,
            description: "groceries".into(),
            quantity: 2.0,
            unit: EntryUnit::Kg,
            date: date!(2025 - 03 - 01),
        };
        assert!(e.validate().is_ok());
        e.quantity = -1.0;
        assert_eq!(e.validate(), Err(EntryError::InvalidQuantity(-1.0)));
        e.quantity = 1.0;
        e.description = "  ".into();
        assert_eq!(e.validate(), Err(EntryError::MissingDescription));
    }

    #[test]
    fn test_parse_type_and_unit() {
        assert_eq!("Energy".parse::<EntryType>(), Ok(EntryType::Energy));
        assert!("plastic".parse::<EntryType>().is_err());
        assert_eq!("kwh".parse::<EntryUnit>(), Ok(EntryUnit::KWh));
        assert_eq!("L".parse::<EntryUnit>(), Ok(EntryUnit::Litre));
        assert!("miles".parse::<EntryUnit>().is_err());
    }

    #[test]
    fn test_summary_rolls_up_categories() {
        let entries = vec![
            stored(EntryType::Energy, 150.0),
            stored(EntryType::Energy, 50.0),
            stored(EntryType::Food, 6.0),
            stored(EntryType::Other, 1.0),
        ];
        let s = FootprintSummary::from_entries(&entries, DEFAULT_MONTHLY_GOAL);
        assert_eq!(s.energy_emission, 200.0);
        assert_eq!(s.food_emission, 6.0);
        assert_eq!(s.other_emission, 1.0);
        assert_eq!(s.total_emission, 207.0);
        assert_eq!(s.monthly_goal, 500.0);
    }

    #[test]
    fn test_tips_cover_top_two_in_fixed_order() {
        let entries = vec![stored(EntryType::Water, 10.0), stored(EntryType::Food, 40.0)];
        let s = FootprintSummary::from_entries(&entries, DEFAULT_MONTHLY_GOAL);
        let tips = category_tips(&s);
        assert_eq!(tips.highest_category, EntryType::Food);
        assert_eq!(tips.tips.len(), 10);
        assert_eq!(tips.tips[0], "Reduce meat consumption");
        assert_eq!(tips.tips[5], "Fix leaky faucets");
    }

    #[test]
    fn test_tips_with_no_entries_use_tie_order() {
        let tips = category_tips(&FootprintSummary::default());
        assert_eq!(tips.highest_category, EntryType::Transportation);
        assert_eq!(tips.tips[0], "Use public transportation instead of driving alone");
        assert_eq!(tips.tips[5], "Switch to LED light bulbs");
    }
}
