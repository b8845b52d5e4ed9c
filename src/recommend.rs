// src/recommend.rs

use crate::calculator::{Comparison, EmissionResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The four categories an [`EmissionResult`] breaks down into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Energy,
    Transportation,
    Waste,
    Water,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Energy => "energy",
            Category::Transportation => "transportation",
            Category::Waste => "waste",
            Category::Water => "water",
        }
    }

    /// Static advice for households whose footprint is dominated by this category.
    pub fn tips(self) -> &'static [&'static str; 4] {
        match self {
            Category::Energy => &ENERGY_TIPS,
            Category::Transportation => &TRANSPORTATION_TIPS,
            Category::Waste => &WASTE_TIPS,
            Category::Water => &WATER_TIPS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const ENERGY_TIPS: [&str; 4] = [
    "Switch to LED light bulbs to reduce electricity usage by up to 75%.",
    "Install a programmable thermostat to optimize heating and cooling.",
    "Consider switching to renewable energy through your utility provider.",
    "Seal air leaks around windows and doors to improve energy efficiency.",
];

pub const TRANSPORTATION_TIPS: [&str; 4] = [
    "Consider carpooling or using public transportation when possible.",
    "Combine errands to reduce the number of trips you take.",
    "Consider an electric or hybrid vehicle for your next car purchase.",
    "Maintain proper tire pressure to improve fuel efficiency.",
];

pub const WASTE_TIPS: [&str; 4] = [
    "Start composting food scraps to reduce landfill waste.",
    "Recycle properly and learn what materials are accepted in your area.",
    "Reduce single-use plastics by using reusable alternatives.",
    "Buy products with minimal packaging or bulk items.",
];

pub const WATER_TIPS: [&str; 4] = [
    "Fix leaky faucets and toilets promptly.",
    "Install low-flow showerheads and faucet aerators.",
    "Collect rainwater for garden irrigation.",
    "Run dishwashers and washing machines only when full.",
];

/// Categories ordered from highest to lowest emission.
///
/// Ties keep input order (energy, transportation, waste, water): `sort_by`
/// is a stable sort.
pub fn rank_categories(result: &EmissionResult) -> [(Category, f64); 4] {
    let mut ranked = [
        (Category::Energy, result.energy_emission),
        (Category::Transportation, result.transportation_emission),
        (Category::Waste, result.waste_emission),
        (Category::Water, result.water_emission),
    ];
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

fn whole_percent(pct: f64) -> i64 {
    pct.abs().round() as i64
}

/// One comparison sentence naming the dominant category, then its four tips.
pub fn generate_recommendations(result: &EmissionResult) -> Vec<String> {
    let highest = rank_categories(result)[0].0;

    let intro = match result.comparison {
        Comparison::Worse => format!(
            "Your carbon footprint is {}% higher than the average in your region. Focus on reducing your {highest} usage for the biggest impact.",
            whole_percent(result.comparison_percentage)
        ),
        Comparison::Better => format!(
            "Great job! Your carbon footprint is {}% lower than the average in your region. You can still improve by focusing on {highest}.",
            whole_percent(result.comparison_percentage)
        ),
        Comparison::Average => format!(
            "Your carbon footprint is about average for your region. You can make the biggest impact by reducing your {highest} usage."
        ),
    };

    let mut recommendations = Vec::with_capacity(5);
    recommendations.push(intro);
    recommendations.extend(highest.tips().iter().map(|t| t.to_string()));
    recommendations
}
