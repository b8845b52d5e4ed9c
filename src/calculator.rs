// src/calculator.rs

use crate::numeric::{leading_float, leading_int, round_to};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Pounds of CO2 per unit of each household quantity.
#[derive(Debug, Clone, Copy)]
pub struct EmissionFactors {
    /// lb CO2 per kWh
    pub electricity: f64,
    /// lb CO2 per therm
    pub natural_gas: f64,
    /// lb CO2 per gallon
    pub water: f64,
    /// lb CO2 per lb of waste
    pub waste: f64,
    /// lb CO2 per mile, assuming 25 mpg
    pub transportation: f64,
}

pub const EMISSION_FACTORS: EmissionFactors = EmissionFactors {
    electricity: 0.92,
    natural_gas: 11.7,
    water: 0.008,
    waste: 1.9,
    transportation: 19.6 / 25.0,
};

pub const LBS_PER_METRIC_TON: f64 = 2204.62;
const MONTHS_PER_YEAR: f64 = 12.0;
const WEEKS_PER_YEAR: f64 = 52.0;

/// Percentage band around the regional average that still counts as "Average".
pub const COMPARISON_BAND_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Northeast,
    Midwest,
    South,
    West,
    Pacific,
    #[default]
    Other,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Northeast,
        Region::Midwest,
        Region::South,
        Region::West,
        Region::Pacific,
        Region::Other,
    ];

    /// Case-insensitive lookup; anything unrecognised is `Other`.
    pub fn parse_lossy(raw: &str) -> Self {
        let wanted = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .unwrap_or(Region::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Northeast => "northeast",
            Region::Midwest => "midwest",
            Region::South => "south",
            Region::West => "west",
            Region::Pacific => "pacific",
            Region::Other => "other",
        }
    }

    /// Grid/energy-mix multiplier applied to every annualised category.
    pub fn adjustment_factor(self) -> f64 {
        match self {
            Region::Northeast => 1.1,
            Region::Midwest => 1.2,
            Region::South => 0.9,
            Region::West => 1.0,
            Region::Pacific => 0.8,
            Region::Other => 1.0,
        }
    }

    /// Typical household footprint, tons CO2e per year.
    pub fn yearly_average(self) -> f64 {
        match self {
            Region::Northeast => 10.0,
            Region::Midwest => 12.0,
            Region::South => 11.0,
            Region::West => 9.0,
            Region::Pacific => 8.0,
            Region::Other => 10.0,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Household usage for one billing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageInput {
    /// kWh per month
    pub electricity: f64,
    /// therms per month
    pub natural_gas: f64,
    /// gallons per month
    pub water: f64,
    /// lb per week
    pub waste: f64,
    /// miles per week
    pub transportation: f64,
    pub household_size: u32,
    pub region: Region,
}

impl Default for UsageInput {
    fn default() -> Self {
        Self {
            electricity: 0.0,
            natural_gas: 0.0,
            water: 0.0,
            waste: 0.0,
            transportation: 0.0,
            household_size: 1,
            region: Region::Other,
        }
    }
}

/// Raw field values as a form or command line hands them over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageForm {
    pub electricity: Option<String>,
    pub natural_gas: Option<String>,
    pub water: Option<String>,
    pub waste: Option<String>,
    pub transportation: Option<String>,
    pub household_size: Option<String>,
    pub region: Option<String>,
}

fn quantity(raw: Option<&str>) -> f64 {
    raw.and_then(leading_float).map_or(0.0, non_negative)
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

impl UsageInput {
    /// Coerce raw form values: bad numbers become 0, bad household sizes 1,
    /// unknown regions `Other`.
    pub fn from_form(form: &UsageForm) -> Self {
        let household_size = form
            .household_size
            .as_deref()
            .and_then(leading_int)
            .filter(|&n| n >= 1)
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX));

        Self {
            electricity: quantity(form.electricity.as_deref()),
            natural_gas: quantity(form.natural_gas.as_deref()),
            water: quantity(form.water.as_deref()),
            waste: quantity(form.waste.as_deref()),
            transportation: quantity(form.transportation.as_deref()),
            household_size,
            region: form
                .region
                .as_deref()
                .map(Region::parse_lossy)
                .unwrap_or_default(),
        }
    }

    /// Same rules as [`UsageInput::from_form`] for a record built in code.
    pub fn sanitized(&self) -> Self {
        Self {
            electricity: non_negative(self.electricity),
            natural_gas: non_negative(self.natural_gas),
            water: non_negative(self.water),
            waste: non_negative(self.waste),
            transportation: non_negative(self.transportation),
            household_size: self.household_size.max(1),
            region: self.region,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Better,
    Average,
    Worse,
}

impl Comparison {
    pub fn classify(percentage: f64) -> Self {
        if percentage < -COMPARISON_BAND_PCT {
            Comparison::Better
        } else if percentage > COMPARISON_BAND_PCT {
            Comparison::Worse
        } else {
            Comparison::Average
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Better => "Better",
            Comparison::Average => "Average",
            Comparison::Worse => "Worse",
        };
        f.write_str(s)
    }
}

pub const CHART_LABELS: [&str; 4] = ["Energy", "Transportation", "Waste", "Water"];

/// Parallel label/value arrays, always in [`CHART_LABELS`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

/// Annualised, region-adjusted footprint in metric tons CO2e.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionResult {
    pub total_emission: f64,
    pub per_person_emission: f64,
    pub energy_emission: f64,
    pub transportation_emission: f64,
    pub waste_emission: f64,
    pub water_emission: f64,
    pub comparison: Comparison,
    pub comparison_percentage: f64,
    pub regional_average: f64,
    pub chart_data: ChartData,
}

fn monthly_to_tons(quantity: f64, factor: f64) -> f64 {
    quantity * factor * MONTHS_PER_YEAR / LBS_PER_METRIC_TON
}

fn weekly_to_tons(quantity: f64, factor: f64) -> f64 {
    quantity * factor * WEEKS_PER_YEAR / LBS_PER_METRIC_TON
}

/// Convert household usage into yearly CO2e and compare it with the region.
pub fn calculate_emissions(input: &UsageInput) -> EmissionResult {
    let input = input.sanitized();
    let f = EMISSION_FACTORS;

    let electricity = monthly_to_tons(input.electricity, f.electricity);
    let natural_gas = monthly_to_tons(input.natural_gas, f.natural_gas);
    let water = monthly_to_tons(input.water, f.water);
    let waste = weekly_to_tons(input.waste, f.waste);
    let transportation = weekly_to_tons(input.transportation, f.transportation);

    // Applied to each final category, never to the raw quantities.
    let region_factor = input.region.adjustment_factor();
    let energy = (electricity + natural_gas) * region_factor;
    let water = water * region_factor;
    let waste = waste * region_factor;
    let transportation = transportation * region_factor;

    let total = energy + water + waste + transportation;

    let per_person = if input.household_size > 1 {
        total / f64::from(input.household_size)
    } else {
        total
    };

    let regional_average = input.region.yearly_average();
    let comparison_percentage = (total - regional_average) / regional_average * 100.0;
    let comparison = Comparison::classify(comparison_percentage);

    debug!(
        region = %input.region,
        total,
        comparison_percentage,
        %comparison,
        "Emissions calculated"
    );

    let energy = round_to(energy, 2);
    let transportation = round_to(transportation, 2);
    let waste = round_to(waste, 2);
    let water = round_to(water, 2);

    EmissionResult {
        total_emission: round_to(total, 2),
        per_person_emission: round_to(per_person, 2),
        energy_emission: energy,
        transportation_emission: transportation,
        waste_emission: waste,
        water_emission: water,
        comparison,
        comparison_percentage: round_to(comparison_percentage, 1),
        regional_average,
        chart_data: ChartData {
            labels: CHART_LABELS.iter().map(|l| l.to_string()).collect(),
            data: vec![energy, transportation, waste, water],
        },
    }
}
