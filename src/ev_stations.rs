// src/ev_stations.rs

use crate::calculator::EmissionResult;
use crate::config::NrelSection;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Energy emissions (tons CO2e per year) above which EV charging stations
/// are suggested.
pub const HIGH_ENERGY_TONS: f64 = 3.0;
pub const NEARBY_LIMIT: u32 = 3;
pub const LISTING_LIMIT: u32 = 10;
pub const EV_INTRO: &str = "Consider switching to an electric vehicle. Nearby charging stations:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelStation {
    pub station_name: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    /// Miles from the search location; only set by nearest-station searches.
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationList {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub fuel_stations: Vec<FuelStation>,
}

#[derive(Debug, Error)]
pub enum StationError {
    #[error("NREL_API_KEY env var not set")]
    MissingApiKey,
    #[error("Bad NREL URL: {0}")]
    BadUrl(String),
    #[error("NREL request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("NREL API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse station list: {0}")]
    Parse(#[from] serde_json::Error),
}

fn api_key() -> Result<String, StationError> {
    std::env::var("NREL_API_KEY").map_err(|_| StationError::MissingApiKey)
}

/// Nearest electric charging stations to the configured location.
pub fn nearest_url(nrel: &NrelSection, api_key: &str) -> Result<Url, StationError> {
    let mut params = vec![
        ("api_key", api_key.to_string()),
        ("fuel_type", "ELEC".to_string()),
        ("limit", NEARBY_LIMIT.to_string()),
    ];
    if let Some(location) = &nrel.location {
        params.push(("location", location.clone()));
    }
    let base = format!("{}/nearest.json", nrel.base_url.trim_end_matches('/'));
    Url::parse_with_params(&base, &params).map_err(|e| StationError::BadUrl(e.to_string()))
}

/// Open electric charging stations, not tied to a location.
pub fn listing_url(nrel: &NrelSection, api_key: &str) -> Result<Url, StationError> {
    let params = [
        ("api_key", api_key.to_string()),
        ("fuel_type", "ELEC".to_string()),
        ("status", "E".to_string()),
        ("limit", LISTING_LIMIT.to_string()),
    ];
    let base = format!("{}.json", nrel.base_url.trim_end_matches('/'));
    Url::parse_with_params(&base, &params).map_err(|e| StationError::BadUrl(e.to_string()))
}

pub fn parse_stations(body: &str) -> Result<StationList, StationError> {
    Ok(serde_json::from_str(body)?)
}

async fn get_json(url: Url) -> Result<String, StationError> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(StationError::Api { status, body });
    }
    Ok(response.text().await?)
}

pub async fn nearby_stations(nrel: &NrelSection) -> Result<StationList, StationError> {
    let url = nearest_url(nrel, &api_key()?)?;
    let list = parse_stations(&get_json(url).await?)?;
    info!(stations = list.fuel_stations.len(), "Nearby charging stations fetched");
    Ok(list)
}

/// The raw station listing as the API returns it.
pub async fn energy_data(nrel: &NrelSection) -> Result<serde_json::Value, StationError> {
    let url = listing_url(nrel, &api_key()?)?;
    Ok(serde_json::from_str(&get_json(url).await?)?)
}

pub fn wants_station_tips(result: &EmissionResult) -> bool {
    result.energy_emission > HIGH_ENERGY_TONS
}

/// The EV suggestion followed by one line per station; empty for no stations.
pub fn station_lines(stations: &[FuelStation]) -> Vec<String> {
    if stations.is_empty() {
        return Vec::new();
    }
    std::iter::once(EV_INTRO.to_string())
        .chain(
            stations
                .iter()
                .map(|s| format!("EV Station: {} at {}", s.station_name, s.street_address)),
        )
        .collect()
}

/// Extra recommendation lines for energy-heavy households. Never fails: a
/// missing key or a failed lookup yields no lines.
pub async fn station_recommendations(result: &EmissionResult, nrel: &NrelSection) -> Vec<String> {
    if !wants_station_tips(result) {
        return Vec::new();
    }
    match nearby_stations(nrel).await {
        Ok(list) => station_lines(&list.fuel_stations),
        Err(StationError::MissingApiKey) => {
            debug!("NREL_API_KEY not set, skipping charging stations");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Charging station lookup failed");
            Vec::new()
        }
    }
}
