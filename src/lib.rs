pub mod bill_extract;
pub mod calculator;
pub mod config;
pub mod entries;
pub mod ev_stations;
pub mod footprint;
pub mod footprint_db;
pub mod heuristics;
pub mod history;
pub mod llm_advice;
pub mod numeric;
pub mod recommend;
