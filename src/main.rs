use carbon_coach::bill_extract::{self, BillFormat, ExtractOptions};
use carbon_coach::calculator::{Region, UsageForm, UsageInput};
use carbon_coach::config::{Config, DEFAULT_CONFIG_PATH};
use carbon_coach::entries::{self, EntryType, FootprintSummary, NewEntry};
use carbon_coach::ev_stations;
use carbon_coach::footprint;
use carbon_coach::footprint_db::FootprintStore;
use carbon_coach::history::{self, HistoricalEntry};
use carbon_coach::llm_advice;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use time::Date;
use time::macros::format_description;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "carbon-coach")]
#[command(version, about = "Household carbon footprint calculator and coach")]
struct Cli {
    /// Config file (TOML); missing means defaults
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate a household footprint, optionally reading a bill
    Calculate(CalculateArgs),
    /// Read the electricity usage from a bill and print what was found
    Extract { path: PathBuf },
    /// Analyse stored readings against the most recent one
    History {
        #[arg(long)]
        user: String,
    },
    /// Individual activity entries
    #[command(subcommand)]
    Entry(EntryCommand),
    /// Summary of a user's entries with tips for their top categories
    Tips {
        #[arg(long)]
        user: String,
    },
    /// Set a user's monthly goal (kg CO2)
    Goal {
        #[arg(long)]
        user: String,
        #[arg(long)]
        value: f64,
    },
    /// Ask the configured model for sustainable living tips
    SustainableTips {
        #[arg(long)]
        category: Option<String>,
    },
    /// List open EV charging stations from the NREL API
    EnergyData,
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Values are taken as typed; unreadable numbers count as 0.
#[derive(clap::Args, Debug)]
struct CalculateArgs {
    /// kWh per month
    #[arg(long, allow_hyphen_values = true)]
    electricity: Option<String>,
    /// therms per month
    #[arg(long, allow_hyphen_values = true)]
    natural_gas: Option<String>,
    /// gallons per month
    #[arg(long, allow_hyphen_values = true)]
    water: Option<String>,
    /// lb per week
    #[arg(long, allow_hyphen_values = true)]
    waste: Option<String>,
    /// miles per week
    #[arg(long, allow_hyphen_values = true)]
    transportation: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    household_size: Option<String>,
    /// northeast, midwest, south, west, pacific or other
    #[arg(long)]
    region: Option<String>,
    /// PDF, JPG or PNG bill to read the electricity usage from
    #[arg(long, value_name = "PATH")]
    bill: Option<PathBuf>,
    /// Compare with and record into this user's history
    #[arg(long)]
    user: Option<String>,
    /// Reading date, YYYY-MM-DD (default today)
    #[arg(long)]
    date: Option<String>,
    /// Also ask the configured model for a reduction plan
    #[arg(long)]
    advice: bool,
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    Add {
        #[arg(long)]
        user: String,
        /// transportation, energy, food, waste, water or other
        #[arg(long = "type")]
        entry_type: String,
        #[arg(long)]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        quantity: f64,
        /// kg, km, kWh, L, pieces, hours or days
        #[arg(long)]
        unit: String,
        #[arg(long)]
        date: Option<String>,
    },
    List {
        #[arg(long)]
        user: String,
    },
    Delete {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Store the region and household size used when flags are absent
    SetDefaults {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        household_size: Option<u32>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TipsOutput {
    summary: FootprintSummary,
    #[serde(flatten)]
    tips: entries::CategoryTips,
}

fn parse_date(raw: Option<&str>) -> Result<Date, Box<dyn std::error::Error>> {
    match raw {
        Some(s) => Ok(Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))?),
        None => Ok(time::OffsetDateTime::now_utc().date()),
    }
}

/// The stored tips for a known category, else the first tip of each one.
fn builtin_tips(category: Option<&str>) -> Vec<&'static str> {
    match category.and_then(|c| c.parse::<EntryType>().ok()) {
        Some(t) if !t.tips().is_empty() => t.tips().to_vec(),
        _ => EntryType::RANKED.iter().map(|t| t.tips()[0]).collect(),
    }
}

fn open_store(cfg: &Config) -> Result<FootprintStore, Box<dyn std::error::Error>> {
    if let Some(parent) = std::path::Path::new(&cfg.db_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(FootprintStore::new(&cfg.db_path)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    match cli.command {
        Command::Calculate(args) => calculate(&cfg, args).await?,
        Command::Extract { path } => {
            BillFormat::from_path(&path)?;
            let opts = ExtractOptions {
                ocr_language: cfg.ocr.language.clone(),
            };
            print_json(&bill_extract::extract_bill_with(&path, &opts).await?)?;
        }
        Command::History { user } => {
            let db = open_store(&cfg)?;
            let mut readings = db.readings_for(&user)?;
            let Some(latest) = readings.pop() else {
                println!("No readings stored for {user}");
                return Ok(());
            };
            let past: Vec<HistoricalEntry> = readings
                .into_iter()
                .map(|r| HistoricalEntry {
                    electricity: Some(r.input.electricity),
                    date: r.date,
                })
                .collect();
            print_json(&history::analyze_history(&past, &latest.input))?;
        }
        Command::Entry(cmd) => entry(&cfg, cmd)?,
        Command::Tips { user } => {
            let db = open_store(&cfg)?;
            let summary =
                FootprintSummary::from_entries(&db.entries_for(&user)?, db.monthly_goal(&user)?);
            let tips = entries::category_tips(&summary);
            print_json(&TipsOutput { summary, tips })?;
        }
        Command::Goal { user, value } => {
            let db = open_store(&cfg)?;
            db.set_monthly_goal(&user, value)?;
            println!("Monthly goal for {user} set to {value} kg CO2");
        }
        Command::SustainableTips { category } => {
            match llm_advice::sustainable_tips(category.as_deref(), &cfg.llm).await {
                Ok(tips) => print_json(&tips)?,
                Err(e) => {
                    warn!(error = %e, "Could not fetch tips, showing built-in ones");
                    print_json(&builtin_tips(category.as_deref()))?;
                }
            }
        }
        Command::EnergyData => print_json(&ev_stations::energy_data(&cfg.nrel).await?)?,
        Command::Config(ConfigCommand::SetDefaults {
            region,
            household_size,
        }) => {
            let region = region.as_deref().map(Region::parse_lossy);
            Config::update_defaults(&cli.config, region, household_size)?;
            info!(path = %cli.config.display(), "Defaults updated");
        }
    }

    Ok(())
}

async fn calculate(cfg: &Config, args: CalculateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(bill) = &args.bill {
        BillFormat::from_path(bill)?;
    }

    let form = UsageForm {
        electricity: args.electricity,
        natural_gas: args.natural_gas,
        water: args.water,
        waste: args.waste,
        transportation: args.transportation,
        household_size: args
            .household_size
            .or_else(|| Some(cfg.default_household_size.to_string())),
        region: args
            .region
            .or_else(|| Some(cfg.default_region.as_str().to_string())),
    };
    let input = UsageInput::from_form(&form);
    let date = parse_date(args.date.as_deref())?;

    let store = match &args.user {
        Some(_) => Some(open_store(cfg)?),
        None => None,
    };
    let past = match (&store, &args.user) {
        (Some(db), Some(user)) => db.history_before(user, date)?,
        _ => Vec::new(),
    };

    let opts = ExtractOptions {
        ocr_language: cfg.ocr.language.clone(),
    };
    let mut report = footprint::assess_footprint(input, args.bill.as_deref(), &past, &opts).await?;
    report
        .recommendations
        .extend(ev_stations::station_recommendations(&report.emissions, &cfg.nrel).await);

    if let (Some(db), Some(user)) = (&store, &args.user) {
        db.record_reading(user, date, &report.input, report.emissions.total_emission)?;
        let (readings, entries) = db.get_counts()?;
        info!(readings, entries, "Database statistics");
    }

    print_json(&report)?;

    if args.advice {
        match llm_advice::carbon_advice(&report.emissions, &cfg.llm).await {
            Ok(plan) => print_json(&plan)?,
            Err(e) => {
                warn!(
                    error = %e,
                    "Personalised advice unavailable, the recommendations above still apply"
                );
            }
        }
    }
    Ok(())
}

fn entry(cfg: &Config, cmd: EntryCommand) -> Result<(), Box<dyn std::error::Error>> {
    let db = open_store(cfg)?;
    match cmd {
        EntryCommand::Add {
            user,
            entry_type,
            description,
            quantity,
            unit,
            date,
        } => {
            let new = NewEntry {
                entry_type: entry_type.parse()?,
                description,
                quantity,
                unit: unit.parse()?,
                date: parse_date(date.as_deref())?,
            };
            new.validate()?;
            print_json(&db.insert_entry(&user, &new)?)?;
        }
        EntryCommand::List { user } => print_json(&db.entries_for(&user)?)?,
        EntryCommand::Delete { user, id } => {
            if !db.delete_entry(&user, id)? {
                return Err(format!("Entry {id} not found for {user}").into());
            }
            println!("Entry {id} deleted");
        }
    }
    Ok(())
}
