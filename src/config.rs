use crate::calculator::Region;
use serde::Deserialize;
use std::{fs, path::Path};
use toml_edit::{DocumentMut, value};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = ".config/carbon_coach.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub default_region: Region,
    #[serde(default = "default_household_size")]
    pub default_household_size: u32,
    #[serde(default)]
    pub ocr: OcrSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub nrel: NrelSection,
}

fn default_db_path() -> String {
    "data/footprint.db".to_string()
}

fn default_household_size() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_region: Region::default(),
            default_household_size: default_household_size(),
            ocr: OcrSection::default(),
            llm: LlmSection::default(),
            nrel: NrelSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSection {
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            language: default_ocr_language(),
        }
    }
}

/// Which service, if any, writes the personalised advice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Built-in tip lists only.
    #[default]
    Static,
    Ollama,
    /// Any OpenAI-compatible endpoint; key read from `LLM_API_KEY`.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub backend: LlmBackend,
    #[serde(default = "default_ollama")]
    pub ollama: EndpointConfig,
    #[serde(default = "default_remote")]
    pub remote: EndpointConfig,
}

fn default_ollama() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:11434/v1".to_string(),
        model: "qwen3:8b".to_string(),
    }
}

fn default_remote() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            ollama: default_ollama(),
            remote: default_remote(),
        }
    }
}

/// Alternative fuel station lookups; the key comes from `NREL_API_KEY`.
#[derive(Debug, Clone, Deserialize)]
pub struct NrelSection {
    #[serde(default = "default_nrel_base_url")]
    pub base_url: String,
    /// Address, city or ZIP the nearest-station search is centred on.
    #[serde(default)]
    pub location: Option<String>,
}

fn default_nrel_base_url() -> String {
    "https://developer.nrel.gov/api/alt-fuel-stations/v1".to_string()
}

impl Default for NrelSection {
    fn default() -> Self {
        Self {
            base_url: default_nrel_base_url(),
            location: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Config::load`], but a missing file means built-in defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Rewrite the default region and household size, leaving the rest of
    /// the file (comments included) untouched. Creates the file if needed.
    pub fn update_defaults(
        path: impl AsRef<Path>,
        region: Option<Region>,
        household_size: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = if path.exists() {
            fs::read_to_string(path)?
        } else {
            String::new()
        };
        let mut doc = content.parse::<DocumentMut>()?;

        if let Some(region) = region {
            doc["default_region"] = value(region.as_str());
        }
        if let Some(size) = household_size {
            doc["default_household_size"] = value(i64::from(size.max(1)));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, doc.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.db_path, "data/footprint.db");
        assert_eq!(cfg.default_region, Region::Other);
        assert_eq!(cfg.default_household_size, 1);
        assert_eq!(cfg.ocr.language, "eng");
        assert_eq!(cfg.llm.backend, LlmBackend::Static);
        assert_eq!(cfg.llm.ollama.model, "qwen3:8b");
        assert!(cfg.nrel.base_url.starts_with("https://developer.nrel.gov/"));
        assert_eq!(cfg.nrel.location, None);
    }

    #[test]
    fn test_full_file() {
        let cfg: Config = toml::from_str(
            r#"
            db_path = "/tmp/fp.db"
            default_region = "midwest"
            default_household_size = 4

            [ocr]
            language = "deu"

            [llm]
            backend = "remote"
            [llm.remote]
            base_url = "https://llm.example.com/v1"
            model = "small"

            [nrel]
            location = "80401"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.default_region, Region::Midwest);
        assert_eq!(cfg.default_household_size, 4);
        assert_eq!(cfg.ocr.language, "deu");
        assert_eq!(cfg.llm.backend, LlmBackend::Remote);
        assert_eq!(cfg.llm.remote.model, "small");
        assert_eq!(cfg.llm.ollama.base_url, "http://localhost:11434/v1");
        assert_eq!(cfg.nrel.location.as_deref(), Some("80401"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let cfg = Config::load_or_default("/nonexistent/carbon_coach.toml").unwrap();
        assert_eq!(cfg.db_path, "data/footprint.db");
    }

    #[test]
    fn test_update_defaults_keeps_comments() {
        let path =
            std::env::temp_dir().join(format!("carbon_coach_cfg_{}.toml", std::process::id()));
        fs::write(
            &path,
            "# where readings live\ndb_path = \"x.db\"\ndefault_region = \"west\"\n",
        )
        .unwrap();

        Config::update_defaults(&path, Some(Region::Northeast), Some(3)).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# where readings live"));
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.db_path, "x.db");
        assert_eq!(cfg.default_region, Region::Northeast);
        assert_eq!(cfg.default_household_size, 3);
        fs::remove_file(&path).unwrap();
    }
}
