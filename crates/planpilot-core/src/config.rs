use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding planner runtime files (settings, observe log).
pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".planpilot")
}

/// Which task-store backend to construct. Selected explicitly at
/// construction time; there is no runtime name dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub backend: StoreBackend,
    pub refiner: RefinerConfig,
    pub verbose: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            refiner: RefinerConfig::default(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub max_retries: u8,
    pub retry_base_ms: u64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_output_tokens: 1500,
            temperature: 0.5,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 60,
            max_retries: 3,
            retry_base_ms: 1000,
        }
    }
}

impl PlannerConfig {
    pub fn settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    /// Defaults, overlaid field-wise with `.planpilot/settings.json` when
    /// present, then finished with the environment overrides.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        let path = Self::settings_path(workspace);
        if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let overlay: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_json_value(&mut merged, &overlay);
        }
        let mut cfg: Self = serde_json::from_value(merged)?;
        cfg.refiner.apply_env_overrides()?;
        cfg.refiner.validate()?;
        Ok(cfg)
    }
}

impl RefinerConfig {
    /// The planner-specific variable wins, then the host's fast-model
    /// variable, then whatever the config already holds.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_from(&|name| std::env::var(name).ok())
    }

    fn apply_env_from(&mut self, get: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(model) = env_chain(get, &["PLANNER_MODEL", "FAST_LLM_MODEL"]) {
            self.model = model;
        }
        if let Some(raw) = env_chain(get, &["PLANNER_TOKEN_LIMIT", "FAST_TOKEN_LIMIT"]) {
            self.max_output_tokens = raw
                .trim()
                .parse()
                .with_context(|| format!("token limit must be an integer, got '{raw}'"))?;
        }
        if let Some(raw) = env_chain(get, &["PLANNER_TEMPERATURE", "TEMPERATURE"]) {
            self.temperature = raw
                .trim()
                .parse()
                .with_context(|| format!("temperature must be a number, got '{raw}'"))?;
        }
        if let Some(base) = env_chain(get, &["OPENAI_API_BASE"]) {
            self.endpoint = format!("{}/chat/completions", base.trim_end_matches('/'));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_output_tokens == 0 {
            bail!("max_output_tokens must be positive");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            );
        }
        Ok(())
    }
}

fn env_chain(get: &dyn Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| get(name).filter(|value| !value.trim().is_empty()))
}

fn merge_json_value(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                if let Some(base_value) = base_obj.get_mut(key) {
                    merge_json_value(base_value, overlay_value);
                } else {
                    base_obj.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}
