//! Configuration management for diagrams-preview

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Substring that opens the diagram definition block
    pub marker: String,
    /// File extension (without dot) accepted as a diagram script
    pub extension: String,
    /// Root for per-session managed output directories
    pub output_dir: PathBuf,
    /// External rendering toolchain
    pub renderer: RendererConfig,
    /// Output path redirection
    pub redirect: RedirectConfig,
    /// Save watching
    pub watch: WatchConfig,
    /// Preview display
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Program invoked with the managed source path as its last argument
    pub program: String,
    /// Arguments placed before the source path
    pub args: Vec<String>,
    /// Seconds before a running render is killed
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Keyword argument injected to force the output path
    pub argument: String,
    /// Argument names whose tokens are stripped from the original call
    pub strip: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after a save before regenerating
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Open preview.html in the default application when a session starts
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            marker: "with Diagram".to_string(),
            extension: "py".to_string(),
            output_dir: cache_dir.join("diagrams-preview"),
            renderer: RendererConfig::default(),
            redirect: RedirectConfig::default(),
            watch: WatchConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec![],
            timeout_secs: 60,
        }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            argument: "filename".to_string(),
            strip: vec!["fileName".to_string(), "filename".to_string()],
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { open_browser: false }
    }
}

impl Config {
    /// Get default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diagrams-preview")
            .join("config.toml")
    }

    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "marker" => Ok(self.marker.clone()),
            "extension" => Ok(self.extension.clone()),
            "output_dir" => Ok(self.output_dir.display().to_string()),
            "renderer.program" => Ok(self.renderer.program.clone()),
            "renderer.args" => Ok(self.renderer.args.join(" ")),
            "renderer.timeout_secs" => Ok(self.renderer.timeout_secs.to_string()),
            "redirect.argument" => Ok(self.redirect.argument.clone()),
            "redirect.strip" => Ok(self.redirect.strip.join(",")),
            "watch.debounce_ms" => Ok(self.watch.debounce_ms.to_string()),
            "preview.open_browser" => Ok(self.preview.open_browser.to_string()),
            _ => bail!("Unknown config key: {}", key),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "marker" => self.marker = value.to_string(),
            "extension" => self.extension = value.trim_start_matches('.').to_string(),
            "output_dir" => self.output_dir = PathBuf::from(value),
            "renderer.program" => self.renderer.program = value.to_string(),
            "renderer.args" => {
                self.renderer.args = value.split_whitespace().map(String::from).collect()
            }
            "renderer.timeout_secs" => self.renderer.timeout_secs = value.parse()?,
            "redirect.argument" => self.redirect.argument = value.to_string(),
            "redirect.strip" => {
                self.redirect.strip = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }
            "watch.debounce_ms" => self.watch.debounce_ms = value.parse()?,
            "preview.open_browser" => self.preview.open_browser = value.parse()?,
            _ => bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// All keys accepted by [`Config::get`] and [`Config::set`]
    pub fn keys() -> &'static [&'static str] {
        &[
            "marker",
            "extension",
            "output_dir",
            "renderer.program",
            "renderer.args",
            "renderer.timeout_secs",
            "redirect.argument",
            "redirect.strip",
            "watch.debounce_ms",
            "preview.open_browser",
        ]
    }
}
