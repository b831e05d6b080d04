// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use sheetpic_app::{ExtractMode, ToolKind};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const APP_NAME: &str = "sheetpic";
const CONFIG_PATH_ENV: &str = "SHEETPIC_CONFIG_PATH";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "sheetpic.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub dialogs: Dialogs,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            engine: Engine::default(),
            ui: Ui::default(),
            dialogs: Dialogs::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Engine {
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub default_tool: Option<ToolKind>,
    pub default_mode: Option<ExtractMode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dialogs {
    pub native: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [engine], [ui], [dialogs], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| {
                format!(
                    "decode config {}; ui.default_tool is extract, merge, or macros and ui.default_mode is keyword or selection",
                    path.display()
                )
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(program) = &self.engine.program
            && program.trim().is_empty()
        {
            bail!(
                "engine.program in {} is empty; set it to the engine executable or remove it and use --demo",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!("log.level in {} is not a valid filter: {level:?}", path.display())
            })?;
        }

        Ok(())
    }

    pub fn engine_program(&self) -> Option<&str> {
        self.engine.program.as_deref().map(str::trim)
    }

    pub fn engine_args(&self) -> &[String] {
        &self.engine.args
    }

    pub fn default_tool(&self) -> ToolKind {
        self.ui.default_tool.unwrap_or_default()
    }

    pub fn default_mode(&self) -> ExtractMode {
        self.ui.default_mode.unwrap_or_default()
    }

    pub fn native_dialogs(&self) -> bool {
        self.dialogs.native.unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("cannot resolve data directory; set [log].path"))?;
        Ok(data_root.join(APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# sheetpic config\n# Place this file at: {}\n\nversion = 1\n\n[engine]\n# Executable that reads and writes workbooks. Not needed with --demo.\nprogram = \"sheetpic-engine\"\nargs = []\n\n[ui]\ndefault_tool = \"extract\"\ndefault_mode = \"keyword\"\n\n[dialogs]\n# true needs a build with the native-dialogs feature\nnative = false\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/sheetpic/sheetpic.log)\n# path = \"/absolute/path/to/sheetpic.log\"\n",
            path.display(),
            DEFAULT_LOG_LEVEL,
        )
    }
}
