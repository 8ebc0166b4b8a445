// Copyright (c) 2025-present Cesar Saguier Antebi
// All Rights Reserved.
//
// This file is part of the QUORUS ledger project.
// Licensed under the Business Source License 1.1 (BUSL-1.1).
// See LICENSE file in the project root for full license information.
//
// Commercial use requires express written consent and royalty agreements.
// Contact: Cesar Saguier Antebi

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::CommonArgs;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfiguration {
    pub data_dir: PathBuf,
    /// Skip the startup consistency checks.
    pub faster: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypair_path: Option<PathBuf>,
}

impl Default for NodeConfiguration {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            faster: false,
            keypair_path: None,
        }
    }
}

impl NodeConfiguration {
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("quorus").join("config.toml")
    }

    pub fn default_data_dir() -> PathBuf {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("quorus")
    }

    pub fn keypair_path(&self) -> PathBuf {
        self.keypair_path
            .clone()
            .unwrap_or_else(|| crate::keypair::default_keypair_path(&self.data_dir))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to load config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to deserialize config: {}", path.display()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create config parent directory: {}",
                    parent.display()
                )
            })?;
        }
        let out = toml::to_string_pretty(self).context("failed to serialize config as toml")?;
        std::fs::write(path, out)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn merge_with_env(mut self) -> Self {
        if let Ok(v) = std::env::var("QUORUS_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("QUORUS_FASTER") {
            self.faster = v == "1" || v.eq_ignore_ascii_case("true");
        }
        self
    }

    pub fn merge_with_cli(mut self, common: &CommonArgs) -> Self {
        if let Some(v) = &common.data_dir {
            self.data_dir = v.clone();
        }
        self
    }
}

/// Resolve the effective configuration for one invocation: file when
/// present, then env, then CLI overrides.
pub fn resolve(common: &CommonArgs) -> Result<NodeConfiguration> {
    let config_path = common
        .config
        .clone()
        .unwrap_or_else(NodeConfiguration::default_config_path);
    let cfg = if config_path.exists() {
        NodeConfiguration::load_from_file(&config_path)?
    } else {
        NodeConfiguration::default()
    };
    Ok(cfg.merge_with_env().merge_with_cli(common))
}
