// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::chain_config::{ChainConfig, SignerConfig};
use crate::load_config::{find_in_parent, resolve_config_path, DEFAULT_CONFIG_NAME};
use crate::workflow_config::{RelayerConfig, WorkflowConfig};
use crate::yaml::load_yaml_with_env;
use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::debug;

/// The config actually used throughout the app
#[derive(Debug, Clone)]
pub struct AppConfig {
    chain: ChainConfig,
    signer: SignerConfig,
    relayer: RelayerConfig,
    workflow: WorkflowConfig,
    /// Set the Open Telemetry collector grpc endpoint. Eg. http://127.0.0.1:4317
    otel: Option<String>,
    config_file: PathBuf,
}

impl AppConfig {
    pub fn try_from_file_config(config: FileConfig, config_file: PathBuf) -> Result<Self> {
        let Some(chain) = config.chain else {
            bail!("Configuration has no `chain` section. Add the rpc_url and the lottery contract address.");
        };

        // Fail early on obviously broken values rather than on first use
        chain.rpc_url()?;
        chain.lottery_address()?;
        config.workflow.validate()?;

        Ok(AppConfig {
            chain,
            signer: config.signer,
            relayer: config.relayer,
            workflow: config.workflow,
            otel: config.otel,
            config_file,
        })
    }

    /// Get the chain config
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Address of the lottery contract
    pub fn lottery_address(&self) -> Result<Address> {
        self.chain.lottery_address()
    }

    /// The signing key, required for every write command
    pub fn private_key(&self) -> Result<&str> {
        self.signer.private_key.as_deref().ok_or_else(|| {
            anyhow!("No signer configured. Set `signer.private_key` (eg. \"${{LOTTO_PRIVATE_KEY}}\").")
        })
    }

    pub fn relayer(&self) -> &RelayerConfig {
        &self.relayer
    }

    pub fn workflow(&self) -> &WorkflowConfig {
        &self.workflow
    }

    /// Get the open telemetry collector url
    pub fn otel(&self) -> Option<String> {
        self.otel.clone()
    }

    /// Get the config file path
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn name(&self) -> String {
        format!("lotto-{}", self.chain.name)
    }
}

/// The configuration as it appears on disk
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    chain: Option<ChainConfig>,
    signer: SignerConfig,
    relayer: RelayerConfig,
    workflow: WorkflowConfig,
    otel: Option<String>,
}

/// Value struct for passing configuration from the cli to the configuration
#[derive(Default, Serialize, Deserialize, Clone, Debug)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    otel: Option<String>,
}

/// Load the config at the config_file or the default location if not provided
pub fn load_config(config_file: Option<String>, otel: Option<String>) -> Result<AppConfig> {
    let cli_file = config_file.map(PathBuf::from);
    let resolved_config_path = resolve_config_path(
        find_in_parent,
        &env::current_dir()?,
        &OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        cli_file.as_deref(),
    );
    debug!(path = ?resolved_config_path, "loading configuration");

    let loaded_yaml =
        load_yaml_with_env(&resolved_config_path).context("Configuration file not found")?;

    let config: FileConfig = Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Yaml::string(&loaded_yaml))
        .merge(Serialized::defaults(CliOverrides { otel }))
        .extract()
        .context("Could not parse configuration")?;

    AppConfig::try_from_file_config(config, resolved_config_path)
}

pub struct OsDirs;
impl OsDirs {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lottocrypt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::time::Duration;

    const CONFIG: &str = r#"
chain:
  name: "sepolia"
  rpc_url: "wss://sepolia.example.org"
  chain_id: 11155111
  contracts:
    lottery: "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
signer:
  private_key: "${TEST_PRIVATE_KEY}"
workflow:
  status_reset_ms: 1500
"#;

    #[test]
    fn test_deserialization() -> Result<()> {
        let file: FileConfig = serde_yaml::from_str(
            r#"
chain:
  name: "hardhat"
  rpc_url: "http://localhost:8545"
  contracts:
    lottery: "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
relayer:
  url: "http://localhost:3000"
"#,
        )?;
        let config = AppConfig::try_from_file_config(file, PathBuf::from("/cfg/lotto.config.yaml"))?;

        assert_eq!(config.chain().name, "hardhat");
        assert_eq!(config.chain().chain_id, None);
        assert_eq!(config.relayer().url, "http://localhost:3000");
        assert_eq!(config.relayer().timeout(), Duration::from_secs(30));
        assert_eq!(config.workflow(), &WorkflowConfig::default());
        assert!(config.private_key().is_err());
        assert_eq!(config.name(), "lotto-hardhat");
        Ok(())
    }

    #[test]
    fn test_missing_chain() {
        let err = AppConfig::try_from_file_config(FileConfig::default(), PathBuf::new())
            .expect_err("chain is required");
        assert!(err.to_string().contains("chain"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let parsed = serde_yaml::from_str::<FileConfig>("nodes: {}");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_file_not_found() -> Result<()> {
        let Err(err) = load_config(Some("/nope/lotto.config.yaml".to_string()), None) else {
            bail!("error expected");
        };
        let Some(e) = err.downcast_ref::<std::io::Error>() else {
            bail!("io error expected");
        };

        assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn test_config_env_vars() {
        Jail::expect_with(|jail| {
            jail.set_env("TEST_PRIVATE_KEY", "0xabc123");
            jail.create_file(DEFAULT_CONFIG_NAME, CONFIG)?;

            let config = load_config(None, None).map_err(|err| err.to_string())?;

            assert_eq!(config.chain().rpc_url, "wss://sepolia.example.org");
            assert_eq!(config.chain().chain_id, Some(11155111));
            assert_eq!(config.private_key().map_err(|e| e.to_string())?, "0xabc123");
            assert_eq!(config.workflow().status_reset(), Duration::from_millis(1500));
            assert_eq!(config.workflow().plaintext_bits, 32);
            assert_eq!(config.otel(), None);
            Ok(())
        });
    }

    #[test]
    fn test_cli_otel_override() {
        Jail::expect_with(|jail| {
            jail.set_env("TEST_PRIVATE_KEY", "0xabc123");
            jail.create_file("custom.yaml", CONFIG)?;

            let config = load_config(
                Some("custom.yaml".to_string()),
                Some("http://localhost:4317".to_string()),
            )
            .map_err(|err| err.to_string())?;

            assert_eq!(config.otel(), Some("http://localhost:4317".to_string()));
            assert!(config.config_file().ends_with("custom.yaml"));
            Ok(())
        });
    }
}
