//! Submission options: target network, named addresses, publish mode.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{DeployError, Result};

/// Target network for a publish.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    /// Get the network name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    /// Default fullnode URL for this network.
    pub fn default_node_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://fullnode.devnet.aptoslabs.com/v1",
            Network::Testnet => "https://fullnode.testnet.aptoslabs.com/v1",
            Network::Mainnet => "https://fullnode.mainnet.aptoslabs.com/v1",
        }
    }

    /// Explorer link for a transaction on this network.
    pub fn explorer_url(&self, tx_hash: &str) -> String {
        format!(
            "https://explorer.aptoslabs.com/txn/{}?network={}",
            tx_hash,
            self.name()
        )
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(DeployError::InvalidNetwork(other.to_string())),
        }
    }
}

/// How the package is published.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    /// Publish under the signer account.
    #[default]
    Standard,

    /// Publish under a seeded resource account.
    ResourceAccount,
}

impl FromStr for PublishMode {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(PublishMode::Standard),
            "resource-account" | "resource_account" => Ok(PublishMode::ResourceAccount),
            other => Err(DeployError::InvalidPublishMode(other.to_string())),
        }
    }
}

/// Options accepted at job submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Target network (devnet when unspecified).
    pub network: Network,

    /// Named-address bindings to merge into the manifest and pass to the
    /// publish invocation.
    pub named_addresses: BTreeMap<String, String>,

    /// Publish mode variant.
    pub publish_mode: PublishMode,

    /// Resource-account seed, required only in resource-account mode.
    pub resource_account_seed: Option<String>,
}

impl DeployOptions {
    /// Check option consistency before any pipeline work starts.
    pub fn validate(&self) -> Result<()> {
        if self.publish_mode == PublishMode::ResourceAccount
            && self
                .resource_account_seed
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err(DeployError::MissingSeed);
        }
        for (name, address) in &self.named_addresses {
            if name.trim().is_empty() || address.trim().is_empty() {
                return Err(DeployError::InvalidNamedAddresses(format!(
                    "empty name or address in binding {name:?} = {address:?}"
                )));
            }
        }
        Ok(())
    }

    /// Parse a caller-supplied JSON object of named-address bindings.
    pub fn parse_named_addresses(json: &str) -> Result<BTreeMap<String, String>> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| DeployError::InvalidNamedAddresses(format!("not valid JSON: {e}")))?;
        let object = value.as_object().ok_or_else(|| {
            DeployError::InvalidNamedAddresses("expected a JSON object".to_string())
        })?;

        let mut bindings = BTreeMap::new();
        for (name, address) in object {
            let address = address.as_str().ok_or_else(|| {
                DeployError::InvalidNamedAddresses(format!(
                    "address for {name:?} must be a string"
                ))
            })?;
            bindings.insert(name.clone(), address.to_string());
        }
        Ok(bindings)
    }

    /// Render bindings as the `name=addr,name=addr` argument the toolchain
    /// expects, or None when no bindings were supplied.
    pub fn named_addresses_arg(&self) -> Option<String> {
        if self.named_addresses.is_empty() {
            return None;
        }
        Some(
            self.named_addresses
                .iter()
                .map(|(name, address)| format!("{name}={address}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
