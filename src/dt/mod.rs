//! Devicetree-equivalent device description
//!
//! A [`DeviceNode`] plays the part of the `sprd,gsp-*` node: it carries
//! the compatible string, the `name`, `core-cnt` and `io-cnt` properties,
//! and the ordered `cores` phandle list. Nodes are loaded from JSON or
//! taken from the embedded table in [`builtin`].

mod builtin;

pub use builtin::{builtin_node, load_builtin_nodes};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{GspError, GspResult};

/// Size of the device name field; longer names are truncated to one less
pub const GSP_NAME_LEN: usize = 32;

/// GSP device node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceNode {
    /// Compatible string selecting the operations table
    pub compatible: String,
    /// `name` property
    #[serde(default)]
    pub name: Option<String>,
    /// `core-cnt` property
    #[serde(default)]
    pub core_cnt: Option<u32>,
    /// `io-cnt` property
    #[serde(default)]
    pub io_cnt: Option<u32>,
    /// `cores` phandle list, in core order
    #[serde(default)]
    pub cores: Vec<CoreNode>,
}

/// One core node referenced from the device's `cores` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoreNode {
    /// `id` property
    #[serde(default)]
    pub id: Option<u32>,
    /// `kcfg-num` property
    #[serde(default)]
    pub kcfg_num: Option<u32>,
    /// `status` property, "okay" when present
    #[serde(default)]
    pub status: Option<String>,
}

impl DeviceNode {
    /// Parse a node from JSON text
    pub fn from_json(text: &str) -> GspResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a node from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> GspResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize the node back to pretty JSON
    pub fn to_json(&self) -> GspResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read the `core-cnt` property
    pub fn read_core_cnt(&self) -> GspResult<u32> {
        self.core_cnt
            .ok_or_else(|| GspError::Config("read core count failed".to_string()))
    }

    /// Read the `io-cnt` property
    pub fn read_io_cnt(&self) -> GspResult<u32> {
        self.io_cnt
            .ok_or_else(|| GspError::Config("read io count failed".to_string()))
    }

    /// Read the `name` property, truncated to the name field
    pub fn read_name(&self) -> GspResult<String> {
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| GspError::Config("read name failed".to_string()))?;
        Ok(name.chars().take(GSP_NAME_LEN - 1).collect())
    }

    /// Resolve entry `index` of the `cores` list
    pub fn parse_phandle(&self, index: usize) -> Option<&CoreNode> {
        self.cores.get(index)
    }
}
