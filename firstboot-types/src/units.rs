// SPDX-License-Identifier: GPL-3.0-only

//! systemd and networkd unit descriptions

use serde::{Deserialize, Serialize};

/// A systemd unit. Empty `contents` means only the drop-ins and activation
/// state are applied; the unit file itself is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemdUnit {
    pub name: String,
    pub contents: String,
    pub enable: bool,
    pub mask: bool,
    #[serde(alias = "dropIns")]
    pub dropins: Vec<DropIn>,
}

/// An override fragment for a systemd unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropIn {
    pub name: String,
    pub contents: String,
}

/// A systemd-networkd unit. Empty `contents` is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkdUnit {
    pub name: String,
    pub contents: String,
}
