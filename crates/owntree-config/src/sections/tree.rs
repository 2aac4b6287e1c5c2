// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Owner tree configuration section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const DEFAULT_SNAPSHOT_PATH: &str = "/var/lib/owntree/tree.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TreeConfigLayer {
	pub snapshot_path: Option<PathBuf>,
	pub cache_enabled: Option<bool>,
}

impl TreeConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.snapshot_path.is_some() {
			self.snapshot_path = other.snapshot_path;
		}
		if other.cache_enabled.is_some() {
			self.cache_enabled = other.cache_enabled;
		}
	}

	pub fn finalize(self) -> TreeConfig {
		TreeConfig {
			snapshot_path: self
				.snapshot_path
				.unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
			cache_enabled: self.cache_enabled.unwrap_or(true),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeConfig {
	/// JSON snapshot the owner tree is built from.
	pub snapshot_path: PathBuf,
	pub cache_enabled: bool,
}

impl Default for TreeConfig {
	fn default() -> Self {
		TreeConfigLayer::default().finalize()
	}
}
