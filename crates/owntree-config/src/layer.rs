// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by each source.

use serde::{Deserialize, Serialize};

use crate::sections::{AclConfigLayer, EntitiesConfigLayer, LoggingConfigLayer, TreeConfigLayer};

/// One source's view of the configuration; unset sections and fields are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OwntreeConfigLayer {
	pub tree: Option<TreeConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub acl: Option<AclConfigLayer>,
	pub entities: Option<EntitiesConfigLayer>,
}

impl OwntreeConfigLayer {
	/// Overlays `other` on top of `self`.
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.tree, other.tree, TreeConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.acl, other.acl, AclConfigLayer::merge);
		merge_section(&mut self.entities, other.entities, EntitiesConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, overlay: Option<T>, merge: fn(&mut T, T)) {
	let Some(overlay) = overlay else {
		return;
	};
	if let Some(existing) = base.as_mut() {
		merge(existing, overlay);
	} else {
		*base = Some(overlay);
	}
}
