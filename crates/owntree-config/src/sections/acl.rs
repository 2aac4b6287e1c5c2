// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ACL grants configuration section.

use owntree_core::{AccessLevel, AclGrants, Permission};
use serde::{Deserialize, Serialize};

/// One `[[acl.grants]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrantConfig {
	pub class: String,
	pub permission: Permission,
	pub level: AccessLevel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AclConfigLayer {
	pub default_level: Option<AccessLevel>,
	pub grants: Option<Vec<GrantConfig>>,
}

impl AclConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.default_level.is_some() {
			self.default_level = other.default_level;
		}
		if other.grants.is_some() {
			self.grants = other.grants;
		}
	}

	pub fn finalize(self) -> AclConfig {
		AclConfig {
			default_level: self.default_level.unwrap_or_default(),
			grants: self.grants.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AclConfig {
	/// Level for every class and permission without an explicit grant.
	pub default_level: AccessLevel,
	pub grants: Vec<GrantConfig>,
}

impl AclConfig {
	pub fn to_grants(&self) -> AclGrants {
		let mut grants = AclGrants::new(self.default_level);
		for grant in &self.grants {
			grants.grant(grant.class.as_str(), grant.permission, grant.level);
		}
		grants
	}
}
