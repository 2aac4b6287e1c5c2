// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for ownership decisions.
//!
//! This module defines the foundational types used throughout the crate:
//!
//! - **ID newtypes**: Type-safe wrappers around integer ids for the three principal
//!   kinds ([`OrganizationId`], [`BusinessUnitId`], [`UserId`]) preventing accidental
//!   mixing
//! - **Access levels**: The ordinal ACL breadth ([`AccessLevel`])
//! - **Ownership types**: Which principal kind scopes an entity ([`OwnershipType`])
//! - **Permissions**: ACL attributes checked by the voter ([`Permission`])
//!
//! All ID types implement transparent serde serialization (as plain integers).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OwnershipError;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Create a new ID from its integer value.
			pub const fn new(id: i64) -> Self {
				Self(id)
			}

			/// Get the inner integer value.
			pub const fn get(self) -> i64 {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(OrganizationId, "Unique identifier for an organization.");
define_id_type!(BusinessUnitId, "Unique identifier for a business unit.");
define_id_type!(UserId, "Unique identifier for a user.");

// =============================================================================
// Access Levels
// =============================================================================

/// ACL access level. Higher levels give broader visibility.
///
/// Levels are monotonic: `Deep` covers everything `Local` covers, which covers
/// everything `Basic` covers.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
	/// No access.
	#[default]
	None = 0,
	/// Records owned by the user.
	Basic = 1,
	/// Records in the user's business units.
	Local = 2,
	/// Records in the user's business units and their subordinates.
	Deep = 3,
	/// Records in the user's organizations.
	Global = 4,
	/// Every record.
	System = 5,
}

impl AccessLevel {
	/// Returns all access levels in ascending order.
	pub fn all() -> &'static [AccessLevel] {
		&[
			AccessLevel::None,
			AccessLevel::Basic,
			AccessLevel::Local,
			AccessLevel::Deep,
			AccessLevel::Global,
			AccessLevel::System,
		]
	}

	/// Returns true if this level grants at least what `other` grants.
	pub fn covers(self, other: AccessLevel) -> bool {
		self >= other
	}

	/// Returns the ordinal value of the level.
	pub fn value(self) -> u8 {
		self as u8
	}

	/// Returns the canonical uppercase name of the level.
	pub fn name(self) -> &'static str {
		match self {
			AccessLevel::None => "NONE",
			AccessLevel::Basic => "BASIC",
			AccessLevel::Local => "LOCAL",
			AccessLevel::Deep => "DEEP",
			AccessLevel::Global => "GLOBAL",
			AccessLevel::System => "SYSTEM",
		}
	}
}

impl fmt::Display for AccessLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for AccessLevel {
	type Err = OwnershipError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AccessLevel::all()
			.iter()
			.copied()
			.find(|level| level.name().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| OwnershipError::UnknownAccessLevel(s.to_string()))
	}
}

// =============================================================================
// Ownership Types
// =============================================================================

/// Which kind of principal an entity's records are scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnershipType {
	/// The entity is not owned; ACL applies to the class as a whole.
	#[default]
	None,
	/// Each record is owned by a user.
	User,
	/// Each record is owned by a business unit.
	BusinessUnit,
	/// Each record is owned by an organization.
	Organization,
}

impl OwnershipType {
	/// Returns the access levels that are meaningful for records of this type.
	pub fn access_levels(self) -> &'static [AccessLevel] {
		match self {
			OwnershipType::User => AccessLevel::all(),
			OwnershipType::BusinessUnit => &[
				AccessLevel::None,
				AccessLevel::Local,
				AccessLevel::Deep,
				AccessLevel::Global,
				AccessLevel::System,
			],
			OwnershipType::Organization => {
				&[AccessLevel::None, AccessLevel::Global, AccessLevel::System]
			}
			OwnershipType::None => &[AccessLevel::None, AccessLevel::System],
		}
	}

	/// Returns the narrowest level above `None` that applies to this type.
	pub fn minimum_access_level(self) -> AccessLevel {
		self
			.access_levels()
			.iter()
			.copied()
			.find(|level| *level > AccessLevel::None)
			.unwrap_or(AccessLevel::System)
	}

	/// Returns the canonical uppercase name of the type.
	pub fn name(self) -> &'static str {
		match self {
			OwnershipType::None => "NONE",
			OwnershipType::User => "USER",
			OwnershipType::BusinessUnit => "BUSINESS_UNIT",
			OwnershipType::Organization => "ORGANIZATION",
		}
	}
}

impl fmt::Display for OwnershipType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for OwnershipType {
	type Err = OwnershipError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"" | "NONE" => Ok(OwnershipType::None),
			"USER" => Ok(OwnershipType::User),
			"BUSINESS_UNIT" => Ok(OwnershipType::BusinessUnit),
			"ORGANIZATION" => Ok(OwnershipType::Organization),
			other => Err(OwnershipError::UnknownOwnershipType(other.to_string())),
		}
	}
}

// =============================================================================
// Permissions
// =============================================================================

/// ACL attributes that can be checked against an entity class or record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
	View,
	Create,
	Edit,
	Delete,
	Assign,
	Share,
}

impl Permission {
	/// Returns all available permissions.
	pub fn all() -> &'static [Permission] {
		&[
			Permission::View,
			Permission::Create,
			Permission::Edit,
			Permission::Delete,
			Permission::Assign,
			Permission::Share,
		]
	}

	pub fn name(self) -> &'static str {
		match self {
			Permission::View => "VIEW",
			Permission::Create => "CREATE",
			Permission::Edit => "EDIT",
			Permission::Delete => "DELETE",
			Permission::Assign => "ASSIGN",
			Permission::Share => "SHARE",
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Permission {
	type Err = OwnershipError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Permission::all()
			.iter()
			.copied()
			.find(|p| p.name().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| OwnershipError::UnknownPermission(s.to_string()))
	}
}
