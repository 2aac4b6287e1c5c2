// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-class ownership metadata and its provider.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::EntityClass;
use crate::error::{OwnershipError, Result};
use crate::types::{AccessLevel, OwnershipType};

static NO_OWNERSHIP: OwnershipMetadata = OwnershipMetadata::none();

/// Declares how records of one entity class are owned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipMetadata {
	owner_type: OwnershipType,
	owner_field_name: Option<String>,
	owner_column_name: Option<String>,
	organization_field_name: Option<String>,
	organization_column_name: Option<String>,
}

impl OwnershipMetadata {
	/// Metadata of a class whose records have no owner.
	pub const fn none() -> Self {
		Self {
			owner_type: OwnershipType::None,
			owner_field_name: None,
			owner_column_name: None,
			organization_field_name: None,
			organization_column_name: None,
		}
	}

	/// Creates metadata for an owned class.
	///
	/// # Errors
	/// Returns [`OwnershipError::InvalidMetadata`] when the class is owned but no
	/// owner field name is given.
	pub fn new(
		class: &EntityClass,
		owner_type: OwnershipType,
		owner_field_name: Option<String>,
		owner_column_name: Option<String>,
	) -> Result<Self> {
		let owner_field_name = owner_field_name.filter(|f| !f.trim().is_empty());
		if owner_type != OwnershipType::None && owner_field_name.is_none() {
			return Err(OwnershipError::InvalidMetadata {
				class: class.to_string(),
				reason: "the owner field name must not be empty".to_string(),
			});
		}

		Ok(Self {
			owner_type,
			owner_field_name,
			owner_column_name: owner_column_name.filter(|c| !c.trim().is_empty()),
			organization_field_name: None,
			organization_column_name: None,
		})
	}

	/// Builder: declare the field holding the record's organization.
	pub fn with_organization_field(
		mut self,
		field_name: impl Into<String>,
		column_name: Option<String>,
	) -> Self {
		self.organization_field_name = Some(field_name.into());
		self.organization_column_name = column_name;
		self
	}

	pub fn owner_type(&self) -> OwnershipType {
		self.owner_type
	}

	pub fn owner_field_name(&self) -> Option<&str> {
		self.owner_field_name.as_deref()
	}

	pub fn owner_column_name(&self) -> Option<&str> {
		self.owner_column_name.as_deref()
	}

	pub fn organization_field_name(&self) -> Option<&str> {
		self.organization_field_name.as_deref()
	}

	pub fn organization_column_name(&self) -> Option<&str> {
		self.organization_column_name.as_deref()
	}

	pub fn has_owner(&self) -> bool {
		self.owner_type != OwnershipType::None
	}

	pub fn is_user_owned(&self) -> bool {
		self.owner_type == OwnershipType::User
	}

	pub fn is_business_unit_owned(&self) -> bool {
		self.owner_type == OwnershipType::BusinessUnit
	}

	pub fn is_organization_owned(&self) -> bool {
		self.owner_type == OwnershipType::Organization
	}

	pub fn access_levels(&self) -> &'static [AccessLevel] {
		self.owner_type.access_levels()
	}
}

/// Resolves ownership metadata for entity classes.
pub trait OwnershipMetadataProvider: Send + Sync {
	/// Returns the metadata of the class; classes without ownership get the
	/// NONE metadata.
	fn metadata(&self, class: &EntityClass) -> &OwnershipMetadata;

	/// Returns true if records of the class are persisted entities the engine
	/// can reason about.
	fn is_manageable(&self, class: &EntityClass) -> bool;
}

/// Metadata provider backed by a fixed map resolved at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticOwnershipMetadataProvider {
	entries: HashMap<EntityClass, OwnershipMetadata>,
}

impl StaticOwnershipMetadataProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: register a class.
	pub fn with_entity(mut self, class: impl Into<EntityClass>, metadata: OwnershipMetadata) -> Self {
		self.register(class, metadata);
		self
	}

	pub fn register(&mut self, class: impl Into<EntityClass>, metadata: OwnershipMetadata) {
		let class = class.into();
		debug!(class = %class, owner_type = %metadata.owner_type(), "registered ownership metadata");
		self.entries.insert(class, metadata);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl OwnershipMetadataProvider for StaticOwnershipMetadataProvider {
	fn metadata(&self, class: &EntityClass) -> &OwnershipMetadata {
		self.entries.get(class).unwrap_or(&NO_OWNERSHIP)
	}

	fn is_manageable(&self, class: &EntityClass) -> bool {
		self.entries.contains_key(class)
	}
}
