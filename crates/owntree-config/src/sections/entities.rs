// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-class ownership configuration.
//!
//! ```toml
//! [entities."Acme\\Contact"]
//! owner_type = "USER"
//! owner_field = "owner"
//! owner_column = "user_owner_id"
//! organization_field = "organization"
//! ```

use std::collections::BTreeMap;

use owntree_core::{EntityClass, OwnershipMetadata, OwnershipType, StaticOwnershipMetadataProvider};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntityConfigLayer {
	pub owner_type: Option<OwnershipType>,
	pub owner_field: Option<String>,
	pub owner_column: Option<String>,
	pub organization_field: Option<String>,
	pub organization_column: Option<String>,
}

impl EntityConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.owner_type.is_some() {
			self.owner_type = other.owner_type;
		}
		if other.owner_field.is_some() {
			self.owner_field = other.owner_field;
		}
		if other.owner_column.is_some() {
			self.owner_column = other.owner_column;
		}
		if other.organization_field.is_some() {
			self.organization_field = other.organization_field;
		}
		if other.organization_column.is_some() {
			self.organization_column = other.organization_column;
		}
	}

	pub fn finalize(self) -> EntityConfig {
		EntityConfig {
			owner_type: self.owner_type.unwrap_or_default(),
			owner_field: self.owner_field,
			owner_column: self.owner_column,
			organization_field: self.organization_field,
			organization_column: self.organization_column,
		}
	}
}

/// Class name to ownership overlay. Overlays merge per class.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EntitiesConfigLayer {
	pub classes: BTreeMap<String, EntityConfigLayer>,
}

impl EntitiesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		for (class, layer) in other.classes {
			self.classes.entry(class).or_default().merge(layer);
		}
	}

	pub fn finalize(self) -> EntitiesConfig {
		EntitiesConfig {
			classes: self
				.classes
				.into_iter()
				.map(|(class, layer)| (class, layer.finalize()))
				.collect(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityConfig {
	pub owner_type: OwnershipType,
	pub owner_field: Option<String>,
	pub owner_column: Option<String>,
	pub organization_field: Option<String>,
	pub organization_column: Option<String>,
}

impl EntityConfig {
	/// Builds the ownership metadata of `class`.
	///
	/// # Errors
	/// Returns [`ConfigError::Validation`] when an owned class has no owner field.
	pub fn to_metadata(&self, class: &str) -> Result<OwnershipMetadata, ConfigError> {
		let class = EntityClass::from(class);
		let metadata = OwnershipMetadata::new(
			&class,
			self.owner_type,
			self.owner_field.clone(),
			self.owner_column.clone(),
		)
		.map_err(|e| ConfigError::Validation(e.to_string()))?;

		Ok(match &self.organization_field {
			Some(field) => metadata.with_organization_field(field, self.organization_column.clone()),
			None => metadata,
		})
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitiesConfig {
	pub classes: BTreeMap<String, EntityConfig>,
}

impl EntitiesConfig {
	/// Builds a metadata provider with one entry per configured class.
	///
	/// # Errors
	/// Same as [`EntityConfig::to_metadata`].
	pub fn metadata_provider(&self) -> Result<StaticOwnershipMetadataProvider, ConfigError> {
		let mut provider = StaticOwnershipMetadataProvider::new();
		for (class, entity) in &self.classes {
			provider.register(class.as_str(), entity.to_metadata(class)?);
		}
		Ok(provider)
	}
}
