// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading and caching of the owner tree.
//!
//! This module provides:
//! - [`OwnerTreeSnapshot`] - the serialized form of the hierarchy
//! - [`OwnerTreeSource`] - where snapshots come from ([`StaticTreeSource`], [`SnapshotFileSource`])
//! - [`OwnerTreeProvider`] - hands out the built tree ([`CachedOwnerTreeProvider`])

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{BusinessUnit, Organization, User};
use crate::error::{OwnershipError, Result};
use crate::tree::OwnerTree;
use crate::types::{BusinessUnitId, OrganizationId, UserId};

// =============================================================================
// Snapshot
// =============================================================================

/// A business unit row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUnitRow {
	pub id: BusinessUnitId,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub organization: Option<OrganizationId>,
	#[serde(default)]
	pub parent: Option<BusinessUnitId>,
}

/// A business unit assignment of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBusinessUnitRow {
	#[serde(default)]
	pub organization: Option<OrganizationId>,
	pub business_unit: BusinessUnitId,
}

/// A user row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
	pub id: UserId,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub owner: Option<BusinessUnitId>,
	#[serde(default)]
	pub organizations: Vec<OrganizationId>,
	#[serde(default)]
	pub business_units: Vec<UserBusinessUnitRow>,
}

/// An organization row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRow {
	pub id: OrganizationId,
	#[serde(default)]
	pub name: Option<String>,
}

/// Serialized hierarchy, as persisted by whatever system owns the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerTreeSnapshot {
	#[serde(default)]
	pub organizations: Vec<OrganizationRow>,
	#[serde(default)]
	pub business_units: Vec<BusinessUnitRow>,
	#[serde(default)]
	pub users: Vec<UserRow>,
}

impl OwnerTreeSnapshot {
	/// Builds the tree described by the snapshot.
	///
	/// # Errors
	/// Returns [`OwnershipError::Tree`] when the rows reference unknown business
	/// units or form a cycle.
	pub fn build(&self) -> Result<OwnerTree> {
		let mut builder = OwnerTree::builder();

		for org in &self.organizations {
			builder.add_organization(org.id);
		}
		for bu in &self.business_units {
			builder
				.add_business_unit(bu.id, bu.organization)
				.add_business_unit_relation(bu.id, bu.parent);
		}
		for user in &self.users {
			builder.add_user(user.id, user.owner);
			for org in &user.organizations {
				builder.add_user_organization(user.id, *org);
			}
			for assignment in &user.business_units {
				builder.add_user_business_unit(user.id, assignment.organization, assignment.business_unit);
			}
		}

		Ok(builder.build()?)
	}

	/// Returns the organization row as a domain object.
	pub fn organization(&self, id: OrganizationId) -> Option<Organization> {
		self.organizations.iter().find(|row| row.id == id).map(|row| Organization {
			id: Some(row.id),
			name: row.name.clone().unwrap_or_else(|| format!("organization {}", row.id)),
		})
	}

	/// Returns the business unit row as a domain object.
	pub fn business_unit(&self, id: BusinessUnitId) -> Option<BusinessUnit> {
		self.business_units.iter().find(|row| row.id == id).map(|row| BusinessUnit {
			id: Some(row.id),
			name: row.name.clone().unwrap_or_else(|| format!("business unit {}", row.id)),
			organization: row.organization,
			parent: row.parent,
		})
	}

	/// Returns the user row as a domain object. The primary organization is the
	/// owning business unit's organization.
	pub fn user(&self, id: UserId) -> Option<User> {
		let row = self.users.iter().find(|row| row.id == id)?;
		let organization = row
			.owner
			.and_then(|owner| self.business_units.iter().find(|bu| bu.id == owner))
			.and_then(|bu| bu.organization);

		Some(User {
			id: Some(row.id),
			username: row.username.clone().unwrap_or_else(|| format!("user{}", row.id)),
			owner: row.owner,
			organization,
			organizations: row.organizations.clone(),
		})
	}
}

// =============================================================================
// Sources
// =============================================================================

/// Where snapshots are loaded from.
pub trait OwnerTreeSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn load(&self) -> Result<OwnerTreeSnapshot>;
}

/// In-memory snapshot source.
#[derive(Debug, Clone, Default)]
pub struct StaticTreeSource {
	snapshot: OwnerTreeSnapshot,
}

impl StaticTreeSource {
	pub fn new(snapshot: OwnerTreeSnapshot) -> Self {
		Self { snapshot }
	}
}

impl OwnerTreeSource for StaticTreeSource {
	fn name(&self) -> &'static str {
		"static"
	}

	fn load(&self) -> Result<OwnerTreeSnapshot> {
		Ok(self.snapshot.clone())
	}
}

/// JSON file snapshot source.
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
	path: PathBuf,
}

impl SnapshotFileSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl OwnerTreeSource for SnapshotFileSource {
	fn name(&self) -> &'static str {
		"snapshot-file"
	}

	fn load(&self) -> Result<OwnerTreeSnapshot> {
		debug!(path = %self.path.display(), "loading tree snapshot");
		let content =
			std::fs::read_to_string(&self.path).map_err(|e| OwnershipError::SnapshotRead {
				path: self.path.clone(),
				source: e,
			})?;

		serde_json::from_str(&content).map_err(|e| OwnershipError::SnapshotParse {
			path: self.path.clone(),
			source: e,
		})
	}
}

// =============================================================================
// Providers
// =============================================================================

/// Hands out the current owner tree.
pub trait OwnerTreeProvider: Send + Sync {
	/// Returns the tree, loading it if needed.
	fn tree(&self) -> Result<Arc<OwnerTree>>;

	/// Drops any cached tree so the next call reloads it.
	fn clear(&self);
}

#[derive(Debug, Clone)]
struct CachedTree {
	tree: Arc<OwnerTree>,
	loaded_at: DateTime<Utc>,
}

/// Provider that builds the tree from a source once and serves it until cleared.
pub struct CachedOwnerTreeProvider<S> {
	source: S,
	cache_enabled: bool,
	cache: RwLock<Option<CachedTree>>,
}

impl<S: OwnerTreeSource> CachedOwnerTreeProvider<S> {
	pub fn new(source: S) -> Self {
		Self {
			source,
			cache_enabled: true,
			cache: RwLock::new(None),
		}
	}

	/// Builder: rebuild the tree on every call instead of caching it.
	pub fn without_cache(mut self) -> Self {
		self.cache_enabled = false;
		self
	}

	/// Loads the tree now so the first decision does not pay for it.
	///
	/// # Errors
	/// Propagates source and build errors.
	pub fn warm_up(&self) -> Result<Arc<OwnerTree>> {
		self.clear();
		self.tree()
	}

	/// Returns when the cached tree was loaded, if one is cached.
	pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
		self
			.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.as_ref()
			.map(|cached| cached.loaded_at)
	}

	fn load(&self) -> Result<Arc<OwnerTree>> {
		let snapshot = self.source.load()?;
		let tree = Arc::new(snapshot.build()?);
		info!(
			source = self.source.name(),
			organizations = snapshot.organizations.len(),
			business_units = snapshot.business_units.len(),
			users = snapshot.users.len(),
			"owner tree loaded"
		);
		Ok(tree)
	}
}

impl<S: OwnerTreeSource> OwnerTreeProvider for CachedOwnerTreeProvider<S> {
	fn tree(&self) -> Result<Arc<OwnerTree>> {
		if !self.cache_enabled {
			return self.load();
		}

		if let Some(cached) = self
			.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.as_ref()
		{
			return Ok(Arc::clone(&cached.tree));
		}

		let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
		if let Some(cached) = cache.as_ref() {
			return Ok(Arc::clone(&cached.tree));
		}

		let tree = self.load()?;
		*cache = Some(CachedTree {
			tree: Arc::clone(&tree),
			loaded_at: Utc::now(),
		});
		Ok(tree)
	}

	fn clear(&self) {
		debug!(source = self.source.name(), "clearing owner tree cache");
		*self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
	}
}
