// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Association predicates between a user and a domain object.
//!
//! The [`EntityOwnershipDecisionMaker`] answers three questions for the ACL layer:
//!
//! 1. Is the object in one of the user's organizations?
//! 2. Is the object in one of the user's business units (optionally including
//!    their subordinates)?
//! 3. Is the object the user, or owned by the user?
//!
//! Every answer is read from the [`OwnerTree`]; the engine never second-guesses
//! the tree. A user without business unit assignments is associated with no
//! business unit, not even through itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::accessor::{EntityOwnerAccessor, OwnerId};
use crate::entity::{DomainObject, EntityRecord, User};
use crate::error::{OwnershipError, Result};
use crate::metadata::OwnershipMetadataProvider;
use crate::provider::OwnerTreeProvider;
use crate::token::SecurityToken;
use crate::tree::OwnerTree;
use crate::types::{BusinessUnitId, OrganizationId, OwnershipType, UserId};

/// Decides how a user relates to organizations, business units, users and
/// owned records.
#[derive(Clone)]
pub struct EntityOwnershipDecisionMaker {
	tree_provider: Arc<dyn OwnerTreeProvider>,
	accessor: EntityOwnerAccessor,
}

impl EntityOwnershipDecisionMaker {
	pub fn new(
		tree_provider: Arc<dyn OwnerTreeProvider>,
		metadata_provider: Arc<dyn OwnershipMetadataProvider>,
	) -> Self {
		Self {
			tree_provider,
			accessor: EntityOwnerAccessor::new(metadata_provider),
		}
	}

	pub fn accessor(&self) -> &EntityOwnerAccessor {
		&self.accessor
	}

	/// Returns the current owner tree.
	///
	/// # Errors
	/// Propagates tree loading failures.
	pub fn tree(&self) -> Result<Arc<OwnerTree>> {
		self.tree_provider.tree()
	}

	/// Returns true if the token carries a user principal.
	pub fn supports(&self, token: &SecurityToken) -> bool {
		token.user().is_some()
	}

	// =========================================================================
	// Type predicates
	// =========================================================================

	pub fn is_organization(&self, object: Option<&DomainObject>) -> bool {
		matches!(object, Some(DomainObject::Organization(_)))
	}

	pub fn is_business_unit(&self, object: Option<&DomainObject>) -> bool {
		matches!(object, Some(DomainObject::BusinessUnit(_)))
	}

	pub fn is_user(&self, object: Option<&DomainObject>) -> bool {
		matches!(object, Some(DomainObject::User(_)))
	}

	// =========================================================================
	// Association predicates
	// =========================================================================

	/// Returns true if `target` belongs to one of the user's organizations.
	///
	/// # Errors
	/// - [`OwnershipError::InvalidDomainObject`] if the user or target is missing,
	///   or the user has no id
	/// - accessor and tree loading failures
	#[instrument(
		level = "debug",
		skip(self, user, target),
		fields(user_id = ?user.and_then(|u| u.id), target = ?target.map(DomainObject::entity_class))
	)]
	pub fn is_associated_with_organization(
		&self,
		user: Option<&User>,
		target: Option<&DomainObject>,
	) -> Result<bool> {
		let (user_id, target) = require_subject_and_target(user, target)?;
		let tree = self.tree()?;
		let organizations = tree.user_organization_ids(user_id);

		let associated = match target {
			DomainObject::Organization(org) => org.id.is_some_and(|id| organizations.contains(&id)),
			DomainObject::BusinessUnit(bu) => bu
				.id
				.and_then(|id| tree.business_unit_organization_id(id).or(bu.organization))
				.is_some_and(|org| organizations.contains(&org)),
			DomainObject::User(other) => other
				.id
				.is_some_and(|id| intersects(organizations, tree.user_organization_ids(id))),
			DomainObject::Entity(record) => {
				self.is_record_in_organizations(&tree, record, organizations)?
			}
		};

		debug!(associated, "organization association decided");
		Ok(associated)
	}

	/// Returns true if `target` belongs to one of the user's business units, or
	/// with `deep` to one of their subordinates.
	///
	/// # Errors
	/// Same as [`EntityOwnershipDecisionMaker::is_associated_with_organization`].
	#[instrument(
		level = "debug",
		skip(self, user, target),
		fields(user_id = ?user.and_then(|u| u.id), target = ?target.map(DomainObject::entity_class))
	)]
	pub fn is_associated_with_business_unit(
		&self,
		user: Option<&User>,
		target: Option<&DomainObject>,
		deep: bool,
	) -> Result<bool> {
		let (user_id, target) = require_subject_and_target(user, target)?;
		let tree = self.tree()?;
		let user_business_units = tree.user_business_unit_ids(user_id, None);
		let in_scope =
			|bu: BusinessUnitId| is_business_unit_in_scope(&tree, &user_business_units, bu, deep);

		let associated = match target {
			DomainObject::Organization(_) => false,
			DomainObject::BusinessUnit(bu) => bu.id.is_some_and(in_scope),
			DomainObject::User(other) => other.id.is_some_and(|id| {
				tree
					.user_business_unit_ids(id, None)
					.into_iter()
					.any(in_scope)
			}),
			DomainObject::Entity(record) => {
				let metadata = self.accessor.metadata(record);
				match (metadata.owner_type(), self.accessor.owner_id(record)?) {
					(OwnershipType::BusinessUnit, Some(OwnerId::BusinessUnit(owner))) => in_scope(owner),
					(OwnershipType::User, Some(OwnerId::User(owner))) => tree
						.user_business_unit_ids(owner, None)
						.into_iter()
						.any(in_scope),
					_ => false,
				}
			}
		};

		debug!(associated, deep, "business unit association decided");
		Ok(associated)
	}

	/// Returns true if `target` is the user, or a record owned by the user.
	///
	/// # Errors
	/// Same as [`EntityOwnershipDecisionMaker::is_associated_with_organization`].
	#[instrument(
		level = "debug",
		skip(self, user, target),
		fields(user_id = ?user.and_then(|u| u.id), target = ?target.map(DomainObject::entity_class))
	)]
	pub fn is_associated_with_user(
		&self,
		user: Option<&User>,
		target: Option<&DomainObject>,
	) -> Result<bool> {
		let (user_id, target) = require_subject_and_target(user, target)?;

		let associated = match target {
			DomainObject::User(other) => other.id == Some(user_id),
			DomainObject::Entity(record) => {
				self.accessor.metadata(record).is_user_owned()
					&& self.accessor.owner_id(record)? == Some(OwnerId::User(user_id))
			}
			DomainObject::Organization(_) | DomainObject::BusinessUnit(_) => false,
		};

		debug!(associated, "user association decided");
		Ok(associated)
	}

	fn is_record_in_organizations(
		&self,
		tree: &OwnerTree,
		record: &EntityRecord,
		organizations: &BTreeSet<OrganizationId>,
	) -> Result<bool> {
		let metadata = self.accessor.metadata(record);
		if !metadata.has_owner() {
			return Ok(false);
		}

		if let Some(org) = self.accessor.organization_id(record)? {
			return Ok(organizations.contains(&org));
		}

		Ok(match self.accessor.owner_id(record)? {
			Some(OwnerId::Organization(org)) => organizations.contains(&org),
			Some(OwnerId::BusinessUnit(bu)) => tree
				.business_unit_organization_id(bu)
				.is_some_and(|org| organizations.contains(&org)),
			Some(OwnerId::User(owner)) => intersects(organizations, tree.user_organization_ids(owner)),
			None => false,
		})
	}
}

fn require_subject_and_target<'a>(
	user: Option<&User>,
	target: Option<&'a DomainObject>,
) -> Result<(UserId, &'a DomainObject)> {
	let user = user.ok_or_else(|| OwnershipError::InvalidDomainObject("user is missing".into()))?;
	let user_id = user.id.ok_or_else(|| {
		OwnershipError::InvalidDomainObject(format!("user '{}' has no id", user.username))
	})?;
	let target =
		target.ok_or_else(|| OwnershipError::InvalidDomainObject("target is missing".into()))?;
	Ok((user_id, target))
}

fn is_business_unit_in_scope(
	tree: &OwnerTree,
	user_business_units: &BTreeSet<BusinessUnitId>,
	bu: BusinessUnitId,
	deep: bool,
) -> bool {
	user_business_units.contains(&bu)
		|| (deep && user_business_units.iter().any(|own| tree.is_subordinate(*own, bu)))
}

fn intersects<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> bool {
	!a.is_disjoint(b)
}
