// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ACL access level resolution.
//!
//! An [`AuthorizationChecker`] answers "may this token do `permission` on
//! `target`?" and reports the access level it resolved along with the answer, so
//! callers that need the level (the owner checker) do not have to observe the
//! vote separately.
//!
//! [`AclVoter`] is the default checker. It looks the level up in [`AclGrants`],
//! clamps it to the levels that make sense for the class's ownership type, and
//! for object targets maps the level onto an association predicate:
//!
//! | level  | object is granted when                         |
//! |--------|------------------------------------------------|
//! | NONE   | never                                          |
//! | BASIC  | it is the user or owned by the user            |
//! | LOCAL  | it is in one of the user's business units      |
//! | DEEP   | it is in one of those units or a subordinate   |
//! | GLOBAL | it is in one of the user's organizations       |
//! | SYSTEM | always                                         |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::decision::EntityOwnershipDecisionMaker;
use crate::entity::{DomainObject, EntityClass};
use crate::error::{OwnershipError, Result};
use crate::token::SecurityToken;
use crate::types::{AccessLevel, OwnershipType, Permission};

const ENTITY_DESCRIPTOR_PREFIX: &str = "entity:";

// =============================================================================
// Targets
// =============================================================================

/// Result of an ACL check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
	pub granted: bool,
	pub access_level: AccessLevel,
}

impl AccessDecision {
	pub fn new(granted: bool, access_level: AccessLevel) -> Self {
		Self {
			granted,
			access_level,
		}
	}

	pub fn denied() -> Self {
		Self::new(false, AccessLevel::None)
	}
}

/// Class-level ACL target, written as `entity:<class>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentity {
	class: EntityClass,
}

impl ObjectIdentity {
	pub fn for_class(class: impl Into<EntityClass>) -> Self {
		Self {
			class: class.into(),
		}
	}

	/// Parses an `entity:<class>` descriptor.
	///
	/// # Errors
	/// Returns [`OwnershipError::InvalidObjectIdentity`] for any other shape.
	pub fn parse(descriptor: &str) -> Result<Self> {
		let descriptor = descriptor.trim();
		let class = descriptor
			.get(..ENTITY_DESCRIPTOR_PREFIX.len())
			.filter(|prefix| prefix.eq_ignore_ascii_case(ENTITY_DESCRIPTOR_PREFIX))
			.map(|_| descriptor[ENTITY_DESCRIPTOR_PREFIX.len()..].trim())
			.filter(|class| !class.is_empty())
			.ok_or_else(|| OwnershipError::InvalidObjectIdentity(descriptor.to_string()))?;

		Ok(Self::for_class(class))
	}

	pub fn class(&self) -> &EntityClass {
		&self.class
	}
}

impl fmt::Display for ObjectIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{ENTITY_DESCRIPTOR_PREFIX}{}", self.class)
	}
}

impl FromStr for ObjectIdentity {
	type Err = OwnershipError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

/// What an ACL check is about: a whole class, or one object.
#[derive(Debug, Clone, Copy)]
pub enum AclTarget<'a> {
	Class(&'a ObjectIdentity),
	Object(&'a DomainObject),
}

impl AclTarget<'_> {
	pub fn entity_class(&self) -> EntityClass {
		match self {
			AclTarget::Class(identity) => identity.class().clone(),
			AclTarget::Object(object) => object.entity_class(),
		}
	}
}

// =============================================================================
// Checker
// =============================================================================

/// Grants or denies permissions and reports the access level behind the answer.
pub trait AuthorizationChecker: Send + Sync {
	/// # Errors
	/// Propagates failures of the underlying ownership decisions.
	fn decide(
		&self,
		token: &SecurityToken,
		permission: Permission,
		target: AclTarget<'_>,
	) -> Result<AccessDecision>;

	fn is_granted(
		&self,
		token: &SecurityToken,
		permission: Permission,
		target: AclTarget<'_>,
	) -> Result<bool> {
		Ok(self.decide(token, permission, target)?.granted)
	}
}

/// Access levels granted per class and permission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclGrants {
	default_level: AccessLevel,
	levels: HashMap<(EntityClass, Permission), AccessLevel>,
}

impl AclGrants {
	/// Creates grants where every unlisted class/permission gets `default_level`.
	pub fn new(default_level: AccessLevel) -> Self {
		Self {
			default_level,
			levels: HashMap::new(),
		}
	}

	/// Builder: grant a level.
	pub fn with_grant(
		mut self,
		class: impl Into<EntityClass>,
		permission: Permission,
		level: AccessLevel,
	) -> Self {
		self.grant(class, permission, level);
		self
	}

	pub fn grant(&mut self, class: impl Into<EntityClass>, permission: Permission, level: AccessLevel) {
		self.levels.insert((class.into(), permission), level);
	}

	pub fn default_level(&self) -> AccessLevel {
		self.default_level
	}

	/// Returns the granted level, before normalization.
	pub fn level(&self, class: &EntityClass, permission: Permission) -> AccessLevel {
		self
			.levels
			.get(&(class.clone(), permission))
			.copied()
			.unwrap_or(self.default_level)
	}

	pub fn len(&self) -> usize {
		self.levels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}
}

/// Clamps a granted level to those meaningful for the ownership type.
///
/// Unowned classes are all-or-nothing. Levels under the type's narrowest level
/// are raised to it.
pub fn normalize_access_level(owner_type: OwnershipType, level: AccessLevel) -> AccessLevel {
	if level == AccessLevel::None {
		return AccessLevel::None;
	}
	match owner_type {
		OwnershipType::None => AccessLevel::System,
		_ => level.max(owner_type.minimum_access_level()),
	}
}

/// Default [`AuthorizationChecker`] backed by static grants and the ownership
/// decision maker.
#[derive(Clone)]
pub struct AclVoter {
	decision_maker: EntityOwnershipDecisionMaker,
	grants: AclGrants,
}

impl AclVoter {
	pub fn new(decision_maker: EntityOwnershipDecisionMaker, grants: AclGrants) -> Self {
		Self {
			decision_maker,
			grants,
		}
	}

	pub fn decision_maker(&self) -> &EntityOwnershipDecisionMaker {
		&self.decision_maker
	}

	pub fn grants(&self) -> &AclGrants {
		&self.grants
	}

	/// Returns the normalized level granted for `permission` on `class`.
	pub fn access_level(&self, class: &EntityClass, permission: Permission) -> AccessLevel {
		let owner_type = self.decision_maker.accessor().class_metadata(class).owner_type();
		normalize_access_level(owner_type, self.grants.level(class, permission))
	}

	fn is_object_granted(
		&self,
		token: &SecurityToken,
		level: AccessLevel,
		object: &DomainObject,
	) -> Result<bool> {
		let user = token.user();
		match level {
			AccessLevel::None => Ok(false),
			AccessLevel::System => Ok(true),
			AccessLevel::Basic => self.decision_maker.is_associated_with_user(user, Some(object)),
			AccessLevel::Local => {
				self
					.decision_maker
					.is_associated_with_business_unit(user, Some(object), false)
			}
			AccessLevel::Deep => {
				self
					.decision_maker
					.is_associated_with_business_unit(user, Some(object), true)
			}
			AccessLevel::Global => {
				self
					.decision_maker
					.is_associated_with_organization(user, Some(object))
			}
		}
	}
}

impl AuthorizationChecker for AclVoter {
	#[instrument(
		level = "debug",
		skip(self, token, target),
		fields(permission = %permission, class = %target.entity_class())
	)]
	fn decide(
		&self,
		token: &SecurityToken,
		permission: Permission,
		target: AclTarget<'_>,
	) -> Result<AccessDecision> {
		if !self.decision_maker.supports(token) {
			debug!("token has no user principal, denying");
			return Ok(AccessDecision::denied());
		}

		let level = self.access_level(&target.entity_class(), permission);
		let granted = match target {
			AclTarget::Class(_) => level > AccessLevel::None,
			AclTarget::Object(object) => self.is_object_granted(token, level, object)?,
		};

		debug!(%level, granted, "acl vote");
		Ok(AccessDecision::new(granted, level))
	}
}
