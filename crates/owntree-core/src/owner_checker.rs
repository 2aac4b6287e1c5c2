// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validates the owner being assigned to a record.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::accessor::{OwnerId, OwnerRef};
use crate::acl::{AclTarget, AuthorizationChecker, ObjectIdentity};
use crate::business_unit::OwnerAssignmentPolicy;
use crate::decision::EntityOwnershipDecisionMaker;
use crate::entity::{BusinessUnit, DomainObject, EntityRecord, Organization, User};
use crate::error::Result;
use crate::token::SecurityToken;
use crate::tree::OwnerTree;
use crate::types::{AccessLevel, OrganizationId, Permission};

/// Checks whether the owner currently set on a record may be kept by the
/// token's user, given its CREATE (new records) or ASSIGN (existing records)
/// access level.
#[derive(Clone)]
pub struct OwnerChecker {
	decision_maker: EntityOwnershipDecisionMaker,
	authorization: Arc<dyn AuthorizationChecker>,
	policy: Arc<dyn OwnerAssignmentPolicy>,
}

impl OwnerChecker {
	pub fn new(
		decision_maker: EntityOwnershipDecisionMaker,
		authorization: Arc<dyn AuthorizationChecker>,
		policy: Arc<dyn OwnerAssignmentPolicy>,
	) -> Self {
		Self {
			decision_maker,
			authorization,
			policy,
		}
	}

	/// Returns true if the record's owner is acceptable.
	///
	/// Unmanaged or unowned classes and records without an owner always pass. A
	/// token without a user never does. An owner stored as a bare id is resolved
	/// through the tree and checked like a loaded one.
	///
	/// # Errors
	/// Propagates accessor, ACL and tree loading failures. A rejected owner is
	/// `Ok(false)`.
	#[instrument(
		level = "debug",
		skip(self, token, entity),
		fields(class = %entity.class, entity_id = ?entity.id)
	)]
	pub fn is_owner_can_be_set(&self, token: &SecurityToken, entity: &EntityRecord) -> Result<bool> {
		let accessor = self.decision_maker.accessor();
		if !accessor.is_manageable(&entity.class) {
			return Ok(true);
		}
		let metadata = accessor.metadata(entity);
		if !metadata.has_owner() {
			return Ok(true);
		}
		let Some(current_user) = token.user() else {
			debug!("token has no user principal");
			return Ok(false);
		};

		let access_level = self.access_level(token, entity)?;
		let tree = self.decision_maker.tree()?;
		let from_tree;
		let owner = match accessor.owner(entity)? {
			Some(owner) => owner,
			None => {
				let Some(id) = accessor.owner_id(entity)? else {
					return Ok(true);
				};
				from_tree = TreeOwner::resolve(id, &tree);
				from_tree.as_owner()
			}
		};

		let Some(organization) = self.target_organization(token, entity, current_user, &tree)? else {
			debug!("no organization to check the owner against");
			return Ok(false);
		};

		let valid = match owner {
			OwnerRef::User(new_owner) => {
				let in_organization = new_owner.belongs_to_organization(organization)
					|| new_owner
						.id
						.is_some_and(|id| tree.user_organization_ids(id).contains(&organization));
				if !in_organization {
					false
				} else if new_owner.id.is_none() {
					true
				} else {
					self.policy.can_user_be_set_as_owner(
						current_user,
						new_owner,
						access_level,
						&tree,
						organization,
					)
				}
			}
			OwnerRef::BusinessUnit(bu) => {
				let bu_organization = bu
					.id
					.and_then(|id| tree.business_unit_organization_id(id))
					.or(bu.organization);
				if bu_organization != Some(organization) {
					false
				} else if bu.id.is_none() {
					true
				} else {
					self.policy.can_business_unit_be_set_as_owner(
						current_user,
						bu,
						access_level,
						&tree,
						organization,
					)
				}
			}
			OwnerRef::Organization(org) => match (org.id, current_user.id) {
				(Some(org_id), Some(user_id)) => tree.user_organization_ids(user_id).contains(&org_id),
				_ => false,
			},
		};

		debug!(%organization, %access_level, valid, "owner checked");
		Ok(valid)
	}

	fn access_level(&self, token: &SecurityToken, entity: &EntityRecord) -> Result<AccessLevel> {
		let decision = if entity.is_new() {
			let identity = ObjectIdentity::for_class(entity.class.clone());
			self
				.authorization
				.decide(token, Permission::Create, AclTarget::Class(&identity))?
		} else {
			let object = DomainObject::Entity(entity.clone());
			self
				.authorization
				.decide(token, Permission::Assign, AclTarget::Object(&object))?
		};
		Ok(decision.access_level)
	}

	/// The record's own organization, then the token's, then the user's primary one.
	fn target_organization(
		&self,
		token: &SecurityToken,
		entity: &EntityRecord,
		current_user: &User,
		tree: &OwnerTree,
	) -> Result<Option<OrganizationId>> {
		let from_record = self.decision_maker.accessor().organization_id(entity)?;
		Ok(from_record.or(token.organization).or_else(|| {
			current_user
				.id
				.and_then(|id| tree.user_organization_id(id))
				.or(current_user.organization)
		}))
	}
}

/// Owner rebuilt from the tree when the record only carries its id.
enum TreeOwner {
	User(User),
	BusinessUnit(BusinessUnit),
	Organization(Organization),
}

impl TreeOwner {
	/// Ids unknown to the tree come back without an organization, which fails
	/// the organization check.
	fn resolve(id: OwnerId, tree: &OwnerTree) -> Self {
		match id {
			OwnerId::User(user_id) => TreeOwner::User(User {
				id: Some(user_id),
				username: String::new(),
				owner: tree.user_business_unit_id(user_id),
				organization: tree.user_organization_id(user_id),
				organizations: tree.user_organization_ids(user_id).iter().copied().collect(),
			}),
			OwnerId::BusinessUnit(bu_id) => TreeOwner::BusinessUnit(BusinessUnit {
				id: Some(bu_id),
				name: String::new(),
				organization: tree.business_unit_organization_id(bu_id),
				parent: tree.business_unit_parent_id(bu_id),
			}),
			OwnerId::Organization(org_id) => {
				TreeOwner::Organization(Organization::new(org_id, String::new()))
			}
		}
	}

	fn as_owner(&self) -> OwnerRef<'_> {
		match self {
			TreeOwner::User(user) => OwnerRef::User(user),
			TreeOwner::BusinessUnit(bu) => OwnerRef::BusinessUnit(bu),
			TreeOwner::Organization(org) => OwnerRef::Organization(org),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::acl::{AccessDecision, AclGrants, AclVoter};
	use crate::business_unit::BusinessUnitManager;
	use crate::entity::FieldValue;
	use crate::testing::{
		self, BUSINESS_UNIT_OWNED_CLASS, ORGANIZATION_OWNED_CLASS, UNOWNED_CLASS, USER_OWNED_CLASS,
	};

	/// Grants the same level for every class and permission.
	fn checker(level: AccessLevel) -> OwnerChecker {
		let decision_maker = testing::decision_maker();
		let voter = AclVoter::new(decision_maker.clone(), AclGrants::new(level));
		OwnerChecker::new(decision_maker, Arc::new(voter), Arc::new(BusinessUnitManager))
	}

	struct FixedLevel(AccessLevel);

	impl AuthorizationChecker for FixedLevel {
		fn decide(
			&self,
			_token: &SecurityToken,
			_permission: Permission,
			_target: AclTarget<'_>,
		) -> Result<AccessDecision> {
			Ok(AccessDecision::new(self.0 > AccessLevel::None, self.0))
		}
	}

	mod short_circuits {
		use super::*;

		#[test]
		fn unmanaged_class_passes() {
			let record = EntityRecord::new("Acme\\Unregistered", Some(1));
			assert!(checker(AccessLevel::None)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn unowned_class_passes() {
			let record = EntityRecord::new(UNOWNED_CLASS, Some(1));
			assert!(checker(AccessLevel::None)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn token_without_user_fails() {
			let record = testing::record(
				USER_OWNED_CLASS,
				Some(1),
				FieldValue::User(testing::user(1)),
			);
			assert!(!checker(AccessLevel::System)
				.is_owner_can_be_set(&SecurityToken::anonymous(), &record)
				.unwrap());
		}

		#[test]
		fn record_without_owner_passes() {
			let record = testing::record(USER_OWNED_CLASS, None, FieldValue::Null);
			assert!(checker(AccessLevel::None)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn missing_owner_field_is_an_error() {
			let record = EntityRecord::new(USER_OWNED_CLASS, Some(1));
			assert!(checker(AccessLevel::System)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.is_err());
		}
	}

	mod user_owner {
		use super::*;

		#[test]
		fn owner_outside_organization_fails() {
			let record = testing::record(
				USER_OWNED_CLASS,
				None,
				FieldValue::User(testing::user(2)),
			);
			assert!(!checker(AccessLevel::System)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn new_owner_in_organization_passes() {
			let owner = User::unsaved("newcomer").with_organization(OrganizationId::new(1));
			let record = testing::record(USER_OWNED_CLASS, Some(3), FieldValue::User(owner));
			assert!(checker(AccessLevel::Basic)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn deep_level_allows_subordinate_owner() {
			let record = testing::record(
				USER_OWNED_CLASS,
				None,
				FieldValue::User(testing::user(411)),
			);
			let token = testing::token(4, Some(4));
			assert!(checker(AccessLevel::Deep).is_owner_can_be_set(&token, &record).unwrap());
			assert!(!checker(AccessLevel::Local).is_owner_can_be_set(&token, &record).unwrap());
		}

		#[test]
		fn organization_falls_back_to_users_primary_one() {
			let record = testing::record(
				USER_OWNED_CLASS,
				None,
				FieldValue::User(testing::user(4)),
			);
			assert!(checker(AccessLevel::Basic)
				.is_owner_can_be_set(&testing::token(4, None), &record)
				.unwrap());
		}

		#[test]
		fn record_organization_overrides_token() {
			let record = testing::record(
				USER_OWNED_CLASS,
				None,
				FieldValue::User(testing::user(4)),
			)
			.with_field(testing::ORGANIZATION_FIELD, FieldValue::Integer(1));
			assert!(!checker(AccessLevel::System)
				.is_owner_can_be_set(&testing::token(4, Some(4)), &record)
				.unwrap());
		}
	}

	mod business_unit_owner {
		use super::*;

		fn checker_with(level: AccessLevel) -> OwnerChecker {
			OwnerChecker::new(
				testing::decision_maker(),
				Arc::new(FixedLevel(level)),
				Arc::new(BusinessUnitManager),
			)
		}

		#[test]
		fn unit_of_other_organization_fails() {
			let record = testing::record(
				BUSINESS_UNIT_OWNED_CLASS,
				Some(1),
				FieldValue::BusinessUnit(testing::business_unit(2)),
			);
			assert!(!checker_with(AccessLevel::System)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn level_decides_reachable_units() {
			let record = testing::record(
				BUSINESS_UNIT_OWNED_CLASS,
				Some(1),
				FieldValue::BusinessUnit(testing::business_unit(411)),
			);
			let token = testing::token(4, Some(4));
			assert!(!checker_with(AccessLevel::Local).is_owner_can_be_set(&token, &record).unwrap());
			assert!(checker_with(AccessLevel::Deep).is_owner_can_be_set(&token, &record).unwrap());
		}

		#[test]
		fn new_unit_in_organization_passes() {
			let mut bu = testing::business_unit(4);
			bu.id = None;
			let record = testing::record(BUSINESS_UNIT_OWNED_CLASS, None, FieldValue::BusinessUnit(bu));
			assert!(checker_with(AccessLevel::None)
				.is_owner_can_be_set(&testing::token(4, Some(4)), &record)
				.unwrap());
		}
	}

	mod owner_id_only {
		use super::*;

		fn checker_with(level: AccessLevel) -> OwnerChecker {
			OwnerChecker::new(
				testing::decision_maker(),
				Arc::new(FixedLevel(level)),
				Arc::new(BusinessUnitManager),
			)
		}

		#[test]
		fn user_id_outside_organization_fails_like_loaded_user() {
			let token = testing::token(1, Some(1));
			let loaded = testing::record(USER_OWNED_CLASS, Some(1), FieldValue::User(testing::user(2)));
			let by_id = testing::record(USER_OWNED_CLASS, Some(1), FieldValue::Integer(2));

			let checker = checker_with(AccessLevel::Basic);
			assert!(!checker.is_owner_can_be_set(&token, &loaded).unwrap());
			assert!(!checker.is_owner_can_be_set(&token, &by_id).unwrap());
		}

		#[test]
		fn own_user_id_passes_at_basic() {
			let record = testing::record(USER_OWNED_CLASS, Some(1), FieldValue::Integer(1));
			assert!(checker_with(AccessLevel::Basic)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn user_id_uses_tree_hierarchy() {
			let record = testing::record(USER_OWNED_CLASS, Some(1), FieldValue::Integer(411));
			let token = testing::token(4, Some(4));
			assert!(checker_with(AccessLevel::Deep).is_owner_can_be_set(&token, &record).unwrap());
			assert!(!checker_with(AccessLevel::Local).is_owner_can_be_set(&token, &record).unwrap());
		}

		#[test]
		fn unknown_user_id_fails() {
			let record = testing::record(USER_OWNED_CLASS, Some(1), FieldValue::Integer(999));
			assert!(!checker_with(AccessLevel::System)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn business_unit_id_of_other_organization_fails() {
			let record = testing::record(BUSINESS_UNIT_OWNED_CLASS, Some(1), FieldValue::Integer(2));
			assert!(!checker_with(AccessLevel::Local)
				.is_owner_can_be_set(&testing::token(1, Some(1)), &record)
				.unwrap());
		}

		#[test]
		fn business_unit_id_follows_level() {
			let record = testing::record(BUSINESS_UNIT_OWNED_CLASS, Some(1), FieldValue::Integer(411));
			let token = testing::token(4, Some(4));
			assert!(!checker_with(AccessLevel::Local).is_owner_can_be_set(&token, &record).unwrap());
			assert!(checker_with(AccessLevel::Deep).is_owner_can_be_set(&token, &record).unwrap());

			let own = testing::record(BUSINESS_UNIT_OWNED_CLASS, Some(1), FieldValue::Integer(4));
			assert!(checker_with(AccessLevel::Local).is_owner_can_be_set(&token, &own).unwrap());
		}

		#[test]
		fn organization_id_must_be_one_of_users_organizations() {
			let token = testing::token(31, Some(3));
			let own = testing::record(ORGANIZATION_OWNED_CLASS, Some(1), FieldValue::Integer(3));
			let foreign = testing::record(ORGANIZATION_OWNED_CLASS, Some(1), FieldValue::Integer(4));
			assert!(checker_with(AccessLevel::Global).is_owner_can_be_set(&token, &own).unwrap());
			assert!(!checker_with(AccessLevel::Global).is_owner_can_be_set(&token, &foreign).unwrap());
		}
	}

	mod organization_owner {
		use super::*;

		#[test]
		fn owner_must_be_one_of_users_organizations() {
			let own = testing::record(
				ORGANIZATION_OWNED_CLASS,
				None,
				FieldValue::Organization(testing::organization(3)),
			);
			let foreign = testing::record(
				ORGANIZATION_OWNED_CLASS,
				None,
				FieldValue::Organization(testing::organization(4)),
			);
			let token = testing::token(31, Some(3));
			assert!(checker(AccessLevel::Global).is_owner_can_be_set(&token, &own).unwrap());
			assert!(!checker(AccessLevel::Global).is_owner_can_be_set(&token, &foreign).unwrap());
		}
	}
}
