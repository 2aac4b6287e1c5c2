// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rules for which users and business units may be assigned as record owners.

use tracing::debug;

use crate::entity::{BusinessUnit, User};
use crate::tree::OwnerTree;
use crate::types::{AccessLevel, OrganizationId};

/// Decides whether a principal may become the owner of a record, given the
/// current user's ASSIGN or CREATE access level.
pub trait OwnerAssignmentPolicy: Send + Sync {
	fn can_user_be_set_as_owner(
		&self,
		current_user: &User,
		new_owner: &User,
		access_level: AccessLevel,
		tree: &OwnerTree,
		organization: OrganizationId,
	) -> bool;

	fn can_business_unit_be_set_as_owner(
		&self,
		current_user: &User,
		business_unit: &BusinessUnit,
		access_level: AccessLevel,
		tree: &OwnerTree,
		organization: OrganizationId,
	) -> bool;
}

/// Default owner assignment rules.
///
/// | level  | user owner                              | business unit owner                  |
/// |--------|-----------------------------------------|--------------------------------------|
/// | SYSTEM | anyone                                  | any unit                             |
/// | GLOBAL | members of the organization             | units of the organization            |
/// | DEEP   | users sharing a unit or subordinate     | own units and their subordinates     |
/// | LOCAL  | users sharing a unit                    | own units                            |
/// | BASIC  | the current user                        | nothing                              |
#[derive(Debug, Clone, Copy, Default)]
pub struct BusinessUnitManager;

impl BusinessUnitManager {
	pub fn new() -> Self {
		Self
	}
}

impl OwnerAssignmentPolicy for BusinessUnitManager {
	fn can_user_be_set_as_owner(
		&self,
		current_user: &User,
		new_owner: &User,
		access_level: AccessLevel,
		tree: &OwnerTree,
		organization: OrganizationId,
	) -> bool {
		let (Some(current_id), Some(owner_id)) = (current_user.id, new_owner.id) else {
			return access_level == AccessLevel::System;
		};

		let allowed = match access_level {
			AccessLevel::System => true,
			AccessLevel::Global => {
				new_owner.belongs_to_organization(organization)
					|| tree.user_organization_ids(owner_id).contains(&organization)
			}
			AccessLevel::Basic => current_id == owner_id,
			AccessLevel::Local | AccessLevel::Deep => {
				let allowed_units = if access_level == AccessLevel::Deep {
					tree.user_subordinate_business_unit_ids(current_id, Some(organization))
				} else {
					tree.user_business_unit_ids(current_id, Some(organization))
				};
				!allowed_units.is_disjoint(&tree.user_business_unit_ids(owner_id, Some(organization)))
			}
			AccessLevel::None => false,
		};

		debug!(
			current_user_id = %current_id,
			owner_id = %owner_id,
			%access_level,
			allowed,
			"user owner assignment checked"
		);
		allowed
	}

	fn can_business_unit_be_set_as_owner(
		&self,
		current_user: &User,
		business_unit: &BusinessUnit,
		access_level: AccessLevel,
		tree: &OwnerTree,
		organization: OrganizationId,
	) -> bool {
		if access_level == AccessLevel::System {
			return true;
		}
		let (Some(current_id), Some(bu_id)) = (current_user.id, business_unit.id) else {
			return false;
		};

		let allowed = match access_level {
			AccessLevel::Local => tree
				.user_business_unit_ids(current_id, Some(organization))
				.contains(&bu_id),
			AccessLevel::Deep => tree
				.user_subordinate_business_unit_ids(current_id, Some(organization))
				.contains(&bu_id),
			AccessLevel::Global => tree.organization_business_unit_ids(organization).contains(&bu_id),
			AccessLevel::System => true,
			AccessLevel::Basic | AccessLevel::None => false,
		};

		debug!(
			current_user_id = %current_id,
			business_unit_id = %bu_id,
			%access_level,
			allowed,
			"business unit owner assignment checked"
		);
		allowed
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing;

	fn org(id: i64) -> OrganizationId {
		OrganizationId::new(id)
	}

	mod user_owner {
		use super::*;

		#[test]
		fn system_allows_anyone() {
			let tree = testing::tree();
			assert!(BusinessUnitManager.can_user_be_set_as_owner(
				&testing::user(1),
				&testing::user(2),
				AccessLevel::System,
				&tree,
				org(1),
			));
		}

		#[test]
		fn basic_allows_only_self() {
			let tree = testing::tree();
			let manager = BusinessUnitManager::new();
			let current = testing::user(4);
			assert!(manager.can_user_be_set_as_owner(&current, &current, AccessLevel::Basic, &tree, org(4)));
			assert!(!manager.can_user_be_set_as_owner(
				&current,
				&testing::user(41),
				AccessLevel::Basic,
				&tree,
				org(4),
			));
		}

		#[test]
		fn local_and_deep_follow_units() {
			let tree = testing::tree();
			let manager = BusinessUnitManager::new();
			let current = testing::user(4);
			let subordinate = testing::user(411);
			assert!(!manager.can_user_be_set_as_owner(&current, &subordinate, AccessLevel::Local, &tree, org(4)));
			assert!(manager.can_user_be_set_as_owner(&current, &subordinate, AccessLevel::Deep, &tree, org(4)));
			assert!(!manager.can_user_be_set_as_owner(
				&subordinate,
				&current,
				AccessLevel::Deep,
				&tree,
				org(4),
			));
		}

		#[test]
		fn global_requires_organization_membership() {
			let tree = testing::tree();
			let manager = BusinessUnitManager::new();
			let current = testing::user(1);
			assert!(manager.can_user_be_set_as_owner(&current, &testing::user(5), AccessLevel::Global, &tree, org(1)));
			assert!(!manager.can_user_be_set_as_owner(
				&current,
				&testing::user(2),
				AccessLevel::Global,
				&tree,
				org(1),
			));
		}

		#[test]
		fn none_denies() {
			let tree = testing::tree();
			let current = testing::user(1);
			assert!(!BusinessUnitManager.can_user_be_set_as_owner(&current, &current, AccessLevel::None, &tree, org(1)));
		}
	}

	mod business_unit_owner {
		use super::*;

		#[test]
		fn levels_widen_the_allowed_units() {
			let tree = testing::tree();
			let manager = BusinessUnitManager::new();
			let current = testing::user(41);

			let own = testing::business_unit(41);
			let child = testing::business_unit(411);
			let sibling = testing::business_unit(42);

			assert!(manager.can_business_unit_be_set_as_owner(&current, &own, AccessLevel::Local, &tree, org(4)));
			assert!(!manager.can_business_unit_be_set_as_owner(&current, &child, AccessLevel::Local, &tree, org(4)));
			assert!(manager.can_business_unit_be_set_as_owner(&current, &child, AccessLevel::Deep, &tree, org(4)));
			assert!(!manager.can_business_unit_be_set_as_owner(&current, &sibling, AccessLevel::Deep, &tree, org(4)));
			assert!(manager.can_business_unit_be_set_as_owner(&current, &sibling, AccessLevel::Global, &tree, org(4)));
			assert!(!manager.can_business_unit_be_set_as_owner(
				&current,
				&testing::business_unit(1),
				AccessLevel::Global,
				&tree,
				org(4),
			));
			assert!(manager.can_business_unit_be_set_as_owner(
				&current,
				&testing::business_unit(1),
				AccessLevel::System,
				&tree,
				org(4),
			));
		}

		#[test]
		fn basic_never_allows_units() {
			let tree = testing::tree();
			let current = testing::user(1);
			assert!(!BusinessUnitManager.can_business_unit_be_set_as_owner(
				&current,
				&testing::business_unit(1),
				AccessLevel::Basic,
				&tree,
				org(1),
			));
		}
	}
}
