// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory ownership hierarchy.
//!
//! The [`OwnerTree`] indexes organizations, nested business units and users. It is
//! assembled once through an [`OwnerTreeBuilder`] and is read-only afterwards:
//! every subordinate closure is computed during [`OwnerTreeBuilder::build`], so
//! "is descendant" queries are a set lookup.
//!
//! All collections are ordered, which keeps query results deterministic across
//! rebuilds of the same input.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::error::TreeError;
use crate::types::{BusinessUnitId, OrganizationId, UserId};

static NO_ORGANIZATIONS: BTreeSet<OrganizationId> = BTreeSet::new();
static NO_BUSINESS_UNITS: BTreeSet<BusinessUnitId> = BTreeSet::new();
static NO_USERS: BTreeSet<UserId> = BTreeSet::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct BusinessUnitNode {
	organization: Option<OrganizationId>,
	parent: Option<BusinessUnitId>,
	subordinates: BTreeSet<BusinessUnitId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UserNode {
	owner: Option<BusinessUnitId>,
	organization: Option<OrganizationId>,
	organizations: BTreeSet<OrganizationId>,
	/// Business unit assignments with the organization they were made in.
	business_units: BTreeMap<BusinessUnitId, Option<OrganizationId>>,
}

/// Immutable snapshot of the organization / business unit / user hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTree {
	organizations: BTreeSet<OrganizationId>,
	business_units: BTreeMap<BusinessUnitId, BusinessUnitNode>,
	users: BTreeMap<UserId, UserNode>,
	organization_business_units: BTreeMap<OrganizationId, BTreeSet<BusinessUnitId>>,
	business_unit_users: BTreeMap<BusinessUnitId, BTreeSet<UserId>>,
}

impl OwnerTree {
	pub fn builder() -> OwnerTreeBuilder {
		OwnerTreeBuilder::default()
	}

	// =========================================================================
	// Users
	// =========================================================================

	/// Returns every organization the user belongs to.
	pub fn user_organization_ids(&self, user: UserId) -> &BTreeSet<OrganizationId> {
		self
			.users
			.get(&user)
			.map(|node| &node.organizations)
			.unwrap_or(&NO_ORGANIZATIONS)
	}

	/// Returns the user's primary organization, the one of its owning business unit.
	pub fn user_organization_id(&self, user: UserId) -> Option<OrganizationId> {
		self.users.get(&user).and_then(|node| node.organization)
	}

	/// Returns the user's owning business unit.
	pub fn user_business_unit_id(&self, user: UserId) -> Option<BusinessUnitId> {
		self.users.get(&user).and_then(|node| node.owner)
	}

	/// Returns the business units the user is assigned to, optionally limited to
	/// assignments made in one organization.
	pub fn user_business_unit_ids(
		&self,
		user: UserId,
		organization: Option<OrganizationId>,
	) -> BTreeSet<BusinessUnitId> {
		let Some(node) = self.users.get(&user) else {
			return BTreeSet::new();
		};

		node
			.business_units
			.iter()
			.filter(|(_, assigned_in)| organization.is_none() || **assigned_in == organization)
			.map(|(bu, _)| *bu)
			.collect()
	}

	/// Returns the user's business units together with all of their subordinates.
	pub fn user_subordinate_business_unit_ids(
		&self,
		user: UserId,
		organization: Option<OrganizationId>,
	) -> BTreeSet<BusinessUnitId> {
		let mut result = BTreeSet::new();
		for bu in self.user_business_unit_ids(user, organization) {
			result.insert(bu);
			if let Some(node) = self.business_units.get(&bu) {
				result.extend(node.subordinates.iter().copied());
			}
		}
		result
	}

	/// Returns every business unit of every organization the user belongs to.
	pub fn business_units_by_user_organizations(&self, user: UserId) -> BTreeSet<BusinessUnitId> {
		self
			.user_organization_ids(user)
			.iter()
			.flat_map(|org| self.organization_business_unit_ids(*org).iter().copied())
			.collect()
	}

	pub fn contains_user(&self, user: UserId) -> bool {
		self.users.contains_key(&user)
	}

	// =========================================================================
	// Business units
	// =========================================================================

	pub fn business_unit_organization_id(&self, bu: BusinessUnitId) -> Option<OrganizationId> {
		self.business_units.get(&bu).and_then(|node| node.organization)
	}

	pub fn business_unit_parent_id(&self, bu: BusinessUnitId) -> Option<BusinessUnitId> {
		self.business_units.get(&bu).and_then(|node| node.parent)
	}

	/// Returns all descendants of `bu`, plus `bu` itself when `include_self` is set
	/// and the unit is known.
	pub fn subordinate_business_unit_ids(
		&self,
		bu: BusinessUnitId,
		include_self: bool,
	) -> BTreeSet<BusinessUnitId> {
		let Some(node) = self.business_units.get(&bu) else {
			return BTreeSet::new();
		};

		let mut result = node.subordinates.clone();
		if include_self {
			result.insert(bu);
		}
		result
	}

	/// Returns true if `bu` is a strict descendant of `ancestor`.
	pub fn is_subordinate(&self, ancestor: BusinessUnitId, bu: BusinessUnitId) -> bool {
		self
			.business_units
			.get(&ancestor)
			.is_some_and(|node| node.subordinates.contains(&bu))
	}

	/// Returns the users assigned to the business unit.
	pub fn users_assigned_to_business_unit(&self, bu: BusinessUnitId) -> &BTreeSet<UserId> {
		self.business_unit_users.get(&bu).unwrap_or(&NO_USERS)
	}

	pub fn contains_business_unit(&self, bu: BusinessUnitId) -> bool {
		self.business_units.contains_key(&bu)
	}

	// =========================================================================
	// Organizations
	// =========================================================================

	pub fn organization_business_unit_ids(&self, org: OrganizationId) -> &BTreeSet<BusinessUnitId> {
		self
			.organization_business_units
			.get(&org)
			.unwrap_or(&NO_BUSINESS_UNITS)
	}

	pub fn organization_exists(&self, org: OrganizationId) -> bool {
		self.organizations.contains(&org)
	}

	pub fn organization_ids(&self) -> impl Iterator<Item = OrganizationId> + '_ {
		self.organizations.iter().copied()
	}

	pub fn business_unit_ids(&self) -> impl Iterator<Item = BusinessUnitId> + '_ {
		self.business_units.keys().copied()
	}

	pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
		self.users.keys().copied()
	}
}

/// Collects hierarchy facts and turns them into an [`OwnerTree`].
#[derive(Debug, Clone, Default)]
pub struct OwnerTreeBuilder {
	organizations: BTreeSet<OrganizationId>,
	business_units: BTreeMap<BusinessUnitId, Option<OrganizationId>>,
	relations: BTreeMap<BusinessUnitId, Option<BusinessUnitId>>,
	users: BTreeMap<UserId, UserFacts>,
}

#[derive(Debug, Clone, Default)]
struct UserFacts {
	owner: Option<BusinessUnitId>,
	organizations: BTreeSet<OrganizationId>,
	business_units: BTreeMap<BusinessUnitId, Option<OrganizationId>>,
}

impl OwnerTreeBuilder {
	pub fn add_organization(&mut self, org: OrganizationId) -> &mut Self {
		self.organizations.insert(org);
		self
	}

	pub fn add_business_unit(
		&mut self,
		bu: BusinessUnitId,
		organization: Option<OrganizationId>,
	) -> &mut Self {
		if let Some(org) = organization {
			self.organizations.insert(org);
		}
		self.business_units.insert(bu, organization);
		self
	}

	/// Records `parent` as the parent of `bu`. `None` marks a root unit.
	pub fn add_business_unit_relation(
		&mut self,
		bu: BusinessUnitId,
		parent: Option<BusinessUnitId>,
	) -> &mut Self {
		self.relations.insert(bu, parent);
		self
	}

	/// Registers a user with its owning business unit.
	pub fn add_user(&mut self, user: UserId, owner: Option<BusinessUnitId>) -> &mut Self {
		self.users.entry(user).or_default().owner = owner;
		self
	}

	pub fn add_user_organization(&mut self, user: UserId, org: OrganizationId) -> &mut Self {
		self.organizations.insert(org);
		self.users.entry(user).or_default().organizations.insert(org);
		self
	}

	/// Assigns the user to a business unit within an organization. When the
	/// organization is omitted the unit's own organization is used.
	pub fn add_user_business_unit(
		&mut self,
		user: UserId,
		organization: Option<OrganizationId>,
		bu: BusinessUnitId,
	) -> &mut Self {
		if let Some(org) = organization {
			self.organizations.insert(org);
		}
		self
			.users
			.entry(user)
			.or_default()
			.business_units
			.insert(bu, organization);
		self
	}

	/// Validates the collected facts and computes subordinate closures.
	///
	/// # Errors
	/// - [`TreeError::UnknownBusinessUnit`] when a relation or user references a
	///   business unit that was never added
	/// - [`TreeError::Cycle`] when a parent chain loops
	pub fn build(&self) -> Result<OwnerTree, TreeError> {
		let mut business_units = BTreeMap::new();
		let mut organization_business_units: BTreeMap<OrganizationId, BTreeSet<BusinessUnitId>> =
			BTreeMap::new();

		for (bu, organization) in &self.business_units {
			let parent = self.relations.get(bu).copied().flatten();
			if let Some(parent) = parent {
				if !self.business_units.contains_key(&parent) {
					return Err(TreeError::UnknownBusinessUnit(parent));
				}
			}
			business_units.insert(
				*bu,
				BusinessUnitNode {
					organization: *organization,
					parent,
					subordinates: BTreeSet::new(),
				},
			);
			if let Some(org) = organization {
				organization_business_units.entry(*org).or_default().insert(*bu);
			}
		}

		for bu in self.relations.keys() {
			if !self.business_units.contains_key(bu) {
				return Err(TreeError::UnknownBusinessUnit(*bu));
			}
		}

		let ancestors = collect_ancestors(&business_units)?;
		for (bu, chain) in ancestors {
			for ancestor in chain {
				if let Some(node) = business_units.get_mut(&ancestor) {
					node.subordinates.insert(bu);
				}
			}
		}

		let mut organizations = self.organizations.clone();
		let mut users = BTreeMap::new();
		let mut business_unit_users: BTreeMap<BusinessUnitId, BTreeSet<UserId>> = BTreeMap::new();

		for (user, facts) in &self.users {
			let mut node = UserNode {
				owner: facts.owner,
				organizations: facts.organizations.clone(),
				..UserNode::default()
			};

			if let Some(owner) = facts.owner {
				let owner_node = business_units
					.get(&owner)
					.ok_or(TreeError::UnknownBusinessUnit(owner))?;
				node.organization = owner_node.organization;
				node.business_units.insert(owner, owner_node.organization);
			}

			for (bu, assigned_in) in &facts.business_units {
				let bu_node = business_units
					.get(bu)
					.ok_or(TreeError::UnknownBusinessUnit(*bu))?;
				node
					.business_units
					.insert(*bu, assigned_in.or(bu_node.organization));
			}

			node.organizations.extend(node.organization);
			node
				.organizations
				.extend(node.business_units.values().flatten().copied());

			if node.organizations.is_empty() {
				warn!(user_id = %user, "user belongs to no organization");
			}

			for bu in node.business_units.keys() {
				business_unit_users.entry(*bu).or_default().insert(*user);
			}
			organizations.extend(node.organizations.iter().copied());
			users.insert(*user, node);
		}

		debug!(
			organizations = organizations.len(),
			business_units = business_units.len(),
			users = users.len(),
			"owner tree built"
		);

		Ok(OwnerTree {
			organizations,
			business_units,
			users,
			organization_business_units,
			business_unit_users,
		})
	}
}

/// Walks each unit's parent chain, failing on loops.
fn collect_ancestors(
	business_units: &BTreeMap<BusinessUnitId, BusinessUnitNode>,
) -> Result<Vec<(BusinessUnitId, Vec<BusinessUnitId>)>, TreeError> {
	let mut result = Vec::with_capacity(business_units.len());

	for (bu, node) in business_units {
		let mut chain = Vec::new();
		let mut seen = BTreeSet::from([*bu]);
		let mut current = node.parent;

		while let Some(parent) = current {
			if !seen.insert(parent) {
				return Err(TreeError::Cycle(*bu));
			}
			chain.push(parent);
			current = business_units.get(&parent).and_then(|n| n.parent);
		}

		result.push((*bu, chain));
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn org(id: i64) -> OrganizationId {
		OrganizationId::new(id)
	}

	fn bu(id: i64) -> BusinessUnitId {
		BusinessUnitId::new(id)
	}

	fn user(id: i64) -> UserId {
		UserId::new(id)
	}

	fn nested_tree() -> OwnerTree {
		let mut builder = OwnerTree::builder();
		builder
			.add_business_unit(bu(4), Some(org(4)))
			.add_business_unit(bu(41), Some(org(4)))
			.add_business_unit(bu(411), Some(org(4)))
			.add_business_unit(bu(42), Some(org(4)))
			.add_business_unit_relation(bu(41), Some(bu(4)))
			.add_business_unit_relation(bu(411), Some(bu(41)))
			.add_business_unit_relation(bu(42), Some(bu(4)))
			.add_user(user(4), Some(bu(4)))
			.add_user(user(411), Some(bu(411)));
		builder.build().unwrap()
	}

	mod building {
		use super::*;

		#[test]
		fn empty_builder_builds_empty_tree() {
			let tree = OwnerTree::builder().build().unwrap();
			assert_eq!(tree.organization_ids().count(), 0);
			assert!(tree.user_organization_ids(user(1)).is_empty());
		}

		#[test]
		fn rejects_cycles() {
			let mut builder = OwnerTree::builder();
			builder
				.add_business_unit(bu(1), Some(org(1)))
				.add_business_unit(bu(2), Some(org(1)))
				.add_business_unit_relation(bu(1), Some(bu(2)))
				.add_business_unit_relation(bu(2), Some(bu(1)));
			assert!(matches!(builder.build(), Err(TreeError::Cycle(_))));
		}

		#[test]
		fn rejects_self_parent() {
			let mut builder = OwnerTree::builder();
			builder
				.add_business_unit(bu(1), Some(org(1)))
				.add_business_unit_relation(bu(1), Some(bu(1)));
			assert_eq!(builder.build(), Err(TreeError::Cycle(bu(1))));
		}

		#[test]
		fn rejects_unknown_parent() {
			let mut builder = OwnerTree::builder();
			builder
				.add_business_unit(bu(1), Some(org(1)))
				.add_business_unit_relation(bu(1), Some(bu(9)));
			assert_eq!(builder.build(), Err(TreeError::UnknownBusinessUnit(bu(9))));
		}

		#[test]
		fn rejects_user_in_unknown_business_unit() {
			let mut builder = OwnerTree::builder();
			builder.add_user(user(1), Some(bu(9)));
			assert_eq!(builder.build(), Err(TreeError::UnknownBusinessUnit(bu(9))));
		}

		#[test]
		fn organizations_referenced_anywhere_exist() {
			let mut builder = OwnerTree::builder();
			builder
				.add_organization(org(1))
				.add_business_unit(bu(2), Some(org(2)))
				.add_user_organization(user(1), org(3));
			let tree = builder.build().unwrap();
			assert!(tree.organization_exists(org(1)));
			assert!(tree.organization_exists(org(2)));
			assert!(tree.organization_exists(org(3)));
			assert!(!tree.organization_exists(org(4)));
		}
	}

	mod business_units {
		use super::*;

		#[test]
		fn subordinates_are_transitive() {
			let tree = nested_tree();
			assert_eq!(
				tree.subordinate_business_unit_ids(bu(4), false),
				BTreeSet::from([bu(41), bu(411), bu(42)])
			);
			assert_eq!(
				tree.subordinate_business_unit_ids(bu(41), true),
				BTreeSet::from([bu(41), bu(411)])
			);
			assert!(tree.subordinate_business_unit_ids(bu(411), false).is_empty());
		}

		#[test]
		fn unknown_unit_has_no_subordinates_even_with_self() {
			let tree = nested_tree();
			assert!(tree.subordinate_business_unit_ids(bu(99), true).is_empty());
		}

		#[test]
		fn is_subordinate_is_strict() {
			let tree = nested_tree();
			assert!(tree.is_subordinate(bu(4), bu(411)));
			assert!(!tree.is_subordinate(bu(411), bu(4)));
			assert!(!tree.is_subordinate(bu(4), bu(4)));
			assert!(!tree.is_subordinate(bu(41), bu(42)));
		}

		#[test]
		fn organization_and_parent_lookups() {
			let tree = nested_tree();
			assert_eq!(tree.business_unit_organization_id(bu(411)), Some(org(4)));
			assert_eq!(tree.business_unit_parent_id(bu(411)), Some(bu(41)));
			assert_eq!(tree.business_unit_parent_id(bu(4)), None);
			assert_eq!(
				tree.organization_business_unit_ids(org(4)),
				&BTreeSet::from([bu(4), bu(41), bu(411), bu(42)])
			);
		}

		#[test]
		fn users_assigned_to_business_unit() {
			let tree = nested_tree();
			assert_eq!(
				tree.users_assigned_to_business_unit(bu(411)),
				&BTreeSet::from([user(411)])
			);
			assert!(tree.users_assigned_to_business_unit(bu(42)).is_empty());
		}
	}

	mod users {
		use super::*;

		#[test]
		fn owning_unit_defines_primary_organization() {
			let tree = nested_tree();
			assert_eq!(tree.user_business_unit_id(user(411)), Some(bu(411)));
			assert_eq!(tree.user_organization_id(user(411)), Some(org(4)));
			assert_eq!(
				tree.user_organization_ids(user(411)),
				&BTreeSet::from([org(4)])
			);
		}

		#[test]
		fn multi_organization_membership() {
			let mut builder = OwnerTree::builder();
			builder
				.add_business_unit(bu(1), Some(org(1)))
				.add_business_unit(bu(2), Some(org(2)))
				.add_user(user(1), Some(bu(1)))
				.add_user_organization(user(1), org(3))
				.add_user_business_unit(user(1), None, bu(2));
			let tree = builder.build().unwrap();

			assert_eq!(tree.user_organization_id(user(1)), Some(org(1)));
			assert_eq!(
				tree.user_organization_ids(user(1)),
				&BTreeSet::from([org(1), org(2), org(3)])
			);
			assert_eq!(
				tree.user_business_unit_ids(user(1), None),
				BTreeSet::from([bu(1), bu(2)])
			);
			assert_eq!(
				tree.user_business_unit_ids(user(1), Some(org(2))),
				BTreeSet::from([bu(2)])
			);
		}

		#[test]
		fn subordinate_units_of_user() {
			let tree = nested_tree();
			assert_eq!(
				tree.user_subordinate_business_unit_ids(user(4), None),
				BTreeSet::from([bu(4), bu(41), bu(411), bu(42)])
			);
			assert_eq!(
				tree.user_subordinate_business_unit_ids(user(4), Some(org(1))),
				BTreeSet::new()
			);
		}

		#[test]
		fn business_units_by_user_organizations() {
			let tree = nested_tree();
			assert_eq!(
				tree.business_units_by_user_organizations(user(411)),
				BTreeSet::from([bu(4), bu(41), bu(411), bu(42)])
			);
		}

		#[test]
		fn unknown_user_has_nothing() {
			let tree = nested_tree();
			assert!(!tree.contains_user(user(99)));
			assert!(tree.user_organization_ids(user(99)).is_empty());
			assert_eq!(tree.user_business_unit_id(user(99)), None);
			assert!(tree.user_business_unit_ids(user(99), None).is_empty());
		}
	}

	proptest! {
		#[test]
		fn chain_closure_matches_depth(depth in 1usize..24) {
			let mut builder = OwnerTree::builder();
			for i in 0..depth {
				let id = i64::try_from(i).unwrap();
				builder.add_business_unit(bu(id), Some(org(1)));
				if i > 0 {
					builder.add_business_unit_relation(bu(id), Some(bu(id - 1)));
				}
			}
			let tree = builder.build().unwrap();
			for i in 0..depth {
				let id = i64::try_from(i).unwrap();
				prop_assert_eq!(
					tree.subordinate_business_unit_ids(bu(id), false).len(),
					depth - i - 1
				);
			}
		}

		#[test]
		fn rebuilding_is_deterministic(parents in proptest::collection::vec(proptest::option::of(0usize..8), 1..8)) {
			let mut builder = OwnerTree::builder();
			for (i, parent) in parents.iter().enumerate() {
				let id = i64::try_from(i).unwrap();
				builder.add_business_unit(bu(id), Some(org(1)));
				// Only point at earlier units so the input is acyclic.
				if let Some(p) = parent.filter(|p| *p < i) {
					builder.add_business_unit_relation(bu(id), Some(bu(i64::try_from(p).unwrap())));
				}
			}
			prop_assert_eq!(builder.build().unwrap(), builder.build().unwrap());
		}
	}
}
