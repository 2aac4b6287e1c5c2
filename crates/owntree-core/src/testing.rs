// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixture hierarchy and metadata for tests. Built for this crate's own tests
//! and behind the `testing` feature.
//!
//! ```text
//! org1  bu1    user1
//! org2  bu2    user2
//! org3  bu3    user3
//!        bu31  user31
//! org4  bu4    user4
//!        bu41  user41
//!          bu411 user411
//!        bu42  user42
//! org1  (no business unit) user5
//! ```

use std::sync::Arc;

use crate::decision::EntityOwnershipDecisionMaker;
use crate::entity::{BusinessUnit, EntityClass, EntityRecord, FieldValue, Organization, User};
use crate::metadata::{OwnershipMetadata, StaticOwnershipMetadataProvider};
use crate::provider::{
	BusinessUnitRow, CachedOwnerTreeProvider, OrganizationRow, OwnerTreeSnapshot, StaticTreeSource,
	UserRow,
};
use crate::token::SecurityToken;
use crate::tree::OwnerTree;
use crate::types::{BusinessUnitId, OrganizationId, OwnershipType, UserId};

pub const USER_OWNED_CLASS: &str = "Acme\\Contact";
pub const BUSINESS_UNIT_OWNED_CLASS: &str = "Acme\\Account";
pub const ORGANIZATION_OWNED_CLASS: &str = "Acme\\Channel";
pub const UNOWNED_CLASS: &str = "Acme\\Tag";

/// Owner and organization field names used by every fixture class.
pub const OWNER_FIELD: &str = "owner";
pub const ORGANIZATION_FIELD: &str = "organization";

const BUSINESS_UNITS: &[(i64, i64, Option<i64>)] = &[
	(1, 1, None),
	(2, 2, None),
	(3, 3, None),
	(31, 3, Some(3)),
	(4, 4, None),
	(41, 4, Some(4)),
	(411, 4, Some(41)),
	(42, 4, Some(4)),
];

/// Serialized form of the fixture hierarchy.
pub fn snapshot() -> OwnerTreeSnapshot {
	let mut users: Vec<UserRow> = BUSINESS_UNITS
		.iter()
		.map(|(id, _, _)| UserRow {
			id: UserId::new(*id),
			username: Some(format!("user{id}")),
			owner: Some(BusinessUnitId::new(*id)),
			organizations: Vec::new(),
			business_units: Vec::new(),
		})
		.collect();
	users.push(UserRow {
		id: UserId::new(5),
		username: Some("user5".to_string()),
		owner: None,
		organizations: vec![OrganizationId::new(1)],
		business_units: Vec::new(),
	});

	OwnerTreeSnapshot {
		organizations: (1..=4)
			.map(|id| OrganizationRow {
				id: OrganizationId::new(id),
				name: Some(format!("org{id}")),
			})
			.collect(),
		business_units: BUSINESS_UNITS
			.iter()
			.map(|(id, org, parent)| BusinessUnitRow {
				id: BusinessUnitId::new(*id),
				name: Some(format!("bu{id}")),
				organization: Some(OrganizationId::new(*org)),
				parent: parent.map(BusinessUnitId::new),
			})
			.collect(),
		users,
	}
}

/// The fixture hierarchy, built.
pub fn tree() -> OwnerTree {
	match snapshot().build() {
		Ok(tree) => tree,
		Err(e) => panic!("fixture tree must build: {e}"),
	}
}

/// Fixture user with its owning business unit and primary organization set.
pub fn user(id: i64) -> User {
	snapshot()
		.user(UserId::new(id))
		.unwrap_or_else(|| User::new(UserId::new(id), format!("user{id}")))
}

pub fn business_unit(id: i64) -> BusinessUnit {
	snapshot()
		.business_unit(BusinessUnitId::new(id))
		.unwrap_or_else(|| BusinessUnit {
			id: Some(BusinessUnitId::new(id)),
			name: format!("bu{id}"),
			organization: None,
			parent: None,
		})
}

pub fn organization(id: i64) -> Organization {
	Organization::new(OrganizationId::new(id), format!("org{id}"))
}

/// Metadata for one class of each ownership type.
pub fn metadata() -> StaticOwnershipMetadataProvider {
	let owned = |class: &str, owner_type: OwnershipType| {
		match OwnershipMetadata::new(
			&EntityClass::from(class),
			owner_type,
			Some(OWNER_FIELD.to_string()),
			Some(format!("{}_owner_id", owner_type.name().to_lowercase())),
		) {
			Ok(metadata) => metadata,
			Err(e) => panic!("fixture metadata must be valid: {e}"),
		}
	};

	StaticOwnershipMetadataProvider::new()
		.with_entity(
			USER_OWNED_CLASS,
			owned(USER_OWNED_CLASS, OwnershipType::User)
				.with_organization_field(ORGANIZATION_FIELD, Some("organization_id".to_string())),
		)
		.with_entity(
			BUSINESS_UNIT_OWNED_CLASS,
			owned(BUSINESS_UNIT_OWNED_CLASS, OwnershipType::BusinessUnit)
				.with_organization_field(ORGANIZATION_FIELD, Some("organization_id".to_string())),
		)
		.with_entity(
			ORGANIZATION_OWNED_CLASS,
			owned(ORGANIZATION_OWNED_CLASS, OwnershipType::Organization),
		)
		.with_entity(UNOWNED_CLASS, OwnershipMetadata::none())
}

/// Decision maker over the fixture hierarchy and metadata.
pub fn decision_maker() -> EntityOwnershipDecisionMaker {
	EntityOwnershipDecisionMaker::new(
		Arc::new(CachedOwnerTreeProvider::new(StaticTreeSource::new(snapshot()))),
		Arc::new(metadata()),
	)
}

/// Token of a fixture user acting in the given organization.
pub fn token(user_id: i64, organization: Option<i64>) -> SecurityToken {
	SecurityToken::for_user(user(user_id), organization.map(OrganizationId::new))
}

/// Record of `class` with the given owner value and no organization field.
pub fn record(class: &str, id: Option<i64>, owner: FieldValue) -> EntityRecord {
	EntityRecord::new(class, id).with_field(OWNER_FIELD, owner)
}
