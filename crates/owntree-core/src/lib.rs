// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ownership decisions over an organization / business unit / user hierarchy.
//!
//! This crate provides:
//! - [`OwnerTree`] - the immutable hierarchy with precomputed subordinate closures
//! - [`OwnershipMetadata`] - how records of each entity class are owned
//! - [`EntityOwnerAccessor`] - reads owner and organization values off records
//! - [`EntityOwnershipDecisionMaker`] - organization, business unit and user association
//! - [`AclVoter`] - resolves ACL access levels and grants
//! - [`OwnerChecker`] - validates the owner assigned to a record
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use owntree_core::{
//!     CachedOwnerTreeProvider, DomainObject, EntityOwnershipDecisionMaker, OwnerTreeSnapshot,
//!     StaticOwnershipMetadataProvider, StaticTreeSource, UserId,
//! };
//!
//! let snapshot: OwnerTreeSnapshot = serde_json::from_str(
//!     r#"{
//!         "organizations": [{"id": 1, "name": "Acme"}],
//!         "business_units": [
//!             {"id": 1, "name": "Head office", "organization": 1},
//!             {"id": 2, "name": "Sales", "organization": 1, "parent": 1}
//!         ],
//!         "users": [
//!             {"id": 1, "username": "manager", "owner": 1},
//!             {"id": 2, "username": "seller", "owner": 2}
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! let manager = snapshot.user(UserId::new(1)).unwrap();
//! let report = DomainObject::from(snapshot.user(UserId::new(2)).unwrap());
//!
//! let decision_maker = EntityOwnershipDecisionMaker::new(
//!     Arc::new(CachedOwnerTreeProvider::new(StaticTreeSource::new(snapshot))),
//!     Arc::new(StaticOwnershipMetadataProvider::new()),
//! );
//! assert!(decision_maker
//!     .is_associated_with_business_unit(Some(&manager), Some(&report), true)
//!     .unwrap());
//! assert!(!decision_maker
//!     .is_associated_with_business_unit(Some(&manager), Some(&report), false)
//!     .unwrap());
//! ```

pub mod accessor;
pub mod acl;
pub mod business_unit;
pub mod decision;
pub mod entity;
pub mod error;
pub mod metadata;
pub mod owner_checker;
pub mod provider;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token;
pub mod tree;
pub mod types;

pub use accessor::{EntityOwnerAccessor, OwnerId, OwnerRef};
pub use acl::{
	normalize_access_level, AccessDecision, AclGrants, AclTarget, AclVoter, AuthorizationChecker,
	ObjectIdentity,
};
pub use business_unit::{BusinessUnitManager, OwnerAssignmentPolicy};
pub use decision::EntityOwnershipDecisionMaker;
pub use entity::{
	BusinessUnit, DomainObject, EntityClass, EntityRecord, FieldValue, Organization, User,
	BUSINESS_UNIT_CLASS, ORGANIZATION_CLASS, USER_CLASS,
};
pub use error::{OwnershipError, Result, TreeError};
pub use metadata::{OwnershipMetadata, OwnershipMetadataProvider, StaticOwnershipMetadataProvider};
pub use owner_checker::OwnerChecker;
pub use provider::{
	BusinessUnitRow, CachedOwnerTreeProvider, OrganizationRow, OwnerTreeProvider, OwnerTreeSnapshot,
	OwnerTreeSource, SnapshotFileSource, StaticTreeSource, UserBusinessUnitRow, UserRow,
};
pub use token::{Principal, SecurityToken};
pub use tree::{OwnerTree, OwnerTreeBuilder};
pub use types::{AccessLevel, BusinessUnitId, OrganizationId, OwnershipType, Permission, UserId};
