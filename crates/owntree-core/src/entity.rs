// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain objects that ownership decisions are made about.
//!
//! This module provides:
//! - [`Organization`], [`BusinessUnit`], [`User`] - the three principal kinds
//! - [`EntityRecord`] - an arbitrary owned record with named fields
//! - [`DomainObject`] - the closed set of decision targets
//!
//! An id of `None` means the object has not been persisted yet.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{BusinessUnitId, OrganizationId, UserId};

/// Class name under which users are registered.
pub const USER_CLASS: &str = "User";
/// Class name under which business units are registered.
pub const BUSINESS_UNIT_CLASS: &str = "BusinessUnit";
/// Class name under which organizations are registered.
pub const ORGANIZATION_CLASS: &str = "Organization";

/// Name of an entity class, e.g. `Acme\Contact`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityClass(String);

impl EntityClass {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntityClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EntityClass {
	fn from(name: &str) -> Self {
		Self(name.to_string())
	}
}

/// Top-level tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
	pub id: Option<OrganizationId>,
	pub name: String,
}

impl Organization {
	pub fn new(id: OrganizationId, name: impl Into<String>) -> Self {
		Self {
			id: Some(id),
			name: name.into(),
		}
	}
}

/// A business unit inside exactly one organization, optionally nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUnit {
	pub id: Option<BusinessUnitId>,
	pub name: String,
	pub organization: Option<OrganizationId>,
	#[serde(default)]
	pub parent: Option<BusinessUnitId>,
}

impl BusinessUnit {
	pub fn new(id: BusinessUnitId, name: impl Into<String>, organization: OrganizationId) -> Self {
		Self {
			id: Some(id),
			name: name.into(),
			organization: Some(organization),
			parent: None,
		}
	}

	/// Builder: set the parent business unit.
	pub fn with_parent(mut self, parent: BusinessUnitId) -> Self {
		self.parent = Some(parent);
		self
	}
}

/// A user owned by a business unit, member of one or more organizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: Option<UserId>,
	pub username: String,
	/// The owning business unit.
	#[serde(default)]
	pub owner: Option<BusinessUnitId>,
	/// The primary organization.
	#[serde(default)]
	pub organization: Option<OrganizationId>,
	/// Additional organizations the user belongs to.
	#[serde(default)]
	pub organizations: Vec<OrganizationId>,
}

impl User {
	pub fn new(id: UserId, username: impl Into<String>) -> Self {
		Self {
			id: Some(id),
			username: username.into(),
			owner: None,
			organization: None,
			organizations: Vec::new(),
		}
	}

	/// Creates a user that has not been persisted yet.
	pub fn unsaved(username: impl Into<String>) -> Self {
		Self {
			id: None,
			username: username.into(),
			owner: None,
			organization: None,
			organizations: Vec::new(),
		}
	}

	/// Builder: set the owning business unit.
	pub fn with_owner(mut self, owner: BusinessUnitId) -> Self {
		self.owner = Some(owner);
		self
	}

	/// Builder: set the primary organization.
	pub fn with_organization(mut self, organization: OrganizationId) -> Self {
		self.organization = Some(organization);
		self
	}

	/// Builder: add an additional organization.
	pub fn with_additional_organization(mut self, organization: OrganizationId) -> Self {
		if !self.organizations.contains(&organization) {
			self.organizations.push(organization);
		}
		self
	}

	/// Returns true if the user's own fields place it in the organization.
	pub fn belongs_to_organization(&self, organization: OrganizationId) -> bool {
		self.organization == Some(organization) || self.organizations.contains(&organization)
	}
}

/// A value stored in an [`EntityRecord`] field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
	Null,
	Integer(i64),
	Text(String),
	Boolean(bool),
	User(User),
	BusinessUnit(BusinessUnit),
	Organization(Organization),
}

impl FieldValue {
	/// Short name of the value kind, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			FieldValue::Null => "null",
			FieldValue::Integer(_) => "integer",
			FieldValue::Text(_) => "text",
			FieldValue::Boolean(_) => "boolean",
			FieldValue::User(_) => "user",
			FieldValue::BusinessUnit(_) => "business_unit",
			FieldValue::Organization(_) => "organization",
		}
	}
}

/// An arbitrary record of an owned entity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
	pub class: EntityClass,
	#[serde(default)]
	pub id: Option<i64>,
	#[serde(default)]
	pub fields: BTreeMap<String, FieldValue>,
}

impl EntityRecord {
	pub fn new(class: impl Into<EntityClass>, id: Option<i64>) -> Self {
		Self {
			class: class.into(),
			id,
			fields: BTreeMap::new(),
		}
	}

	/// Builder: set a field value.
	pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
		self.fields.insert(name.into(), value);
		self
	}

	pub fn field(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}

	/// Returns true if the record has not been persisted yet.
	pub fn is_new(&self) -> bool {
		self.id.is_none()
	}
}

impl From<String> for EntityClass {
	fn from(name: String) -> Self {
		Self(name)
	}
}

/// Anything an ownership decision can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainObject {
	Organization(Organization),
	BusinessUnit(BusinessUnit),
	User(User),
	Entity(EntityRecord),
}

impl DomainObject {
	/// Returns the class the object is registered under.
	pub fn entity_class(&self) -> EntityClass {
		match self {
			DomainObject::Organization(_) => EntityClass::from(ORGANIZATION_CLASS),
			DomainObject::BusinessUnit(_) => EntityClass::from(BUSINESS_UNIT_CLASS),
			DomainObject::User(_) => EntityClass::from(USER_CLASS),
			DomainObject::Entity(record) => record.class.clone(),
		}
	}
}

impl From<Organization> for DomainObject {
	fn from(organization: Organization) -> Self {
		DomainObject::Organization(organization)
	}
}

impl From<BusinessUnit> for DomainObject {
	fn from(business_unit: BusinessUnit) -> Self {
		DomainObject::BusinessUnit(business_unit)
	}
}

impl From<User> for DomainObject {
	fn from(user: User) -> Self {
		DomainObject::User(user)
	}
}

impl From<EntityRecord> for DomainObject {
	fn from(record: EntityRecord) -> Self {
		DomainObject::Entity(record)
	}
}
