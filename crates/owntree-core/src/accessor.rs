// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reads owner and organization values off entity records.

use std::sync::Arc;

use crate::entity::{BusinessUnit, EntityClass, EntityRecord, FieldValue, Organization, User};
use crate::error::{OwnershipError, Result};
use crate::metadata::{OwnershipMetadata, OwnershipMetadataProvider};
use crate::types::{BusinessUnitId, OrganizationId, OwnershipType, UserId};

/// The owner object stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerRef<'a> {
	User(&'a User),
	BusinessUnit(&'a BusinessUnit),
	Organization(&'a Organization),
}

impl OwnerRef<'_> {
	/// Returns the owner's id, `None` if the owner is not persisted yet.
	pub fn id(&self) -> Option<OwnerId> {
		match self {
			OwnerRef::User(user) => user.id.map(OwnerId::User),
			OwnerRef::BusinessUnit(bu) => bu.id.map(OwnerId::BusinessUnit),
			OwnerRef::Organization(org) => org.id.map(OwnerId::Organization),
		}
	}
}

/// Typed owner id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerId {
	User(UserId),
	BusinessUnit(BusinessUnitId),
	Organization(OrganizationId),
}

/// Reads ownership fields using the field names declared in the class metadata.
#[derive(Clone)]
pub struct EntityOwnerAccessor {
	metadata_provider: Arc<dyn OwnershipMetadataProvider>,
}

impl EntityOwnerAccessor {
	pub fn new(metadata_provider: Arc<dyn OwnershipMetadataProvider>) -> Self {
		Self { metadata_provider }
	}

	pub fn metadata(&self, entity: &EntityRecord) -> &OwnershipMetadata {
		self.metadata_provider.metadata(&entity.class)
	}

	pub fn class_metadata(&self, class: &EntityClass) -> &OwnershipMetadata {
		self.metadata_provider.metadata(class)
	}

	pub fn is_manageable(&self, class: &EntityClass) -> bool {
		self.metadata_provider.is_manageable(class)
	}

	/// Returns the owner object of the record.
	///
	/// Returns `Ok(None)` for unowned classes, null owners and owners stored only
	/// as a raw id.
	///
	/// # Errors
	/// - [`OwnershipError::MissingField`] if the record lacks the owner field
	/// - [`OwnershipError::OwnerTypeMismatch`] if the stored owner is of the wrong kind
	pub fn owner<'a>(&self, entity: &'a EntityRecord) -> Result<Option<OwnerRef<'a>>> {
		let metadata = self.metadata(entity);
		let Some(field) = metadata.owner_field_name() else {
			return Ok(None);
		};

		let value = read_field(entity, field)?;
		let expected = metadata.owner_type();
		match (expected, value) {
			(_, FieldValue::Null) | (_, FieldValue::Integer(_)) => Ok(None),
			(OwnershipType::User, FieldValue::User(user)) => Ok(Some(OwnerRef::User(user))),
			(OwnershipType::BusinessUnit, FieldValue::BusinessUnit(bu)) => {
				Ok(Some(OwnerRef::BusinessUnit(bu)))
			}
			(OwnershipType::Organization, FieldValue::Organization(org)) => {
				Ok(Some(OwnerRef::Organization(org)))
			}
			(expected, found) => Err(OwnershipError::OwnerTypeMismatch {
				class: entity.class.to_string(),
				expected,
				found: found.kind().to_string(),
			}),
		}
	}

	/// Returns the owner id of the record, read from the owner object or from a
	/// raw integer stored in the owner field.
	///
	/// # Errors
	/// Same as [`EntityOwnerAccessor::owner`].
	pub fn owner_id(&self, entity: &EntityRecord) -> Result<Option<OwnerId>> {
		let metadata = self.metadata(entity);
		let Some(field) = metadata.owner_field_name() else {
			return Ok(None);
		};

		if let FieldValue::Integer(raw) = read_field(entity, field)? {
			return Ok(match metadata.owner_type() {
				OwnershipType::User => Some(OwnerId::User(UserId::new(*raw))),
				OwnershipType::BusinessUnit => Some(OwnerId::BusinessUnit(BusinessUnitId::new(*raw))),
				OwnershipType::Organization => {
					Some(OwnerId::Organization(OrganizationId::new(*raw)))
				}
				OwnershipType::None => None,
			});
		}

		Ok(self.owner(entity)?.and_then(|owner| owner.id()))
	}

	/// Returns the organization object of the record, if the class declares an
	/// organization field and the record holds one. A record without the field
	/// has no organization.
	///
	/// # Errors
	/// Returns [`OwnershipError::OwnerTypeMismatch`] if the field holds something
	/// other than an organization.
	pub fn organization<'a>(&self, entity: &'a EntityRecord) -> Result<Option<&'a Organization>> {
		let metadata = self.metadata(entity);
		let Some(value) = metadata
			.organization_field_name()
			.and_then(|field| entity.field(field))
		else {
			return Ok(None);
		};

		match value {
			FieldValue::Organization(org) => Ok(Some(org)),
			FieldValue::Null | FieldValue::Integer(_) => Ok(None),
			other => Err(OwnershipError::OwnerTypeMismatch {
				class: entity.class.to_string(),
				expected: OwnershipType::Organization,
				found: other.kind().to_string(),
			}),
		}
	}

	/// Returns the organization id of the record.
	///
	/// # Errors
	/// Same as [`EntityOwnerAccessor::organization`].
	pub fn organization_id(&self, entity: &EntityRecord) -> Result<Option<OrganizationId>> {
		let metadata = self.metadata(entity);
		let raw = metadata
			.organization_field_name()
			.and_then(|field| entity.field(field));
		if let Some(FieldValue::Integer(raw)) = raw {
			return Ok(Some(OrganizationId::new(*raw)));
		}
		Ok(self.organization(entity)?.and_then(|org| org.id))
	}
}

fn read_field<'a>(entity: &'a EntityRecord, field: &str) -> Result<&'a FieldValue> {
	entity
		.field(field)
		.ok_or_else(|| OwnershipError::MissingField {
			class: entity.class.to_string(),
			field: field.to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::StaticOwnershipMetadataProvider;

	const CONTACT: &str = "Acme\\Contact";
	const ACCOUNT: &str = "Acme\\Account";
	const CHANNEL: &str = "Acme\\Channel";
	const TAG: &str = "Acme\\Tag";

	fn accessor() -> EntityOwnerAccessor {
		let contact = EntityClass::from(CONTACT);
		let account = EntityClass::from(ACCOUNT);
		let channel = EntityClass::from(CHANNEL);
		let provider = StaticOwnershipMetadataProvider::new()
			.with_entity(
				CONTACT,
				OwnershipMetadata::new(&contact, OwnershipType::User, Some("owner".into()), None)
					.unwrap()
					.with_organization_field("organization", None),
			)
			.with_entity(
				ACCOUNT,
				OwnershipMetadata::new(
					&account,
					OwnershipType::BusinessUnit,
					Some("owner".into()),
					Some("business_unit_owner_id".into()),
				)
				.unwrap(),
			)
			.with_entity(
				CHANNEL,
				OwnershipMetadata::new(
					&channel,
					OwnershipType::Organization,
					Some("owner".into()),
					None,
				)
				.unwrap(),
			);
		EntityOwnerAccessor::new(Arc::new(provider))
	}

	#[test]
	fn reads_user_owner() {
		let owner = User::new(UserId::new(3), "user3");
		let record = EntityRecord::new(CONTACT, Some(1))
			.with_field("owner", FieldValue::User(owner.clone()))
			.with_field("organization", FieldValue::Null);

		let accessor = accessor();
		assert_eq!(accessor.owner(&record).unwrap(), Some(OwnerRef::User(&owner)));
		assert_eq!(
			accessor.owner_id(&record).unwrap(),
			Some(OwnerId::User(UserId::new(3)))
		);
		assert_eq!(accessor.organization_id(&record).unwrap(), None);
	}

	#[test]
	fn reads_raw_owner_id_by_ownership_type() {
		let record = EntityRecord::new(ACCOUNT, Some(1)).with_field("owner", FieldValue::Integer(41));
		let accessor = accessor();
		assert_eq!(accessor.owner(&record).unwrap(), None);
		assert_eq!(
			accessor.owner_id(&record).unwrap(),
			Some(OwnerId::BusinessUnit(BusinessUnitId::new(41)))
		);
	}

	#[test]
	fn reads_organization_field() {
		let org = Organization::new(OrganizationId::new(2), "org2");
		let record = EntityRecord::new(CONTACT, None)
			.with_field("owner", FieldValue::Null)
			.with_field("organization", FieldValue::Organization(org.clone()));

		let accessor = accessor();
		assert_eq!(accessor.owner(&record).unwrap(), None);
		assert_eq!(accessor.organization(&record).unwrap(), Some(&org));
		assert_eq!(
			accessor.organization_id(&record).unwrap(),
			Some(OrganizationId::new(2))
		);
	}

	#[test]
	fn record_without_organization_field_has_no_organization() {
		let record = EntityRecord::new(CONTACT, Some(1)).with_field("owner", FieldValue::Null);
		let accessor = accessor();
		assert_eq!(accessor.organization(&record).unwrap(), None);
		assert_eq!(accessor.organization_id(&record).unwrap(), None);
	}

	#[test]
	fn missing_owner_field_is_an_error() {
		let record = EntityRecord::new(CHANNEL, Some(1));
		let err = accessor().owner(&record).unwrap_err();
		assert!(matches!(err, OwnershipError::MissingField { ref field, .. } if field == "owner"));
	}

	#[test]
	fn owner_of_wrong_kind_is_an_error() {
		let record = EntityRecord::new(CHANNEL, Some(1)).with_field(
			"owner",
			FieldValue::User(User::new(UserId::new(1), "user1")),
		);
		let err = accessor().owner(&record).unwrap_err();
		assert!(matches!(
			err,
			OwnershipError::OwnerTypeMismatch {
				expected: OwnershipType::Organization,
				..
			}
		));
	}

	#[test]
	fn unowned_class_has_no_owner() {
		let record = EntityRecord::new(TAG, Some(1));
		let accessor = accessor();
		assert_eq!(accessor.owner(&record).unwrap(), None);
		assert_eq!(accessor.owner_id(&record).unwrap(), None);
		assert_eq!(accessor.organization(&record).unwrap(), None);
	}
}
