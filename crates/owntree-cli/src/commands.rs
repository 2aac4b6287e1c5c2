// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand implementations. Each returns the JSON document printed on stdout.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use owntree_config::OwntreeConfig;
use owntree_core::{
	AclTarget, AclVoter, AuthorizationChecker, BusinessUnitId, BusinessUnitManager,
	CachedOwnerTreeProvider, DomainObject, EntityOwnershipDecisionMaker, EntityRecord,
	ObjectIdentity, OrganizationId, OwnerChecker, OwnerTreeProvider, OwnerTreeSnapshot,
	OwnerTreeSource, Permission, SecurityToken, SnapshotFileSource, StaticTreeSource, User,
	UserId,
};

/// A hierarchy object named on the command line as `KIND:ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRef {
	Organization(OrganizationId),
	BusinessUnit(BusinessUnitId),
	User(UserId),
}

impl FromStr for TargetRef {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (kind, id) = s
			.split_once(':')
			.ok_or_else(|| format!("expected KIND:ID, got {s:?}"))?;
		let id: i64 = id
			.trim()
			.parse()
			.map_err(|_| format!("invalid id in {s:?}"))?;

		match kind.trim().to_ascii_lowercase().as_str() {
			"organization" | "org" => Ok(Self::Organization(OrganizationId::new(id))),
			"business_unit" | "business-unit" | "bu" => Ok(Self::BusinessUnit(BusinessUnitId::new(id))),
			"user" => Ok(Self::User(UserId::new(id))),
			other => Err(format!(
				"unknown target kind {other:?}, expected organization, business_unit or user"
			)),
		}
	}
}

/// Everything a command needs, wired from configuration and one snapshot read.
pub struct Engine {
	snapshot: OwnerTreeSnapshot,
	provider: Arc<CachedOwnerTreeProvider<StaticTreeSource>>,
	decision_maker: EntityOwnershipDecisionMaker,
	voter: Arc<AclVoter>,
}

impl Engine {
	pub fn load(config: &OwntreeConfig, snapshot_path: Option<&Path>) -> Result<Self> {
		let path: PathBuf = snapshot_path
			.map(Path::to_path_buf)
			.unwrap_or_else(|| config.tree.snapshot_path.clone());
		let snapshot = SnapshotFileSource::new(path.clone())
			.load()
			.with_context(|| format!("failed to load tree snapshot from {}", path.display()))?;
		Self::from_snapshot(config, snapshot)
	}

	pub fn from_snapshot(config: &OwntreeConfig, snapshot: OwnerTreeSnapshot) -> Result<Self> {
		let mut provider = CachedOwnerTreeProvider::new(StaticTreeSource::new(snapshot.clone()));
		if !config.tree.cache_enabled {
			provider = provider.without_cache();
		}
		let provider = Arc::new(provider);
		provider.warm_up().context("failed to build owner tree")?;

		let metadata = config
			.entities
			.metadata_provider()
			.context("invalid entity ownership configuration")?;
		let decision_maker = EntityOwnershipDecisionMaker::new(provider.clone(), Arc::new(metadata));
		let voter = Arc::new(AclVoter::new(decision_maker.clone(), config.acl.to_grants()));

		info!(
			organizations = snapshot.organizations.len(),
			business_units = snapshot.business_units.len(),
			users = snapshot.users.len(),
			"engine ready"
		);

		Ok(Self {
			snapshot,
			provider,
			decision_maker,
			voter,
		})
	}

	fn user(&self, id: i64) -> Result<User> {
		self
			.snapshot
			.user(UserId::new(id))
			.ok_or_else(|| anyhow!("user {id} is not in the snapshot"))
	}

	fn object(&self, target: TargetRef) -> Result<DomainObject> {
		let object = match target {
			TargetRef::Organization(id) => self.snapshot.organization(id).map(DomainObject::from),
			TargetRef::BusinessUnit(id) => self.snapshot.business_unit(id).map(DomainObject::from),
			TargetRef::User(id) => self.snapshot.user(id).map(DomainObject::from),
		};
		object.ok_or_else(|| anyhow!("{target:?} is not in the snapshot"))
	}

	fn token(&self, user: i64, organization: Option<i64>) -> Result<SecurityToken> {
		Ok(SecurityToken::for_user(
			self.user(user)?,
			organization.map(OrganizationId::new),
		))
	}

	/// Summarizes the tree, or one user's place in it.
	pub fn tree(&self, user: Option<i64>) -> Result<Value> {
		let tree = self.provider.tree()?;
		let loaded_at = self.provider.loaded_at();

		let Some(user) = user else {
			return Ok(json!({
				"organizations": tree.organization_ids().count(),
				"business_units": tree.business_unit_ids().count(),
				"users": tree.user_ids().count(),
				"loaded_at": loaded_at,
			}));
		};

		let id = UserId::new(user);
		if !tree.contains_user(id) {
			bail!("user {user} is not in the tree");
		}
		Ok(json!({
			"user": id,
			"organization": tree.user_organization_id(id),
			"organizations": tree.user_organization_ids(id),
			"business_unit": tree.user_business_unit_id(id),
			"business_units": tree.user_business_unit_ids(id, None),
			"subordinate_business_units": tree.user_subordinate_business_unit_ids(id, None),
			"loaded_at": loaded_at,
		}))
	}

	/// Runs the three association predicates for a user against a target.
	pub fn associated(&self, user: i64, target: TargetRef, deep: bool) -> Result<Value> {
		let subject = self.user(user)?;
		let object = self.object(target)?;
		let dm = &self.decision_maker;

		let organization = dm.is_associated_with_organization(Some(&subject), Some(&object))?;
		let business_unit = dm.is_associated_with_business_unit(Some(&subject), Some(&object), deep)?;
		let same_user = dm.is_associated_with_user(Some(&subject), Some(&object))?;
		debug!(user, ?target, organization, business_unit, same_user, "associations resolved");

		Ok(json!({
			"user": user,
			"deep": deep,
			"organization": organization,
			"business_unit": business_unit,
			"user_match": same_user,
		}))
	}

	/// Votes on a class level permission.
	pub fn decide(
		&self,
		user: i64,
		organization: Option<i64>,
		permission: Permission,
		target: &ObjectIdentity,
	) -> Result<Value> {
		let token = self.token(user, organization)?;
		let decision = self
			.voter
			.decide(&token, permission, AclTarget::Class(target))?;

		Ok(json!({
			"target": target.to_string(),
			"permission": permission,
			"decision": decision,
		}))
	}

	/// Checks whether the owner set on a record read from `entity_path` may be kept.
	pub fn check_owner(&self, user: i64, organization: Option<i64>, entity_path: &Path) -> Result<Value> {
		let content = std::fs::read_to_string(entity_path)
			.with_context(|| format!("failed to read {}", entity_path.display()))?;
		let record: EntityRecord = serde_json::from_str(&content)
			.with_context(|| format!("failed to parse entity record {}", entity_path.display()))?;

		let token = self.token(user, organization)?;
		let checker = OwnerChecker::new(
			self.decision_maker.clone(),
			self.voter.clone(),
			Arc::new(BusinessUnitManager),
		);
		let allowed = checker.is_owner_can_be_set(&token, &record)?;

		Ok(json!({
			"class": record.class,
			"id": record.id,
			"owner_can_be_set": allowed,
		}))
	}
}
