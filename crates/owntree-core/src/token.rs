// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Security context passed explicitly into every decision.

use serde::{Deserialize, Serialize};

use crate::entity::User;
use crate::types::OrganizationId;

/// Who is acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Principal {
	User(User),
	/// A non-user caller such as an API client or a background job.
	Service(String),
	Anonymous,
}

/// The authenticated caller and the organization it is acting in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityToken {
	pub principal: Principal,
	#[serde(default)]
	pub organization: Option<OrganizationId>,
}

impl SecurityToken {
	pub fn new(principal: Principal, organization: Option<OrganizationId>) -> Self {
		Self {
			principal,
			organization,
		}
	}

	/// Token of a user acting in the given organization.
	pub fn for_user(user: User, organization: Option<OrganizationId>) -> Self {
		Self::new(Principal::User(user), organization)
	}

	pub fn anonymous() -> Self {
		Self::new(Principal::Anonymous, None)
	}

	/// Returns the user principal, if the caller is a user.
	pub fn user(&self) -> Option<&User> {
		match &self.principal {
			Principal::User(user) => Some(user),
			Principal::Service(_) | Principal::Anonymous => None,
		}
	}
}
