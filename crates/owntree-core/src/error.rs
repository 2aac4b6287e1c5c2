// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{BusinessUnitId, OwnershipType};

/// Result type alias for ownership operations.
pub type Result<T> = std::result::Result<T, OwnershipError>;

/// Errors raised by ownership decisions and their collaborators.
///
/// A negative decision is never an error: "not associated" and "owner cannot be
/// set" are reported as `Ok(false)`. These variants cover contract violations
/// (missing subject or target), malformed metadata and tree loading failures.
#[derive(Error, Debug)]
pub enum OwnershipError {
	#[error("Invalid domain object: {0}")]
	InvalidDomainObject(String),

	#[error("Invalid ownership metadata for {class}: {reason}")]
	InvalidMetadata { class: String, reason: String },

	#[error("Entity {class} has no field '{field}'")]
	MissingField { class: String, field: String },

	#[error("Owner of {class} must be {expected:?}, found {found}")]
	OwnerTypeMismatch {
		class: String,
		expected: OwnershipType,
		found: String,
	},

	#[error("Unknown ownership type: {0}")]
	UnknownOwnershipType(String),

	#[error("Unknown access level: {0}")]
	UnknownAccessLevel(String),

	#[error("Unknown permission: {0}")]
	UnknownPermission(String),

	#[error("Invalid object identity descriptor: {0}")]
	InvalidObjectIdentity(String),

	#[error("Owner tree error: {0}")]
	Tree(#[from] TreeError),

	#[error("Failed to read tree snapshot {path}: {source}")]
	SnapshotRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse tree snapshot {path}: {source}")]
	SnapshotParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Errors detected while building an [`crate::tree::OwnerTree`].
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum TreeError {
	#[error("Business unit parent chain contains a cycle through {0}")]
	Cycle(BusinessUnitId),

	#[error("Unknown business unit: {0}")]
	UnknownBusinessUnit(BusinessUnitId),
}
