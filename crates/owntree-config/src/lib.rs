// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the owntree ownership engine.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Typed sections for the owner tree, logging, ACL grants and entity ownership
//! - Consistent environment variable naming (`OWNTREE_*`)
//!
//! # Usage
//!
//! ```ignore
//! use owntree_config::load_config;
//!
//! let config = load_config()?;
//! println!("tree snapshot at {}", config.tree.snapshot_path.display());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::OwntreeConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, DEFAULT_CONFIG_PATH,
};

use std::collections::BTreeSet;

use tracing::debug;

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwntreeConfig {
	pub tree: TreeConfig,
	pub logging: LoggingConfig,
	pub acl: AclConfig,
	pub entities: EntitiesConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`OWNTREE_*`)
/// 2. Config file (`/etc/owntree/owntree.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<OwntreeConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<OwntreeConfig, ConfigError> {
	let mut merged = OwntreeConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<OwntreeConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<OwntreeConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = OwntreeConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: OwntreeConfigLayer) -> Result<OwntreeConfig, ConfigError> {
	let config = OwntreeConfig {
		tree: layer.tree.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		acl: layer.acl.unwrap_or_default().finalize(),
		entities: layer.entities.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	debug!(
		snapshot_path = %config.tree.snapshot_path.display(),
		cache_enabled = config.tree.cache_enabled,
		log_format = %config.logging.format,
		default_level = %config.acl.default_level,
		grants = config.acl.grants.len(),
		entities = config.entities.classes.len(),
		"owntree configuration resolved"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &OwntreeConfig) -> Result<(), ConfigError> {
	for (class, entity) in &config.entities.classes {
		let has_field = entity
			.owner_field
			.as_deref()
			.is_some_and(|field| !field.trim().is_empty());
		if entity.owner_type != owntree_core::OwnershipType::None && !has_field {
			return Err(ConfigError::Validation(format!(
				"entity {class} is owned by {} but has no owner_field",
				entity.owner_type
			)));
		}
	}

	let mut seen = BTreeSet::new();
	for grant in &config.acl.grants {
		if !seen.insert((grant.class.as_str(), grant.permission)) {
			return Err(ConfigError::Validation(format!(
				"duplicate ACL grant for {} {}",
				grant.class, grant.permission
			)));
		}
	}

	Ok(())
}
