// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use owntree_core::AccessLevel;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::OwntreeConfigLayer;
use crate::sections::{AclConfigLayer, LogFormat, LoggingConfigLayer, TreeConfigLayer};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/owntree/owntree.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<OwntreeConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<OwntreeConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(OwntreeConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(DEFAULT_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<OwntreeConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(OwntreeConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: OwntreeConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: OWNTREE_<SECTION>_<FIELD>. Entity definitions and grants are
/// file-only.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<OwntreeConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_vars(|name| std::env::var(name).ok())
	}
}

/// Builds a layer from a variable lookup.
fn layer_from_vars(
	lookup: impl Fn(&str) -> Option<String>,
) -> Result<OwntreeConfigLayer, ConfigError> {
	let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

	Ok(OwntreeConfigLayer {
		tree: Some(TreeConfigLayer {
			snapshot_path: var("OWNTREE_TREE_SNAPSHOT_PATH").map(PathBuf::from),
			cache_enabled: var("OWNTREE_TREE_CACHE_ENABLED").map(|v| parse_bool(&v)),
		}),
		logging: Some(LoggingConfigLayer {
			level: var("OWNTREE_LOG_LEVEL"),
			format: parse_var::<LogFormat>("OWNTREE_LOG_FORMAT", var("OWNTREE_LOG_FORMAT"))?,
		}),
		acl: Some(AclConfigLayer {
			default_level: parse_var::<AccessLevel>(
				"OWNTREE_ACL_DEFAULT_LEVEL",
				var("OWNTREE_ACL_DEFAULT_LEVEL"),
			)?,
			grants: None,
		}),
		entities: None,
	})
}

fn parse_bool(value: &str) -> bool {
	value.eq_ignore_ascii_case("true") || value == "1"
}

fn parse_var<T>(name: &str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match value {
		Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("'{v}': {e}"),
		}),
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.tree.is_none());
		assert!(layer.entities.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/owntree.toml").load().unwrap();
		assert!(layer.tree.is_none());
	}

	#[test]
	fn test_toml_source_reads_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[tree]
snapshot_path = "/srv/tree.json"

[acl]
default_level = "GLOBAL"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.tree.unwrap().snapshot_path,
			Some(PathBuf::from("/srv/tree.json"))
		);
		assert_eq!(layer.acl.unwrap().default_level, Some(AccessLevel::Global));
	}

	#[test]
	fn test_toml_source_invalid_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "[tree\nsnapshot_path = 1").unwrap();
		assert!(matches!(
			TomlSource::new(file.path()).load(),
			Err(ConfigError::TomlParse { .. })
		));
	}

	#[test]
	fn test_env_values() {
		let layer = layer_from_vars(vars(&[
			("OWNTREE_TREE_SNAPSHOT_PATH", "/tmp/tree.json"),
			("OWNTREE_TREE_CACHE_ENABLED", "0"),
			("OWNTREE_LOG_LEVEL", "debug"),
			("OWNTREE_LOG_FORMAT", "json"),
			("OWNTREE_ACL_DEFAULT_LEVEL", "deep"),
		]))
		.unwrap();

		let tree = layer.tree.unwrap();
		assert_eq!(tree.snapshot_path, Some(PathBuf::from("/tmp/tree.json")));
		assert_eq!(tree.cache_enabled, Some(false));
		let logging = layer.logging.unwrap();
		assert_eq!(logging.level.as_deref(), Some("debug"));
		assert_eq!(logging.format, Some(LogFormat::Json));
		assert_eq!(layer.acl.unwrap().default_level, Some(AccessLevel::Deep));
	}

	#[test]
	fn test_empty_env_values_are_unset() {
		let layer = layer_from_vars(vars(&[("OWNTREE_LOG_LEVEL", "")])).unwrap();
		assert!(layer.logging.unwrap().level.is_none());
	}

	#[test]
	fn test_invalid_env_value() {
		let err = layer_from_vars(vars(&[("OWNTREE_ACL_DEFAULT_LEVEL", "everything")])).unwrap_err();
		assert!(
			matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "OWNTREE_ACL_DEFAULT_LEVEL")
		);
	}
}
