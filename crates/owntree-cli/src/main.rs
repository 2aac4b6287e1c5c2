// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use owntree_config::{LogFormat, LoggingConfig, OwntreeConfig};
use owntree_core::{ObjectIdentity, Permission};

use commands::{Engine, TargetRef};

/// Owntree - ownership decisions over an organization hierarchy
#[derive(Parser, Debug)]
#[command(name = "owntree", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, env = "OWNTREE_CONFIG")]
	config: Option<PathBuf>,

	/// Tree snapshot to load (overrides config)
	#[arg(short, long)]
	snapshot: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Summarize the owner tree, or one user's place in it
	Tree {
		#[arg(short, long)]
		user: Option<i64>,
	},

	/// Check how a user is associated with an organization, business unit or user
	Associated {
		#[arg(short, long)]
		user: i64,

		/// Target as KIND:ID, e.g. business_unit:4
		#[arg(short, long)]
		target: TargetRef,

		/// Include subordinate business units
		#[arg(long)]
		deep: bool,
	},

	/// Vote on a class level permission, e.g. CREATE on entity:Acme\Contact
	Decide {
		#[arg(short, long)]
		user: i64,

		#[arg(short, long)]
		organization: Option<i64>,

		#[arg(short, long)]
		permission: Permission,

		#[arg(short, long)]
		target: ObjectIdentity,
	},

	/// Check whether the owner set on a JSON entity record may be kept
	CheckOwner {
		#[arg(short, long)]
		user: i64,

		#[arg(short, long)]
		organization: Option<i64>,

		/// Path to the entity record
		#[arg(short, long)]
		entity: PathBuf,
	},
}

fn load_config(args: &Args) -> Result<OwntreeConfig> {
	let mut config = match &args.config {
		Some(path) => owntree_config::load_config_with_file(path),
		None => owntree_config::load_config(),
	}
	.context("failed to load configuration")?;

	if let Some(level) = &args.log_level {
		config.logging.level = level.clone();
	}
	if args.json_logs {
		config.logging.format = LogFormat::Json;
	}
	Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(format!(
			"owntree={0},owntree_core={0},owntree_config={0}",
			logging.level
		))
	});

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

/// Config is loaded before the subscriber exists, so its summary is logged here.
fn log_config_summary(config: &OwntreeConfig) {
	info!(
		snapshot_path = %config.tree.snapshot_path.display(),
		cache_enabled = config.tree.cache_enabled,
		log_level = %config.logging.level,
		log_format = %config.logging.format,
		default_level = %config.acl.default_level,
		grants = config.acl.grants.len(),
		entities = config.entities.classes.len(),
		"configuration loaded"
	);
}

fn main() -> Result<()> {
	let args = Args::parse();
	let config = load_config(&args)?;

	init_tracing(&config.logging);
	log_config_summary(&config);
	info!(command = ?args.command, "starting owntree");

	let engine = Engine::load(&config, args.snapshot.as_deref())?;

	let output = match &args.command {
		Command::Tree { user } => engine.tree(*user)?,
		Command::Associated { user, target, deep } => engine.associated(*user, *target, *deep)?,
		Command::Decide {
			user,
			organization,
			permission,
			target,
		} => engine.decide(*user, *organization, *permission, target)?,
		Command::CheckOwner {
			user,
			organization,
			entity,
		} => engine.check_owner(*user, *organization, entity)?,
	};

	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_associated_command() {
		let args = Args::try_parse_from([
			"owntree",
			"--snapshot",
			"/tmp/tree.json",
			"associated",
			"--user",
			"4",
			"--target",
			"user:411",
			"--deep",
		])
		.unwrap();

		assert_eq!(args.snapshot, Some(PathBuf::from("/tmp/tree.json")));
		match args.command {
			Command::Associated { user, target, deep } => {
				assert_eq!(user, 4);
				assert_eq!(target, "user:411".parse().unwrap());
				assert!(deep);
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn parses_decide_command() {
		let args = Args::try_parse_from([
			"owntree",
			"decide",
			"--user",
			"1",
			"--permission",
			"ASSIGN",
			"--target",
			"entity:Acme\\Contact",
		])
		.unwrap();

		match args.command {
			Command::Decide {
				user,
				organization,
				permission,
				target,
			} => {
				assert_eq!(user, 1);
				assert_eq!(organization, None);
				assert_eq!(permission, Permission::Assign);
				assert_eq!(target.class().as_str(), "Acme\\Contact");
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn rejects_bad_target() {
		let result = Args::try_parse_from([
			"owntree",
			"associated",
			"--user",
			"1",
			"--target",
			"team:1",
		]);
		assert!(result.is_err());
	}

	#[test]
	fn requires_subcommand() {
		assert!(Args::try_parse_from(["owntree"]).is_err());
	}

	mod config_summary {
		use super::*;
		use std::io;
		use std::sync::{Arc, Mutex};

		#[derive(Clone, Default)]
		struct Captured(Arc<Mutex<Vec<u8>>>);

		impl io::Write for Captured {
			fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
				self.0.lock().unwrap().extend_from_slice(buf);
				Ok(buf.len())
			}

			fn flush(&mut self) -> io::Result<()> {
				Ok(())
			}
		}

		#[test]
		fn summary_reaches_installed_subscriber() {
			let captured = Captured::default();
			let writer = captured.clone();
			let subscriber = tracing_subscriber::registry().with(
				fmt::layer()
					.with_ansi(false)
					.with_writer(move || writer.clone()),
			);

			let mut config = OwntreeConfig::default();
			config.tree.snapshot_path = PathBuf::from("/srv/tree.json");
			config.logging.format = LogFormat::Json;
			tracing::subscriber::with_default(subscriber, || log_config_summary(&config));

			let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
			assert!(output.contains("configuration loaded"));
			assert!(output.contains("snapshot_path=/srv/tree.json"));
			assert!(output.contains("cache_enabled=true"));
			assert!(output.contains("log_format=json"));
		}

		#[test]
		fn cli_overrides_apply_before_summary() {
			let dir = tempfile::tempdir().unwrap();
			let path = dir.path().join("owntree.toml");
			std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

			let args = Args::try_parse_from([
				"owntree",
				"--config",
				path.to_str().unwrap(),
				"--log-level",
				"trace",
				"--json-logs",
				"tree",
			])
			.unwrap();
			let config = load_config(&args).unwrap();

			assert_eq!(config.logging.level, "trace");
			assert_eq!(config.logging.format, LogFormat::Json);
		}
	}
}
