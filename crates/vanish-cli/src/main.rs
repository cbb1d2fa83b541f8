// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Vanish operator binary: create, read and delete one-time secrets.

use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vanish_common_secret::SecretString;
use vanish_server_config::{LogFormat, LoggingConfig};
use vanish_server_secrets::{CreateSecret, RequestContext, SecretsError};

mod app;
mod version;

use app::App;

/// Vanish - one-time secret sharing.
#[derive(Parser, Debug)]
#[command(name = "vanish", about = "One-time secret sharing", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/vanish/server.toml)
	#[arg(long, env = "VANISH_CONFIG", global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Store a secret and print its key
	Create {
		/// Secret value, or `-` to read it from stdin
		secret: String,

		/// Passphrase required to delete the secret
		#[arg(long, env = "VANISH_PASSPHRASE", hide_env_values = true)]
		passphrase: Option<String>,

		/// Lifetime in seconds
		#[arg(long)]
		ttl: Option<i64>,
	},
	/// Print a secret, consuming it
	Read { key: String },
	/// Delete a secret before it is read
	Delete {
		key: String,

		#[arg(long, env = "VANISH_PASSPHRASE", hide_env_values = true)]
		passphrase: Option<String>,
	},
	/// Discard ciphertext of expired, read and deleted secrets
	Purge,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return ExitCode::SUCCESS;
	}

	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("error: {e:#}");
			ExitCode::from(exit_code(&e))
		}
	}
}

async fn run(args: Args) -> anyhow::Result<()> {
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => vanish_server_config::load_config_with_file(path),
		None => vanish_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);
	tracing::debug!(
		environment = %config.environment,
		database = %config.database.url,
		"starting vanish"
	);

	let app = App::build(&config).await?;
	let result = execute(&app, args.command).await;
	app.shutdown().await;
	result
}

async fn execute(app: &App, command: Command) -> anyhow::Result<()> {
	let ctx = RequestContext::new().with_user_agent(format!("vanish-cli/{}", env!("CARGO_PKG_VERSION")));

	match command {
		Command::Create {
			secret,
			passphrase,
			ttl,
		} => {
			let secret = if secret == "-" {
				let mut buf = String::new();
				std::io::stdin()
					.read_to_string(&mut buf)
					.context("failed to read secret from stdin")?;
				strip_trailing_newline(buf)
			} else {
				secret
			};

			let mut request = CreateSecret::new(secret);
			if let Some(passphrase) = passphrase {
				request = request.with_passphrase(passphrase);
			}
			if let Some(ttl) = ttl {
				request = request.with_ttl_seconds(ttl);
			}

			let key = app.service.create(request, &ctx).await?;
			println!("{key}");
		}
		Command::Read { key } => {
			let secret = app.service.read(&key, &ctx).await?;
			println!("{}", secret.expose());
		}
		Command::Delete { key, passphrase } => {
			let passphrase = passphrase.map(SecretString::new);
			app.service.delete(&key, passphrase.as_ref(), &ctx).await?;
		}
		Command::Purge => {
			let purged = app.service.purge_expired().await?;
			println!("{purged}");
		}
		Command::Version => {}
	}

	Ok(())
}

fn init_tracing(config: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.level.clone().into());

	// stdout carries command output only
	let (pretty, json) = match config.format {
		LogFormat::Pretty => (
			Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
			None,
		),
		LogFormat::Json => (
			None,
			Some(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			),
		),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(pretty)
		.with(json)
		.init();
}

/// Drop a single trailing line ending, as left by `echo` or a heredoc.
fn strip_trailing_newline(mut value: String) -> String {
	if value.ends_with('\n') {
		value.pop();
		if value.ends_with('\r') {
			value.pop();
		}
	}
	value
}

fn exit_code(error: &anyhow::Error) -> u8 {
	match error.downcast_ref::<SecretsError>() {
		Some(SecretsError::Validation(_)) => 2,
		Some(SecretsError::NotFound) => 3,
		Some(SecretsError::Forbidden) => 4,
		Some(SecretsError::Internal) | None => 1,
	}
}
