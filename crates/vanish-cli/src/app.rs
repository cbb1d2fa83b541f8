// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring of the lifecycle engine from resolved configuration.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use vanish_server_audit::{AuditService, AuditSink, SqliteAuditSink, TracingAuditSink};
use vanish_server_cache::InMemoryCache;
use vanish_server_config::ServerConfig;
use vanish_server_crypto::Cipher;
use vanish_server_db::{create_pool, run_migrations, SecretRepository};
use vanish_server_secrets::SecretService;

pub struct App {
	pub service: SecretService,
	audit: Arc<AuditService>,
	sweeper: JoinHandle<()>,
}

impl App {
	pub async fn build(config: &ServerConfig) -> anyhow::Result<Self> {
		let pool = create_pool(&config.database)
			.await
			.context("failed to open database")?;
		run_migrations(&pool)
			.await
			.context("failed to run migrations")?;

		let cipher = Cipher::from_config(&config.crypto).context("invalid crypto configuration")?;

		let cache = Arc::new(InMemoryCache::from_config(&config.cache));
		let sweeper = cache.spawn_sweeper(config.cache.sweep_interval);

		let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
		if config.audit.tracing_sink {
			sinks.push(Arc::new(TracingAuditSink::new()));
		}
		if config.audit.sqlite_sink {
			sinks.push(Arc::new(SqliteAuditSink::new(pool.clone())));
		}
		let audit = Arc::new(AuditService::from_config(&config.audit, sinks));
		if let Err(e) = audit.health_check().await {
			tracing::warn!(error = %e, "audit sink health check failed");
		}

		let store = Arc::new(SecretRepository::from_config(pool, &config.database));
		let service = SecretService::new(
			cipher,
			cache,
			store,
			Arc::clone(&audit),
			config.secrets.clone(),
		);

		Ok(Self {
			service,
			audit,
			sweeper,
		})
	}

	/// Flush queued audit entries and stop background tasks.
	pub async fn shutdown(self) {
		let Self {
			service,
			audit,
			sweeper,
		} = self;
		drop(service);
		sweeper.abort();

		match Arc::try_unwrap(audit) {
			Ok(audit) => audit.shutdown().await,
			Err(_) => tracing::warn!("audit service still shared at shutdown; pending entries may be lost"),
		}
	}
}
