// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{instrument, warn};
use vanish_server_config::{AuditConfig, QueueOverflowPolicy};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditLogEntry;
use crate::sink::AuditSink;

/// Queues audit entries and fans them out to sinks in the background.
///
/// Callers never wait on a sink. Each entry is published to every sink in
/// its own task, and sink failures are logged and dropped.
pub struct AuditService {
	tx: mpsc::Sender<AuditLogEntry>,
	/// Shared with the worker so `DropOldest` can evict the queue head.
	rx: Arc<Mutex<mpsc::Receiver<AuditLogEntry>>>,
	overflow_policy: QueueOverflowPolicy,
	sinks: Vec<Arc<dyn AuditSink>>,
	worker: JoinHandle<()>,
}

impl AuditService {
	pub fn new(
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));
		let rx = Arc::new(Mutex::new(rx));

		let worker = tokio::spawn(Self::background_task(Arc::clone(&rx), sinks.clone()));

		Self {
			tx,
			rx,
			overflow_policy,
			sinks,
			worker,
		}
	}

	pub fn from_config(config: &AuditConfig, sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		let sinks = if config.enabled { sinks } else { Vec::new() };
		Self::new(config.queue_capacity, config.queue_overflow_policy, sinks)
	}

	async fn background_task(
		rx: Arc<Mutex<mpsc::Receiver<AuditLogEntry>>>,
		sinks: Vec<Arc<dyn AuditSink>>,
	) {
		let mut in_flight = JoinSet::new();

		loop {
			let next = rx.lock().await.recv().await;
			let Some(entry) = next else {
				break;
			};
			let entry = Arc::new(entry);

			for sink in &sinks {
				let sink = Arc::clone(sink);
				let entry = Arc::clone(&entry);

				in_flight.spawn(async move {
					if let Err(e) = sink.publish(entry).await {
						warn!(sink = sink.name(), error = %e, "audit sink publish failed");
					}
				});
			}

			while in_flight.try_join_next().is_some() {}
		}

		while in_flight.join_next().await.is_some() {}
	}

	/// Log an audit entry to the queue for processing.
	///
	/// Returns `true` if the entry was queued, `false` if dropped.
	///
	/// - `Block`: sends from a spawned task, so the caller still returns at once
	/// - `DropNewest`: drops the new entry when the queue is full
	/// - `DropOldest`: evicts the head of a full queue to make room. If the
	///   worker is already receiving the head, the entry is sent from a
	///   spawned task once that slot frees.
	#[instrument(skip(self, entry), fields(action = %entry.action))]
	pub fn log(&self, entry: AuditLogEntry) -> bool {
		match self.overflow_policy {
			QueueOverflowPolicy::Block => {
				let tx = self.tx.clone();
				tokio::spawn(async move {
					let _ = tx.send(entry).await;
				});
				true
			}
			QueueOverflowPolicy::DropNewest => match self.tx.try_send(entry) {
				Ok(()) => true,
				Err(e) => {
					report_dropped(e);
					false
				}
			},
			QueueOverflowPolicy::DropOldest => match self.tx.try_send(entry) {
				Ok(()) => true,
				Err(mpsc::error::TrySendError::Full(entry)) => match self.rx.try_lock() {
					Ok(mut rx) => replace_oldest(&mut rx, &self.tx, entry),
					Err(_) => {
						// Worker holds the receiver and is taking the head.
						let tx = self.tx.clone();
						tokio::spawn(async move {
							let _ = tx.send(entry).await;
						});
						true
					}
				},
				Err(e) => {
					report_dropped(e);
					false
				}
			},
		}
	}

	/// Queue an entry, waiting for capacity regardless of the overflow policy.
	pub async fn log_blocking(&self, entry: AuditLogEntry) -> AuditResult<()> {
		self.tx.send(entry).await.map_err(|_| AuditError::Shutdown)
	}

	/// Probe every sink; the first failure is returned.
	pub async fn health_check(&self) -> AuditResult<()> {
		for sink in &self.sinks {
			sink
				.health_check()
				.await
				.map_err(|source| AuditError::SinkError {
					sink: sink.name().to_string(),
					source,
				})?;
		}
		Ok(())
	}

	/// Close the queue and wait until every queued entry has been published.
	pub async fn shutdown(self) {
		let Self { tx, worker, .. } = self;
		drop(tx);
		if let Err(e) = worker.await {
			warn!(error = %e, "audit worker terminated abnormally");
		}
	}
}

fn report_dropped(e: mpsc::error::TrySendError<AuditLogEntry>) {
	let reason = match e {
		mpsc::error::TrySendError::Full(_) => AuditError::QueueFull,
		mpsc::error::TrySendError::Closed(_) => AuditError::Shutdown,
	};
	warn!(error = %reason, "audit entry dropped");
}

/// Drop the queue head, if any, and enqueue `entry` in its place.
fn replace_oldest(
	rx: &mut mpsc::Receiver<AuditLogEntry>,
	tx: &mpsc::Sender<AuditLogEntry>,
	entry: AuditLogEntry,
) -> bool {
	if let Ok(oldest) = rx.try_recv() {
		warn!(action = %oldest.action, "audit queue full, dropped oldest entry");
	}
	match tx.try_send(entry) {
		Ok(()) => true,
		Err(e) => {
			report_dropped(e);
			false
		}
	}
}
