// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit log entries for the secret lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The lifecycle action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretAction {
	Create,
	Read,
	Delete,
}

impl SecretAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			SecretAction::Create => "create",
			SecretAction::Read => "read",
			SecretAction::Delete => "delete",
		}
	}
}

impl fmt::Display for SecretAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One append-only record of a create, read or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub action: SecretAction,
	/// Full handle of the secret the action applied to. Sinks that write to
	/// shared log streams must truncate it.
	pub secret_key: String,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	/// Action-specific extras; `Null` when there are none.
	pub details: serde_json::Value,
}

impl AuditLogEntry {
	pub fn builder(action: SecretAction, secret_key: impl Into<String>) -> AuditLogBuilder {
		AuditLogBuilder::new(action, secret_key)
	}
}

#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	action: SecretAction,
	secret_key: String,
	ip_address: Option<String>,
	user_agent: Option<String>,
	details: serde_json::Value,
}

impl AuditLogBuilder {
	pub fn new(action: SecretAction, secret_key: impl Into<String>) -> Self {
		Self {
			action,
			secret_key: secret_key.into(),
			ip_address: None,
			user_agent: None,
			details: serde_json::Value::Null,
		}
	}

	/// Set the IP address of the request origin.
	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	/// Set the user agent string from the request.
	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			action: self.action,
			secret_key: self.secret_key,
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			details: self.details,
		}
	}
}
