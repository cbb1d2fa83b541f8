// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use vanish_server_audit::AuditLogBuilder;

/// Caller metadata recorded alongside each audit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl RequestContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub(crate) fn apply(&self, mut builder: AuditLogBuilder) -> AuditLogBuilder {
		if let Some(ip) = &self.ip_address {
			builder = builder.ip_address(ip.as_str());
		}
		if let Some(ua) = &self.user_agent {
			builder = builder.user_agent(ua.as_str());
		}
		builder
	}
}
