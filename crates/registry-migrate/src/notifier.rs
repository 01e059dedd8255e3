//! Fires the terminal-transition webhook. Delivery is fire-and-forget: a
//! notification failure is logged, never surfaced to the caller, and never
//! changes the repository's persisted status.

use std::time::Duration;

use registry_core::MigrationStatus;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct NotificationPayload<'a> {
	name: &'a str,
	path: &'a str,
	status: &'static str,
	detail: &'a str,
}

/// Posts `{name, path, status, detail}` to a configured URL after every
/// terminal import transition.
pub struct ImportNotifier {
	client: reqwest::Client,
	url: Option<String>,
	timeout: Duration,
}

impl ImportNotifier {
	/// `url: None` makes every call a silent no-op, matching a deployment
	/// with notifications unconfigured.
	pub fn new(url: Option<String>, timeout: Duration) -> Self {
		Self {
			client: reqwest::Client::new(),
			url,
			timeout,
		}
	}

	pub async fn notify(&self, repo_name: &str, repo_path: &str, status: MigrationStatus, detail: &str) {
		let Some(url) = &self.url else {
			return;
		};

		let payload = NotificationPayload {
			name: repo_name,
			path: repo_path,
			status: status.as_str(),
			detail,
		};

		let result = self
			.client
			.post(url)
			.timeout(self.timeout)
			.json(&payload)
			.send()
			.await;

		if let Err(err) = result {
			tracing::error!(repo_path, status = status.as_str(), error = %err, "import notification delivery failed");
		}
	}
}
