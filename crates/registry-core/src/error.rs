//! The error taxonomy shared by every component.
//!
//! Components return [`Error`]; transport layers (HTTP handlers, the CLI)
//! map it to a status code and a machine-readable [`ErrorCode`] via
//! [`Error::code`] / [`Error::http_status`].

use thiserror::Error;

/// Machine-readable error codes, stable across releases.
///
/// These are the literal codes the importer/state-machine/rename subsystem
/// are required to surface; see `SPEC_FULL.md` §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
	InvalidQueryParamValue,
	InvalidQueryParamType,
	InvalidBodyParamType,
	NameUnknown,
	ImportStatusUnknown,
	PreImportRequired,
	PreImportInProgress,
	PreImportFailed,
	ImportInProgress,
	RenameConflict,
	ImportRateLimited,
	ExceedsLimit,
	NotImplemented,
	DeadlineExceeded,
	Unknown,
}

impl ErrorCode {
	/// The HTTP status this code is rendered as.
	pub fn http_status(self) -> u16 {
		match self {
			ErrorCode::InvalidQueryParamValue
			| ErrorCode::InvalidQueryParamType
			| ErrorCode::InvalidBodyParamType
			| ErrorCode::ExceedsLimit => 400,
			ErrorCode::NameUnknown | ErrorCode::ImportStatusUnknown => 404,
			ErrorCode::ImportInProgress | ErrorCode::RenameConflict => 409,
			ErrorCode::PreImportRequired | ErrorCode::PreImportFailed => 424,
			ErrorCode::PreImportInProgress => 425,
			ErrorCode::ImportRateLimited => 429,
			ErrorCode::NotImplemented => 501,
			ErrorCode::DeadlineExceeded => 500,
			ErrorCode::Unknown => 500,
		}
	}

	/// The wire string GitLab-style error bodies use for this code.
	pub fn as_str(self) -> &'static str {
		match self {
			ErrorCode::InvalidQueryParamValue => "INVALID_QUERY_PARAM_VALUE",
			ErrorCode::InvalidQueryParamType => "INVALID_QUERY_PARAM_TYPE",
			ErrorCode::InvalidBodyParamType => "INVALID_BODY_PARAM_TYPE",
			ErrorCode::NameUnknown => "NAME_UNKNOWN",
			ErrorCode::ImportStatusUnknown => "IMPORT_STATUS_UNKNOWN",
			ErrorCode::PreImportRequired => "PRE_IMPORT_REQUIRED",
			ErrorCode::PreImportInProgress => "PRE_IMPORT_IN_PROGRESS",
			ErrorCode::PreImportFailed => "PRE_IMPORT_FAILED",
			ErrorCode::ImportInProgress => "IMPORT_IN_PROGRESS",
			ErrorCode::RenameConflict => "RENAME_CONFLICT",
			ErrorCode::ImportRateLimited => "IMPORT_RATE_LIMITED",
			ErrorCode::ExceedsLimit => "EXCEEDS_LIMIT",
			ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
			ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
			ErrorCode::Unknown => "UNKNOWN",
		}
	}
}

/// The error type returned by every fallible operation in the control plane.
#[derive(Debug, Error)]
pub enum Error {
	#[error("{code:?}: {detail}")]
	Validation { code: ErrorCode, detail: String },

	#[error("not found: {detail}")]
	NotFound { code: ErrorCode, detail: String },

	#[error("precondition failed: {detail}")]
	Precondition { code: ErrorCode, detail: String },

	#[error("conflict: {detail}")]
	Conflict { detail: String },

	#[error("resource exhausted: {code:?}: {detail}")]
	ResourceExhausted { code: ErrorCode, detail: String },

	#[error("unavailable: {detail}")]
	Unavailable { detail: String },

	/// Recorded verbatim as `context deadline exceeded` per the spec's
	/// observable contract; never reword this variant's message.
	#[error("context deadline exceeded")]
	DeadlineExceeded,

	#[error(transparent)]
	Storage(#[from] crate::storage::StorageError),

	#[error("{0}")]
	Internal(String),
}

impl Error {
	pub fn code(&self) -> ErrorCode {
		match self {
			Error::Validation { code, .. } => *code,
			Error::NotFound { code, .. } => *code,
			Error::Precondition { code, .. } => *code,
			Error::Conflict { .. } => ErrorCode::RenameConflict,
			Error::ResourceExhausted { code, .. } => *code,
			Error::Unavailable { .. } => ErrorCode::NotImplemented,
			Error::DeadlineExceeded => ErrorCode::DeadlineExceeded,
			Error::Storage(_) => ErrorCode::Unknown,
			Error::Internal(_) => ErrorCode::Unknown,
		}
	}

	pub fn http_status(&self) -> u16 {
		self.code().http_status()
	}

	/// The string persisted into `migration_error` / delivered to the
	/// notifier. Context prefixes added by callers via [`Error::context`]
	/// are part of the observable contract — don't strip them here.
	pub fn detail(&self) -> String {
		self.to_string()
	}

	pub fn invalid_query_param(param: &str, value: &str) -> Self {
		Error::Validation {
			code: ErrorCode::InvalidQueryParamValue,
			detail: format!("invalid value {value:?} for query parameter {param:?}"),
		}
	}

	pub fn invalid_query_param_type(param: &str) -> Self {
		Error::Validation {
			code: ErrorCode::InvalidQueryParamType,
			detail: format!("query parameter {param:?} has the wrong type"),
		}
	}

	pub fn invalid_body_param(param: &str, detail: impl Into<String>) -> Self {
		Error::Validation {
			code: ErrorCode::InvalidBodyParamType,
			detail: format!("body parameter {param:?}: {}", detail.into()),
		}
	}

	/// Matches the literal text `unknown repository name=<path>` tests assert on.
	pub fn name_unknown(path: &str) -> Self {
		Error::NotFound {
			code: ErrorCode::NameUnknown,
			detail: format!("unknown repository name={path}"),
		}
	}

	pub fn import_status_unknown(path: &str) -> Self {
		Error::NotFound {
			code: ErrorCode::ImportStatusUnknown,
			detail: format!("import status unknown for repository: name={path}"),
		}
	}

	pub fn pre_import_required() -> Self {
		Error::Precondition {
			code: ErrorCode::PreImportRequired,
			detail: "a pre import is required before a final import".to_string(),
		}
	}

	pub fn pre_import_in_progress() -> Self {
		Error::Precondition {
			code: ErrorCode::PreImportInProgress,
			detail: "a pre import is already in progress".to_string(),
		}
	}

	pub fn pre_import_failed() -> Self {
		Error::Precondition {
			code: ErrorCode::PreImportFailed,
			detail: "the previous pre import failed, re-run pre import first".to_string(),
		}
	}

	pub fn import_in_progress() -> Self {
		Error::Precondition {
			code: ErrorCode::ImportInProgress,
			detail: "an import is already in progress".to_string(),
		}
	}

	pub fn rename_conflict(detail: impl Into<String>) -> Self {
		Error::Conflict { detail: detail.into() }
	}

	pub fn import_rate_limited() -> Self {
		Error::ResourceExhausted {
			code: ErrorCode::ImportRateLimited,
			detail: "the registry has reached its concurrent import limit".to_string(),
		}
	}

	pub fn exceeds_limit(detail: impl Into<String>) -> Self {
		Error::ResourceExhausted {
			code: ErrorCode::ExceedsLimit,
			detail: detail.into(),
		}
	}

	pub fn not_implemented(missing_dependency: &str) -> Self {
		Error::Unavailable {
			detail: format!("{missing_dependency} is not configured"),
		}
	}

	/// Wraps this error with a short context prefix, in the style of
	/// `anyhow::Context` but preserving the original's [`ErrorCode`].
	pub fn context(self, prefix: impl Into<String>) -> Self {
		let prefix = prefix.into();
		match self {
			Error::Validation { code, detail } => Error::Validation {
				code,
				detail: format!("{prefix}: {detail}"),
			},
			Error::NotFound { code, detail } => Error::NotFound {
				code,
				detail: format!("{prefix}: {detail}"),
			},
			Error::Precondition { code, detail } => Error::Precondition {
				code,
				detail: format!("{prefix}: {detail}"),
			},
			Error::Conflict { detail } => Error::Conflict {
				detail: format!("{prefix}: {detail}"),
			},
			Error::ResourceExhausted { code, detail } => Error::ResourceExhausted {
				code,
				detail: format!("{prefix}: {detail}"),
			},
			Error::Unavailable { detail } => Error::Unavailable {
				detail: format!("{prefix}: {detail}"),
			},
			Error::DeadlineExceeded => Error::DeadlineExceeded,
			Error::Storage(e) => Error::Internal(format!("{prefix}: {e}")),
			Error::Internal(detail) => Error::Internal(format!("{prefix}: {detail}")),
		}
	}
}

/// Extension trait mirroring [`Error::context`] for `Result`.
pub trait ResultExt<T> {
	fn context(self, prefix: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
	fn context(self, prefix: impl Into<String>) -> Result<T> {
		self.map_err(|e| e.context(prefix))
	}
}

pub type Result<T> = std::result::Result<T, Error>;
