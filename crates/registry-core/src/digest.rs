//! Content-addressed blob identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Error returned when a string does not parse as a [`Digest`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DigestParseError {
	#[error("digest {0:?} is missing an algorithm prefix")]
	MissingAlgorithm(String),
	#[error("digest algorithm {0:?} is not supported")]
	UnsupportedAlgorithm(String),
	#[error("digest {0:?} has an invalid hex encoding")]
	InvalidEncoding(String),
}

/// A content digest in `algorithm:hex` form, e.g. `sha256:abcd…`.
///
/// Only `sha256` is accepted; this mirrors the single algorithm the
/// importer ever computes or verifies against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
	hex: String,
}

impl Digest {
	/// Algorithm prefix used for every digest this crate produces.
	pub const ALGORITHM: &'static str = "sha256";

	/// Computes the digest of `bytes`.
	pub fn from_bytes(bytes: &[u8]) -> Self {
		let mut hasher = Sha256::new();
		hasher.update(bytes);
		Self {
			hex: hex::encode(hasher.finalize()),
		}
	}

	/// Returns the digest in `algorithm:hex` form.
	pub fn as_str(&self) -> String {
		format!("{}:{}", Self::ALGORITHM, self.hex)
	}

	/// Returns just the hex-encoded hash, without the algorithm prefix.
	pub fn hex(&self) -> &str {
		&self.hex
	}

	/// Verifies that `bytes` hash to this digest.
	pub fn verify(&self, bytes: &[u8]) -> bool {
		Self::from_bytes(bytes) == *self
	}
}

impl fmt::Display for Digest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for Digest {
	type Err = DigestParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (algorithm, hex) = s
			.split_once(':')
			.ok_or_else(|| DigestParseError::MissingAlgorithm(s.to_string()))?;
		if algorithm != Self::ALGORITHM {
			return Err(DigestParseError::UnsupportedAlgorithm(algorithm.to_string()));
		}
		if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(DigestParseError::InvalidEncoding(s.to_string()));
		}
		Ok(Self { hex: hex.to_lowercase() })
	}
}

impl TryFrom<String> for Digest {
	type Error = DigestParseError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<Digest> for String {
	fn from(value: Digest) -> Self {
		value.as_str()
	}
}
