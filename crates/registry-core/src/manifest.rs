//! Parsed manifest records and the manifest-graph edges between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::Digest;

/// The manifest media types the importer recognizes. Anything else fails
/// the manifest with a validation error rather than being imported blind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
	#[serde(rename = "application/vnd.docker.distribution.manifest.v2+json")]
	DockerManifestV2,
	#[serde(rename = "application/vnd.docker.distribution.manifest.list.v2+json")]
	DockerManifestList,
	#[serde(rename = "application/vnd.oci.image.manifest.v1+json")]
	OciImageManifest,
	#[serde(rename = "application/vnd.oci.image.index.v1+json")]
	OciImageIndex,
}

impl MediaType {
	/// `true` for the two fan-out types (index / manifest list) that
	/// reference other manifests rather than blobs directly.
	pub fn is_index(self) -> bool {
		matches!(self, MediaType::DockerManifestList | MediaType::OciImageIndex)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			MediaType::DockerManifestV2 => "application/vnd.docker.distribution.manifest.v2+json",
			MediaType::DockerManifestList => "application/vnd.docker.distribution.manifest.list.v2+json",
			MediaType::OciImageManifest => "application/vnd.oci.image.manifest.v1+json",
			MediaType::OciImageIndex => "application/vnd.oci.image.index.v1+json",
		}
	}
}

/// A manifest belonging to one repository, identified by its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
	pub id: Uuid,
	pub repository_id: Uuid,
	pub digest: Digest,
	pub media_type: MediaType,
	pub byte_size: u64,
	pub created_at: DateTime<Utc>,
}

impl Manifest {
	pub fn new(repository_id: Uuid, digest: Digest, media_type: MediaType, byte_size: u64) -> Self {
		Self {
			id: Uuid::new_v4(),
			repository_id,
			digest,
			media_type,
			byte_size,
			created_at: Utc::now(),
		}
	}
}

/// Which table a [`ManifestReference`]'s child digest resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
	Manifest,
	Blob,
}

/// A parent-to-child edge in the manifest graph: index → image, or
/// image → config/layer blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReference {
	pub parent_manifest_id: Uuid,
	pub child_digest: Digest,
	pub kind: ReferenceKind,
}
