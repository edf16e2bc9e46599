//! Object creation message
//!
//! Packs an [`IntegrityResult`] together with the caller's intent into the
//! payload of an object-creation transaction. Signing and broadcasting are
//! done by an external signer, which receives the JSON form.

use crate::config::{ComputeHashOptions, RedundancyType};
use crate::error::{GnfdError, Result};
use crate::hasher::HashRoot;
use crate::integrity::IntegrityResult;
use crate::MAX_TOTAL_SHARDS;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Content type used when the caller does not supply one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Bucket name length limits
pub const MIN_BUCKET_NAME_LEN: usize = 3;
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Object name length limit in bytes
pub const MAX_OBJECT_NAME_LEN: usize = 1024;

/// Account address length in bytes
const ADDRESS_LEN: usize = 20;

/// Payload of an object-creation transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObjectRequest {
    /// Target bucket
    pub bucket_name: String,
    /// Object key within the bucket
    pub object_name: String,
    /// Declared payload length in bytes
    pub payload_size: u64,
    /// Whether the object is publicly readable
    pub is_public: bool,
    /// MIME type of the payload
    pub content_type: String,
    /// Erasure-coded or replicated storage
    pub redundancy_type: RedundancyType,
    /// Data shards of the layout the checksums were computed with
    pub data_shards: u32,
    /// Parity shards of the layout the checksums were computed with
    pub parity_shards: u32,
    /// Per-shard hash roots, ordered by shard index
    pub expect_checksums: Vec<HashRoot>,
    /// Secondary storage providers (0x-prefixed hex addresses)
    #[serde(default)]
    pub secondary_sp_addresses: Vec<String>,
}

impl CreateObjectRequest {
    /// Build a request from a finished integrity hash and the options that
    /// produced it.
    ///
    /// Defaults: private, `application/octet-stream`.
    pub fn new(
        bucket_name: impl Into<String>,
        object_name: impl Into<String>,
        integrity: &IntegrityResult,
        options: &ComputeHashOptions,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            object_name: object_name.into(),
            // total_size is never negative
            payload_size: integrity.total_size.max(0) as u64,
            is_public: false,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            redundancy_type: options.redundancy_type,
            data_shards: options.redundancy.data_shards,
            parity_shards: options.redundancy.parity_shards,
            expect_checksums: integrity.hash_roots.clone(),
            secondary_sp_addresses: Vec::new(),
        }
    }

    /// Mark the object public
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Set the content type; empty falls back to the default
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        self.content_type = if content_type.is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type
        };
        self
    }

    /// Set the secondary storage providers
    pub fn with_secondary_sps(mut self, addresses: Vec<String>) -> Self {
        self.secondary_sp_addresses = addresses;
        self
    }

    /// Stateless checks run before the request is handed to the signer
    pub fn validate_basic(&self) -> Result<()> {
        verify_bucket_name(&self.bucket_name)?;
        verify_object_name(&self.object_name)?;

        if self.data_shards == 0 {
            return Err(GnfdError::InvalidChecksums(
                "layout must have at least one data shard".to_string(),
            ));
        }
        let expected = self.data_shards as usize + self.parity_shards as usize;
        if expected > MAX_TOTAL_SHARDS {
            return Err(GnfdError::InvalidChecksums(format!(
                "{}+{} layout exceeds the {} shard limit",
                self.data_shards, self.parity_shards, MAX_TOTAL_SHARDS
            )));
        }
        if self.expect_checksums.len() != expected {
            return Err(GnfdError::InvalidChecksums(format!(
                "{} checksums for a {}+{} layout, expected {}",
                self.expect_checksums.len(),
                self.data_shards,
                self.parity_shards,
                expected
            )));
        }

        for address in &self.secondary_sp_addresses {
            verify_address(address)?;
        }
        Ok(())
    }

    /// Validate and serialize for the external signer
    pub fn to_json(&self) -> Result<String> {
        self.validate_basic()?;
        Ok(serde_json::to_string(self)?)
    }
}

/// Check bucket naming rules: 3-63 chars of `a-z`, `0-9`, `-` and `.`,
/// alphanumeric at both ends, not an IPv4 address, no `..`, `.-` or `-.`.
pub fn verify_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| GnfdError::InvalidBucketName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < MIN_BUCKET_NAME_LEN || name.len() > MAX_BUCKET_NAME_LEN {
        return Err(invalid("length must be between 3 and 63"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid("only lowercase letters, digits, '-' and '.' are allowed"));
    }

    let bytes = name.as_bytes();
    let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return Err(invalid("must not contain '..', '.-' or '-.'"));
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("must not be formatted as an IP address"));
    }
    Ok(())
}

/// Check object naming rules: 1-1024 bytes, not `..`, no `../` or `//`
/// segments, no control characters.
pub fn verify_object_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| GnfdError::InvalidObjectName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() || name.len() > MAX_OBJECT_NAME_LEN {
        return Err(invalid("length must be between 1 and 1024 bytes"));
    }
    if name == ".." || name.contains("../") || name.contains("//") {
        return Err(invalid("must not contain '..' path segments or '//'"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    Ok(())
}

fn verify_address(address: &str) -> Result<()> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| GnfdError::InvalidAddress(format!("{address}: missing 0x prefix")))?;
    let bytes =
        hex::decode(hex_part).map_err(|e| GnfdError::InvalidAddress(format!("{address}: {e}")))?;
    if bytes.len() != ADDRESS_LEN {
        return Err(GnfdError::InvalidAddress(format!(
            "{address}: expected {ADDRESS_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}
