/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Ed25519 signing used by the local signing service.
//!
//! Provides functions for:
//! - Generating Ed25519 signing keypairs
//! - Computing SHA256 digests and key fingerprints
//! - Signing and verifying artifact digests
//! - The [`DetachedSignature`] document stored next to signed objects

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur during signing operations.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Invalid private key: expected 32 bytes, got {0}")]
    InvalidPrivateKeyLength(usize),

    #[error("Invalid public key: expected 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Invalid signature: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Failed to create verifying key: {0}")]
    KeyCreationFailed(String),

    #[error("Invalid signature document: {0}")]
    InvalidDocument(String),

    #[error("Artifact digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// A generated Ed25519 keypair.
pub struct GeneratedKeypair {
    /// The 32-byte private key seed
    pub private_key: Vec<u8>,
    /// The 32-byte public key
    pub public_key: Vec<u8>,
    /// SHA256 hex fingerprint of the public key
    pub fingerprint: String,
}

pub fn generate_signing_keypair() -> GeneratedKeypair {
    let mut csprng = rand::thread_rng();
    let signing_key = SigningKey::generate(&mut csprng);
    let public_key = signing_key.verifying_key().to_bytes();

    GeneratedKeypair {
        private_key: signing_key.to_bytes().to_vec(),
        public_key: public_key.to_vec(),
        fingerprint: compute_digest(&public_key),
    }
}

/// SHA256 of `data` as a 64-character hex string.
pub fn compute_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Sign `message` with a 32-byte Ed25519 private key seed.
pub fn sign_digest(message: &[u8], private_key: &[u8]) -> Result<Vec<u8>, SigningError> {
    let key_bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| SigningError::InvalidPrivateKeyLength(private_key.len()))?;

    let signing_key = SigningKey::from_bytes(&key_bytes);
    Ok(signing_key.sign(message).to_bytes().to_vec())
}

/// Verify a 64-byte Ed25519 `signature` over `message`.
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<(), SigningError> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| SigningError::InvalidPublicKeyLength(public_key.len()))?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| SigningError::InvalidSignatureLength(signature.len()))?;

    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SigningError::KeyCreationFailed(e.to_string()))?;

    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| SigningError::VerificationFailed)
}

/// Signature document written next to a signed object as `<key>.sig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSignature {
    /// Format version (currently 1)
    pub version: u32,
    /// Signature algorithm (currently "ed25519")
    pub algorithm: String,
    /// Signing profile name
    pub profile_name: String,
    /// Signing profile version
    pub profile_version: String,
    /// SHA256 hex digest of the artifact
    pub artifact_digest: String,
    /// SHA256 hex fingerprint of the signing key
    pub key_fingerprint: String,
    /// Base64-encoded 64-byte signature over the raw digest
    pub signature: String,
    /// RFC 3339 signing time
    pub signed_at: String,
}

impl DetachedSignature {
    pub const VERSION: u32 = 1;
    pub const ALGORITHM: &'static str = "ed25519";

    /// Sign `artifact` and build the document.
    pub fn create(
        artifact: &[u8],
        profile_name: &str,
        profile_version: &str,
        private_key: &[u8],
        public_key: &[u8],
    ) -> Result<Self, SigningError> {
        let artifact_digest = compute_digest(artifact);
        let digest_bytes =
            hex::decode(&artifact_digest).map_err(|e| SigningError::InvalidDocument(e.to_string()))?;
        let signature = sign_digest(&digest_bytes, private_key)?;

        Ok(Self {
            version: Self::VERSION,
            algorithm: Self::ALGORITHM.to_string(),
            profile_name: profile_name.to_string(),
            profile_version: profile_version.to_string(),
            artifact_digest,
            key_fingerprint: compute_digest(public_key),
            signature: BASE64.encode(signature),
            signed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Check that `artifact` matches the document and the signature is valid.
    pub fn verify(&self, artifact: &[u8], public_key: &[u8]) -> Result<(), SigningError> {
        let actual = compute_digest(artifact);
        if actual != self.artifact_digest {
            return Err(SigningError::DigestMismatch {
                expected: self.artifact_digest.clone(),
                actual,
            });
        }

        let digest_bytes = hex::decode(&self.artifact_digest)
            .map_err(|e| SigningError::InvalidDocument(e.to_string()))?;
        let signature = BASE64
            .decode(&self.signature)
            .map_err(|e| SigningError::InvalidDocument(e.to_string()))?;

        verify_signature(&digest_bytes, &signature, public_key)
    }

    pub fn from_json(json: &[u8]) -> Result<Self, SigningError> {
        serde_json::from_slice(json).map_err(|e| SigningError::InvalidDocument(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SigningError> {
        serde_json::to_vec_pretty(self).map_err(|e| SigningError::InvalidDocument(e.to_string()))
    }
}
