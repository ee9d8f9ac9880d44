//! Rotating key-pool vault: at-rest protection, challenge-response
//! derivation, and transcript-keyed rotation.
//!
//! A `Vault` owns `n` keys of `m` bits each. Keys live sealed (AES-256-GCM
//! under a vault-local master secret) and are decrypted transiently inside
//! the response-computation routine; raw key bytes never cross the vault's
//! API boundary.
//!
//! # Protocol Role
//!
//! A challenge is an ordered list of pool indices plus a nonce. The response
//! is `HMAC-SHA256(master_secret, key_fold XOR nonce)` where `key_fold` is
//! the bytewise XOR of the challenged keys, left to right. Proving knowledge
//! of the response proves possession of the pool without revealing it.
//!
//! After each completed session both parties rotate: every key is XORed
//! with a window of `HMAC(master_secret, transcript)`, then resealed.
//! Rotation is deterministic given identical prior state and transcript,
//! which is what keeps a device vault and its server-side mirror in sync
//! without ever moving key material.
//!
//! # Known Reduced-Entropy Case
//!
//! Challenge indices are sampled **with replacement**. Because the
//! combination step is XOR, an index repeated an even number of times
//! cancels pairwise: challenge `[2, 5, 2]` derives the same response as
//! `[5]`. This is accepted behavior, pinned by an explicit test, not
//! silently patched.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tessera_proto::SessionId;
use zeroize::Zeroizing;

use crate::{env::Environment, error::VaultError};

type HmacSha256 = Hmac<Sha256>;

/// Length of the vault master secret in bytes.
pub const MASTER_SECRET_LEN: usize = 32;

/// Length of a derived response in bytes (HMAC-SHA256 output).
pub const RESPONSE_LEN: usize = 32;

const SEAL_NONCE_LEN: usize = 12;

/// One key sealed at rest: AEAD nonce plus ciphertext (key + tag).
#[derive(Clone)]
struct SealedKey {
    nonce: [u8; SEAL_NONCE_LEN],
    ciphertext: Vec<u8>,
}

/// Rotating pool of shared secret keys with encrypted-at-rest storage.
///
/// # Invariants
///
/// - The pool always holds exactly `key_count` keys of `key_len` bytes.
/// - Every index used in a challenge must be in `[0, key_count)`.
/// - Unsealing any key must succeed; a failure means corruption or
///   tampering at rest and leaves the vault unusable
///   ([`VaultError::DecryptionFailure`] is fatal).
///
/// # Ownership
///
/// A vault belongs to exactly one party. The server side holds an
/// explicitly provisioned [`Vault::mirror`], never a shared reference;
/// the two instances stay in sync only through deterministic rotation over
/// identical transcripts.
pub struct Vault {
    key_count: usize,
    key_len: usize,
    master_secret: Zeroizing<[u8; MASTER_SECRET_LEN]>,
    cipher: Aes256Gcm,
    keys: Vec<SealedKey>,
}

impl Vault {
    /// Create a vault with `key_count` freshly generated keys of `key_bits`
    /// bits each, under a freshly generated master secret.
    ///
    /// # Panics
    ///
    /// Panics if `key_count` is zero, or `key_bits` is zero or not a
    /// multiple of 8. Pool geometry is fixed at provisioning time; a
    /// malformed geometry is a programming error, not a runtime condition.
    pub fn new<E: Environment>(env: &E, key_count: usize, key_bits: usize) -> Self {
        assert!(key_count > 0, "vault needs at least one key");
        assert!(key_bits > 0 && key_bits % 8 == 0, "key size must be a positive multiple of 8 bits");

        let mut master_secret = Zeroizing::new([0u8; MASTER_SECRET_LEN]);
        env.random_bytes(master_secret.as_mut());

        let key_len = key_bits / 8;
        let raw_keys: Vec<Zeroizing<Vec<u8>>> = (0..key_count)
            .map(|_| {
                let mut key = Zeroizing::new(vec![0u8; key_len]);
                env.random_bytes(&mut key);
                key
            })
            .collect();

        Self::seal_pool(env, master_secret, raw_keys)
    }

    /// Create a vault from externally supplied material.
    ///
    /// This is the provisioning entry point: whoever enrolls a device
    /// supplies the initial pool, builds one vault for the device and a
    /// [`mirror`](Self::mirror) for the server, and discards the raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if `keys` is empty or the first key is empty (malformed
    /// provisioning data, same policy as [`Vault::new`]).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::LengthMismatch`] if the keys are not all the
    /// same length.
    pub fn from_parts<E: Environment>(
        env: &E,
        master_secret: [u8; MASTER_SECRET_LEN],
        keys: Vec<Vec<u8>>,
    ) -> Result<Self, VaultError> {
        assert!(!keys.is_empty(), "vault needs at least one key");
        let key_len = keys[0].len();
        assert!(key_len > 0, "keys must be non-empty");

        for key in &keys {
            if key.len() != key_len {
                return Err(VaultError::LengthMismatch { expected: key_len, actual: key.len() });
            }
        }

        let raw_keys: Vec<Zeroizing<Vec<u8>>> = keys.into_iter().map(Zeroizing::new).collect();
        Ok(Self::seal_pool(env, Zeroizing::new(master_secret), raw_keys))
    }

    fn seal_pool<E: Environment>(
        env: &E,
        master_secret: Zeroizing<[u8; MASTER_SECRET_LEN]>,
        raw_keys: Vec<Zeroizing<Vec<u8>>>,
    ) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_secret.as_ref()));
        let key_count = raw_keys.len();
        let key_len = raw_keys[0].len();

        let keys = raw_keys.iter().map(|key| Self::seal_with(&cipher, env, key)).collect();
        Self { key_count, key_len, master_secret, cipher, keys }
    }

    /// Deep-copy this vault for the peer trust domain.
    ///
    /// Provisioning calls this once to hand the server an independently
    /// owned replica. From then on the two instances share no state; they
    /// stay byte-identical only because rotation is deterministic.
    #[must_use]
    pub fn mirror(&self) -> Self {
        Self {
            key_count: self.key_count,
            key_len: self.key_len,
            master_secret: self.master_secret.clone(),
            cipher: self.cipher.clone(),
            keys: self.keys.clone(),
        }
    }

    /// Number of keys in the pool (`n`).
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Length of each key in bytes (`m / 8`).
    #[must_use]
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    /// Draw a challenge: `k` indices uniform over `[0, key_count)` with
    /// replacement, plus a fresh nonce one key length long.
    ///
    /// Sampling with replacement means repeated indices are possible and,
    /// under the XOR fold, cancel pairwise (see the module docs). The
    /// entropy of a `k`-index challenge is therefore slightly below
    /// `k * log2(n)` bits.
    #[must_use]
    pub fn generate_challenge<E: Environment>(&self, env: &E, k: usize) -> (Vec<u32>, Vec<u8>) {
        let indices = (0..k).map(|_| self.uniform_index(env)).collect();
        let mut nonce = vec![0u8; self.key_len];
        env.random_bytes(&mut nonce);
        (indices, nonce)
    }

    /// Rejection-sampled uniform index, free of modulo bias.
    fn uniform_index<E: Environment>(&self, env: &E) -> u32 {
        // Pool sizes are provisioning-time constants well below u32::MAX.
        let bound = u32::try_from(self.key_count).expect("pool size fits in u32");
        let limit = u32::MAX - (u32::MAX % bound);
        loop {
            let mut buf = [0u8; 4];
            env.random_bytes(&mut buf);
            let value = u32::from_be_bytes(buf);
            if value < limit {
                return value % bound;
            }
        }
    }

    /// Derive the response for a challenge.
    ///
    /// Unseals the challenged keys, XOR-folds them left to right, mixes in
    /// the challenge nonce (also by XOR), and returns
    /// `HMAC-SHA256(master_secret, mixed)`. Plaintext key material is
    /// zeroized before returning.
    ///
    /// # Errors
    ///
    /// - [`VaultError::EmptyChallenge`] if `indices` is empty
    /// - [`VaultError::IndexOutOfRange`] if any index is >= the pool size
    /// - [`VaultError::LengthMismatch`] if the nonce length differs from
    ///   the key length
    /// - [`VaultError::DecryptionFailure`] if any key fails to unseal
    ///   (fatal: the pool is corrupt or tampered)
    pub fn compute_response(
        &self,
        indices: &[u32],
        nonce: &[u8],
    ) -> Result<[u8; RESPONSE_LEN], VaultError> {
        if indices.is_empty() {
            return Err(VaultError::EmptyChallenge);
        }
        if nonce.len() != self.key_len {
            return Err(VaultError::LengthMismatch {
                expected: self.key_len,
                actual: nonce.len(),
            });
        }

        let mut folded = self.unseal_index(indices[0])?;
        for &index in &indices[1..] {
            let key = self.unseal_index(index)?;
            if key.len() != folded.len() {
                return Err(VaultError::LengthMismatch {
                    expected: folded.len(),
                    actual: key.len(),
                });
            }
            for (acc, byte) in folded.iter_mut().zip(key.iter()) {
                *acc ^= byte;
            }
        }

        for (acc, byte) in folded.iter_mut().zip(nonce.iter()) {
            *acc ^= byte;
        }

        Ok(self.mac(&folded))
    }

    /// Rotate the entire pool using a session transcript.
    ///
    /// Each key becomes `key XOR window(HMAC(master_secret, transcript))`,
    /// where the window starts at `(i * mask_len) % mask_len` and wraps
    /// cyclically over the 32-byte mask. Keys are resealed under fresh AEAD
    /// nonces.
    ///
    /// Rotation is deterministic in the decrypted key state: two vaults
    /// with identical pools rotating over the same transcript end up with
    /// identical pools. Call this only after a session reaches a terminal
    /// state, with the transcript from [`session_transcript`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DecryptionFailure`] if any key fails to
    /// unseal; in that case the pool is left unmodified (and the vault
    /// should be considered dead regardless).
    pub fn rotate<E: Environment>(&mut self, env: &E, transcript: &[u8]) -> Result<(), VaultError> {
        let mask = self.mac(transcript);

        // Unseal everything first so a corrupt entry cannot leave the pool
        // half-rotated.
        let mut raw_keys: Vec<Zeroizing<Vec<u8>>> = Vec::with_capacity(self.key_count);
        for index in 0..self.key_count {
            raw_keys.push(self.unseal_index(index as u32)?);
        }

        for (i, key) in raw_keys.iter_mut().enumerate() {
            let start = (i * mask.len()) % mask.len();
            for (j, byte) in key.iter_mut().enumerate() {
                *byte ^= mask[(start + j) % mask.len()];
            }
        }

        self.keys = raw_keys.iter().map(|key| Self::seal_with(&self.cipher, env, key)).collect();
        tracing::debug!(keys = self.key_count, "vault rotated");
        Ok(())
    }

    /// Digest of the decrypted pool, for mirror-sync auditing.
    ///
    /// Two vaults provisioned from the same material report equal
    /// fingerprints exactly as long as they have rotated over the same
    /// transcripts in the same order. The fingerprint reveals nothing about
    /// the keys (it is a MAC under the master secret).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::DecryptionFailure`] if any key fails to
    /// unseal.
    pub fn fingerprint(&self) -> Result<[u8; RESPONSE_LEN], VaultError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.master_secret.as_ref())
            .expect("HMAC accepts keys of any length");
        for index in 0..self.key_count {
            let key = self.unseal_index(index as u32)?;
            mac.update(&key);
        }
        Ok(mac.finalize().into_bytes().into())
    }

    fn mac(&self, data: &[u8]) -> [u8; RESPONSE_LEN] {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.master_secret.as_ref())
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    fn seal_with<E: Environment>(cipher: &Aes256Gcm, env: &E, raw_key: &[u8]) -> SealedKey {
        let mut nonce = [0u8; SEAL_NONCE_LEN];
        env.random_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), raw_key)
            .expect("AES-GCM encryption is infallible for in-memory buffers");
        SealedKey { nonce, ciphertext }
    }

    fn unseal_index(&self, index: u32) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let sealed = self.keys.get(index as usize).ok_or(VaultError::IndexOutOfRange {
            index,
            pool_size: self.key_count,
        })?;
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_ref())
            .map_err(|_| VaultError::DecryptionFailure)?;
        Ok(Zeroizing::new(plaintext))
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("key_count", &self.key_count)
            .field("key_len", &self.key_len)
            .field("master_secret", &"<redacted>")
            .finish()
    }
}

/// Canonical transcript bytes for a completed session.
///
/// `session_id || challenge_nonce || response` — binds the rotation to one
/// specific session. Both trust domains must derive the transcript from the
/// same three values or their pools diverge.
#[must_use]
pub fn session_transcript(session_id: &SessionId, challenge_nonce: &[u8], response: &[u8]) -> Vec<u8> {
    let mut transcript =
        Vec::with_capacity(session_id.as_bytes().len() + challenge_nonce.len() + response.len());
    transcript.extend_from_slice(session_id.as_bytes());
    transcript.extend_from_slice(challenge_nonce);
    transcript.extend_from_slice(response);
    transcript
}

/// Constant-time response comparison.
///
/// Length mismatch returns false immediately; lengths are public (both
/// sides know the HMAC output size), only the contents are compared in
/// constant time.
#[must_use]
pub fn responses_match(expected: &[u8], received: &[u8]) -> bool {
    if expected.len() != received.len() {
        return false;
    }
    expected.ct_eq(received).into()
}
