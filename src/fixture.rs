//! Payload and key-pair fixtures.
//!
//! Payloads are pseudo-random so no layer can compress or dedupe them, but the
//! signer only ever sees their length as the variable under test.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use rand_chacha::rand_core::RngCore;
use sha2::{Digest, Sha256};

use crate::dataset::OutputLayout;
use crate::error::{BenchError, Result};
use crate::harness::BenchRng;
use crate::signer::KeyGenerator;

const CHUNK_BYTES: usize = 1 << 20;

#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public_key: PathBuf,
    pub secret_key: PathBuf,
}

impl KeyPair {
    pub fn fingerprint(&self) -> Result<String> {
        sha256_file(&self.public_key).map(hex32)
    }
}

fn sha256_file(path: &Path) -> Result<[u8; 32]> {
    let bytes = fs::read(path).map_err(|e| BenchError::fixture(path, e))?;
    Ok(Sha256::digest(&bytes).into())
}

fn hex32(d: [u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in d {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Returns the layout's key pair, running `keygen` only if a key file is missing.
pub fn ensure_keypair(layout: &OutputLayout, keygen: &mut dyn KeyGenerator) -> Result<KeyPair> {
    let keys = KeyPair {
        public_key: layout.public_key(),
        secret_key: layout.secret_key(),
    };

    if keys.public_key.is_file() && keys.secret_key.is_file() {
        debug!("reusing key pair in {}", layout.root().display());
        return Ok(keys);
    }

    info!("generating key pair in {}", layout.root().display());
    keygen.generate(&keys.public_key, &keys.secret_key)?;

    for path in [&keys.public_key, &keys.secret_key] {
        if !path.is_file() {
            return Err(BenchError::fixture(path, "key generator did not create the file"));
        }
    }
    Ok(keys)
}

/// Ensures `path` holds exactly `size_bytes` bytes, writing it if needed.
pub fn prepare_payload(path: &Path, size_bytes: u64, rng: &BenchRng) -> Result<()> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.is_file() && meta.len() == size_bytes {
            debug!("reusing payload {}", path.display());
            return Ok(());
        }
    }

    debug!("writing {} byte payload {}", size_bytes, path.display());
    let file = File::create(path).map_err(|e| BenchError::fixture(path, e))?;
    let mut out = BufWriter::new(file);
    let mut stream = rng.payload_stream(size_bytes);
    let mut buf = vec![0u8; CHUNK_BYTES];

    let mut remaining = size_bytes;
    while remaining > 0 {
        let n = remaining.min(CHUNK_BYTES as u64) as usize;
        stream.fill_bytes(&mut buf[..n]);
        out.write_all(&buf[..n]).map_err(|e| BenchError::fixture(path, e))?;
        remaining -= n as u64;
    }

    let file = out
        .into_inner()
        .map_err(|e| BenchError::fixture(path, e.into_error()))?;
    file.sync_all().map_err(|e| BenchError::fixture(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use tempfile::tempdir;

    struct FakeKeygen {
        calls: usize,
        write_files: bool,
    }

    impl KeyGenerator for FakeKeygen {
        fn generate(&mut self, public_key: &Path, secret_key: &Path) -> Result<(), ToolError> {
            self.calls += 1;
            if self.write_files {
                fs::write(public_key, b"public").unwrap();
                fs::write(secret_key, b"secret").unwrap();
            }
            Ok(())
        }
    }

    #[test]
    fn test_keygen_runs_once() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let mut keygen = FakeKeygen {
            calls: 0,
            write_files: true,
        };

        let keys = ensure_keypair(&layout, &mut keygen).unwrap();
        assert_eq!(keygen.calls, 1);
        let again = ensure_keypair(&layout, &mut keygen).unwrap();
        assert_eq!(keygen.calls, 1);
        assert_eq!(keys.public_key, again.public_key);
        assert_eq!(
            keys.fingerprint().unwrap(),
            hex32(Sha256::digest(b"public").into())
        );
    }

    #[test]
    fn test_keygen_reruns_when_one_key_missing() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        fs::write(layout.public_key(), b"stale").unwrap();
        let mut keygen = FakeKeygen {
            calls: 0,
            write_files: true,
        };
        ensure_keypair(&layout, &mut keygen).unwrap();
        assert_eq!(keygen.calls, 1);
    }

    #[test]
    fn test_keygen_without_output_is_fixture_error() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        let mut keygen = FakeKeygen {
            calls: 0,
            write_files: false,
        };
        let err = ensure_keypair(&layout, &mut keygen).unwrap_err();
        assert!(matches!(err, BenchError::Fixture { .. }));
    }

    #[test]
    fn test_payload_has_exact_length() {
        let dir = tempdir().unwrap();
        let rng = BenchRng::new(3);
        for size in [1u64, 4096, CHUNK_BYTES as u64 + 17] {
            let path = dir.path().join(format!("payload_{size}.bin"));
            prepare_payload(&path, size, &rng).unwrap();
            assert_eq!(fs::metadata(&path).unwrap().len(), size);
        }
    }

    #[test]
    fn test_payload_reused_or_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let rng = BenchRng::new(3);

        fs::write(&path, vec![0xAA; 64]).unwrap();
        prepare_payload(&path, 64, &rng).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0xAA; 64]);

        prepare_payload(&path, 128, &rng).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 128);
        assert_ne!(bytes, vec![0xAA; 128]);
    }

    #[test]
    fn test_payload_in_missing_dir_is_fixture_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("payload.bin");
        let err = prepare_payload(&path, 16, &BenchRng::new(0)).unwrap_err();
        assert!(matches!(err, BenchError::Fixture { .. }));
    }
}
