//! Scratch directories for tests which need a real filesystem.

use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::env::temp_dir;
use std::fmt::Write;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// A directory under the system temporary directory, named
/// `epkit-<base>-<hex>`, which is removed with its contents when dropped.
pub(crate) struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub(crate) fn new(base: &str) -> io::Result<TempDir> {
        const RETRIES: usize = 16;

        let mut rng = StdRng::from_entropy();

        for _ in 0..RETRIES {
            let mut suffix = [0u8; 8];

            rng.fill_bytes(&mut suffix);

            let mut name = format!("epkit-{}-", base);

            for b in suffix {
                let _ = write!(name, "{:02x}", b);
            }

            let path = temp_dir().join(name);

            match std::fs::create_dir(&path) {
                Ok(()) => return Ok(TempDir { path }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            }
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("failed to create a temporary directory after {} retries", RETRIES),
        ))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
