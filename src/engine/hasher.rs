use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};

use crate::error::{Error, Result};
use crate::model::FileInfo;

use super::progress::HashProgress;

const BLOCK_SIZE: usize = 1 << 20;

/// Stream the file's content through SHA-256 and return the lowercase hex digest.
///
/// Reads fixed-size blocks, so memory use does not depend on the file size.
pub fn compute_hash(file: &FileInfo, progress: HashProgress) -> Result<String> {
    let path = file.path();
    let mut reader = File::open(path).map_err(|e| Error::io(path, e))?;
    let bar = progress.start(&file.filename(), file.size()?);

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(path, e)),
        };
        hasher.update(&buf[..n]);
        bar.inc(n as u64);
    }

    Ok(hex::encode(hasher.finalize()))
}
