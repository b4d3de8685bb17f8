//! Filesystem storage for uploaded payment evidence.
//!
//! Proof persistence is best-effort: a failed write is logged at the call site and the payment flow continues. The
//! returned locator is the public path a reverse proxy serves the upload directory under.
use std::path::PathBuf;

use log::*;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct FsProofStore {
    dir: PathBuf,
}

impl FsProofStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the evidence bytes for the order and returns the public `/uploads/...` locator.
    pub async fn store(&self, order_id: i64, data: &[u8]) -> Result<String, std::io::Error> {
        fs::create_dir_all(&self.dir).await?;
        let file_name = format!("proof-{order_id}-{:08x}.bin", rand::random::<u32>());
        let path = self.dir.join(&file_name);
        fs::write(&path, data).await?;
        debug!("📝️ Stored {} byte(s) of payment evidence at {}", data.len(), path.display());
        Ok(format!("/uploads/{file_name}"))
    }
}

#[cfg(test)]
mod test {
    use super::FsProofStore;

    #[tokio::test]
    async fn stores_bytes_and_returns_a_public_locator() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsProofStore::new(dir.path());
        let url = store.store(42, b"fake image bytes").await.unwrap();
        assert!(url.starts_with("/uploads/proof-42-"));

        let file_name = url.strip_prefix("/uploads/").unwrap();
        let stored = std::fs::read(dir.path().join(file_name)).unwrap();
        assert_eq!(stored, b"fake image bytes");
    }
}
