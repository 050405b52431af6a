use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use ulid::Ulid;

/// The upload seam. The engine records the returned reference verbatim
/// and never interprets slip contents — authenticity checking is a human
/// (admin review) concern.
#[async_trait]
pub trait SlipStore: Send + Sync {
    async fn store(&self, bytes: &[u8]) -> io::Result<String>;
}

/// Slips on the local filesystem under the data directory.
pub struct FsSlipStore {
    dir: PathBuf,
}

impl FsSlipStore {
    pub fn new(dir: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl SlipStore for FsSlipStore {
    async fn store(&self, bytes: &[u8]) -> io::Result<String> {
        let name = format!("{}.bin", Ulid::new());
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        Ok(format!("slips/{name}"))
    }
}
