use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::pipeline::TariffError;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Content-addressed PNG storage.
///
/// Every chart lives at `<dir>/<blake3 hex>.png`, so concurrent requests
/// never share an output path.
#[derive(Debug, Clone)]
pub struct ChartStore {
    dir: PathBuf,
}

pub fn chart_id(png: &[u8]) -> String {
    blake3::hash(png).to_hex().to_string()
}

fn is_valid_id(id: &str) -> bool {
    id.len() == 64 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl ChartStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.png"))
    }

    /// Store `png` and return its id. Identical charts share one file.
    pub async fn save(&self, png: &[u8]) -> Result<String, TariffError> {
        let id = chart_id(png);
        let path = self.path_for(&id);
        if tokio::fs::try_exists(&path).await? {
            return Ok(id);
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        // Write under a private name and rename into place so readers never
        // see a partial file.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".{id}.{}.{seq}.tmp", std::process::id()));
        tokio::fs::write(&tmp, png).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(chart_id = %id, path = %path.display(), "chart stored");
        Ok(id)
    }

    pub async fn load(&self, id: &str) -> Result<Vec<u8>, TariffError> {
        if !is_valid_id(id) {
            return Err(TariffError::NotFound(id.to_string()));
        }

        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TariffError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
