use anyhow::Context;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Directory holding in-flight screenshots. Every request writes its own
/// file, so concurrent clones never read each other's image.
#[derive(Clone, Debug)]
pub struct ScreenshotStore {
    dir: PathBuf,
}

/// A screenshot on disk for the lifetime of one request. Dropping it deletes
/// the file.
#[derive(Debug)]
pub struct Screenshot {
    file: NamedTempFile,
}

impl Screenshot {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl ScreenshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn persist(&self, request_id: Uuid, png: Vec<u8>) -> anyhow::Result<Screenshot> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut file = tempfile::Builder::new()
                .prefix(&format!("shot-{request_id}-"))
                .suffix(".png")
                .tempfile_in(&dir)
                .with_context(|| format!("creating screenshot in {}", dir.display()))?;
            file.write_all(&png).context("writing screenshot")?;
            file.flush().context("flushing screenshot")?;
            Ok::<_, anyhow::Error>(Screenshot { file })
        })
        .await
        .context("screenshot writer task failed")?
    }
}
