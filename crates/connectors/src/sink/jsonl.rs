use crate::error::SinkError;
use chrono::Utc;
use model::records::entity::RoamingStatusEntity;
use std::path::{Path, PathBuf};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::{debug, info};

struct JsonLinesState {
    file: Option<File>,
    next_id: u64,
}

/// Appends committed entities to a file, one JSON object per line.
///
/// A chunk is fully serialized before anything touches the file, so a
/// serialization failure leaves the file as it was.
pub struct JsonLinesSink {
    path: PathBuf,
    state: Mutex<JsonLinesState>,
}

impl JsonLinesSink {
    /// Creates (or truncates) the output file.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        info!(path = %path.display(), "Opened JSON lines sink");
        Ok(Self {
            path,
            state: Mutex::new(JsonLinesState {
                file: Some(file),
                next_id: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write_chunk(
        &self,
        chunk: Vec<RoamingStatusEntity>,
    ) -> Result<usize, SinkError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let mut buf = Vec::new();
        let mut id = state.next_id;
        for entity in chunk.iter() {
            id += 1;
            let persisted = entity.clone().persisted(id, now);
            serde_json::to_writer(&mut buf, &persisted)?;
            buf.push(b'\n');
        }

        let file = state.file.as_mut().ok_or(SinkError::Closed)?;
        file.write_all(&buf).await?;
        file.flush().await?;
        state.next_id = id;

        debug!(written = chunk.len(), bytes = buf.len(), "Chunk appended");
        Ok(chunk.len())
    }

    /// Flushes and releases the file. Later writes fail with `Closed`.
    pub async fn close(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock().await;
        if let Some(mut file) = state.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}
