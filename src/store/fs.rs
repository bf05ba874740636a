use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{RecordStore, SessionRecord};

/// Record store backed by a local directory
///
/// Layout:
/// - `<root>/records/<conversation>.json`: one session record per conversation
/// - `<root>/audio/<user>/<session>.<ext>`: archived recordings
pub struct FsRecordStore {
    root: PathBuf,
    /// Serializes record writes so concurrent inserts resolve to one record
    write_lock: Mutex<()>,
}

impl FsRecordStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("records"))
            .await
            .context("Failed to create records directory")?;
        fs::create_dir_all(root.join("audio"))
            .await
            .context("Failed to create audio directory")?;

        info!("Record store opened at {}", root.display());

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, conversation_id: &str) -> PathBuf {
        self.root
            .join("records")
            .join(format!("{}.json", file_stem(conversation_id)))
    }

    async fn read_record(path: &Path) -> Result<SessionRecord> {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read record {:?}", path))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Corrupt record {:?}", path))
    }

    /// Write via a temp file and rename so readers never see a partial record
    async fn write_record(path: &Path, record: &SessionRecord) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_vec_pretty(record)?;

        fs::write(&tmp, payload)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move record into place at {:?}", path))?;

        Ok(())
    }

    /// Attach the audio URI to the record owning `session_id`
    async fn link_audio(&self, session_id: Uuid, uri: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = fs::read_dir(self.root.join("records")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let mut record = match Self::read_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable record: {:#}", e);
                    continue;
                }
            };

            if record.id == session_id {
                record.audio_uri = Some(uri.to_string());
                return Self::write_record(&path, &record).await;
            }
        }

        warn!("No record found for session {}, audio left unlinked", session_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for FsRecordStore {
    async fn find_record(&self, conversation_id: &str) -> Result<Option<SessionRecord>> {
        let path = self.record_path(conversation_id);

        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        Ok(Some(Self::read_record(&path).await?))
    }

    async fn insert_record(
        &self,
        session_id: Uuid,
        user_id: &str,
        conversation_id: &str,
        agent_id: Option<&str>,
    ) -> Result<SessionRecord> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(conversation_id);

        if fs::try_exists(&path).await? {
            warn!(
                "Record for conversation {} already exists, keeping it",
                conversation_id
            );
            return Self::read_record(&path).await;
        }

        let record = SessionRecord {
            id: session_id,
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
            agent_id: agent_id.map(str::to_string),
            audio_uri: None,
        };

        Self::write_record(&path, &record).await?;
        info!(
            "Created session record {} for conversation {}",
            session_id, conversation_id
        );

        Ok(record)
    }

    async fn upload_audio(
        &self,
        data: &[u8],
        user_id: &str,
        session_id: Uuid,
        extension: &str,
        mime_type: &str,
    ) -> Result<String> {
        let dir = self.root.join("audio").join(file_stem(user_id));
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create audio directory")?;

        let path = dir.join(format!("{}.{}", session_id, extension));
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write audio {:?}", path))?;

        let path = fs::canonicalize(&path).await.unwrap_or(path);
        let uri = format!("file://{}", path.display());

        info!(
            "Stored {} bytes of {} audio at {}",
            data.len(),
            mime_type,
            uri
        );

        self.link_audio(session_id, &uri).await?;

        Ok(uri)
    }
}

/// Make an external id safe to use as a file name
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
