//! Conversation store backends

use super::conversation::{Conversation, is_valid_conversation_id};
use crate::error::{SmileError, SmileResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const RESOURCE: &str = "conversation";

fn not_found(id: &str) -> SmileError {
    SmileError::not_found_resource(format!("Conversation {} does not exist", id), RESOURCE)
}

/// Persistence boundary for conversations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a new record; an existing id is an error
    async fn store(&self, conversation: &Conversation) -> SmileResult<()>;

    /// Replace an existing record
    async fn update(&self, conversation: &Conversation) -> SmileResult<()>;

    async fn delete(&self, id: &str) -> SmileResult<()>;

    /// All records, most recent activity first
    async fn get(&self) -> SmileResult<Vec<Conversation>>;

    async fn get_by_id(&self, id: &str) -> SmileResult<Option<Conversation>>;
}

/// One JSON file per conversation
#[derive(Debug, Clone)]
pub struct FileConversationStore {
    base_path: PathBuf,
}

impl FileConversationStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, id: &str) -> SmileResult<PathBuf> {
        if !is_valid_conversation_id(id) {
            return Err(SmileError::invalid_input_field(
                format!("'{}' is not a valid conversation id", id),
                "id",
            ));
        }
        Ok(self.base_path.join(format!("{}.json", id)))
    }

    async fn ensure_dir(&self) -> SmileResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            SmileError::storage(format!(
                "Failed to create conversation directory {}: {}",
                self.base_path.display(),
                e
            ))
        })
    }

    /// Write through a temporary file so readers never see a torn record
    async fn write(&self, path: &Path, conversation: &Conversation) -> SmileResult<()> {
        self.ensure_dir().await?;
        let json = serde_json::to_string_pretty(conversation)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(|e| {
            SmileError::storage(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        if let Err(e) = fs::rename(&tmp, path).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                warn!(path = %tmp.display(), error = %cleanup, "failed to remove temporary file");
            }
            return Err(SmileError::storage(format!(
                "Failed to replace {}: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }

    async fn exists(&self, path: &Path) -> SmileResult<bool> {
        fs::try_exists(path).await.map_err(|e| {
            SmileError::storage(format!("Failed to check {}: {}", path.display(), e))
        })
    }

    async fn read(&self, path: &Path) -> SmileResult<Conversation> {
        let json = fs::read_to_string(path).await.map_err(|e| {
            SmileError::storage(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            SmileError::storage(format!("Corrupt conversation file {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn store(&self, conversation: &Conversation) -> SmileResult<()> {
        let path = self.path_for(&conversation.id)?;
        if self.exists(&path).await? {
            return Err(SmileError::storage(format!(
                "Conversation {} already exists",
                conversation.id
            )));
        }
        self.write(&path, conversation).await?;
        debug!(id = %conversation.id, "stored conversation");
        Ok(())
    }

    async fn update(&self, conversation: &Conversation) -> SmileResult<()> {
        let path = self.path_for(&conversation.id)?;
        if !self.exists(&path).await? {
            return Err(not_found(&conversation.id));
        }
        self.write(&path, conversation).await?;
        debug!(id = %conversation.id, messages = conversation.messages.len(), "updated conversation");
        Ok(())
    }

    async fn delete(&self, id: &str) -> SmileResult<()> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(id, "deleted conversation");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(SmileError::storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn get(&self) -> SmileResult<Vec<Conversation>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SmileError::storage(format!(
                    "Failed to read {}: {}",
                    self.base_path.display(),
                    e
                )));
            }
        };

        let mut conversations = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SmileError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read(&path).await {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable conversation"),
            }
        }

        conversations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn get_by_id(&self, id: &str) -> SmileResult<Option<Conversation>> {
        let path = self.path_for(id)?;
        if !self.exists(&path).await? {
            return Ok(None);
        }
        self.read(&path).await.map(Some)
    }
}

/// In-memory store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn store(&self, conversation: &Conversation) -> SmileResult<()> {
        let mut conversations = self.conversations.write();
        if conversations.contains_key(&conversation.id) {
            return Err(SmileError::storage(format!(
                "Conversation {} already exists",
                conversation.id
            )));
        }
        conversations.insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn update(&self, conversation: &Conversation) -> SmileResult<()> {
        let mut conversations = self.conversations.write();
        match conversations.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
                Ok(())
            }
            None => Err(not_found(&conversation.id)),
        }
    }

    async fn delete(&self, id: &str) -> SmileResult<()> {
        self.conversations
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn get(&self) -> SmileResult<Vec<Conversation>> {
        let mut conversations: Vec<_> = self.conversations.read().values().cloned().collect();
        conversations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn get_by_id(&self, id: &str) -> SmileResult<Option<Conversation>> {
        Ok(self.conversations.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::conversation::StoredMessage;
    use tempfile::TempDir;

    fn conversation_at(timestamp: i64) -> Conversation {
        let mut conversation = Conversation::new();
        conversation.timestamp = timestamp;
        conversation
    }

    async fn exercise(store: &dyn ConversationStore) {
        let older = conversation_at(1_000);
        let mut newer = conversation_at(2_000);

        store.store(&older).await.unwrap();
        store.store(&newer).await.unwrap();
        assert!(store.store(&older).await.is_err());

        let listed = store.get().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);

        newer.messages.push(StoredMessage::user("hello"));
        store.update(&newer).await.unwrap();
        let loaded = store.get_by_id(&newer.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);

        store.delete(&older.id).await.unwrap();
        assert!(store.get_by_id(&older.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(&older.id).await,
            Err(SmileError::NotFound { .. })
        ));
        assert!(matches!(
            store.update(&older).await,
            Err(SmileError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn memory_store_contract() {
        exercise(&MemoryConversationStore::new()).await;
    }

    #[tokio::test]
    async fn file_store_contract() {
        let dir = TempDir::new().unwrap();
        exercise(&FileConversationStore::new(dir.path().join("conversations"))).await;
    }

    #[tokio::test]
    async fn file_store_lists_nothing_before_first_write() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path().join("missing"));
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        let err = store.get_by_id("../secrets").await.unwrap_err();
        assert!(matches!(err, SmileError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn file_store_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        store.store(&Conversation::new()).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.get().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_store_surfaces_io_errors_instead_of_not_found() {
        let dir = TempDir::new().unwrap();
        // A regular file where the directory should be makes every lookup fail
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let store = FileConversationStore::new(&blocker);
        let conversation = Conversation::new();

        let err = store.update(&conversation).await.unwrap_err();
        assert!(matches!(err, SmileError::Storage { .. }), "{:?}", err);
        let err = store.get_by_id(&conversation.id).await.unwrap_err();
        assert!(matches!(err, SmileError::Storage { .. }), "{:?}", err);
        let err = store.store(&conversation).await.unwrap_err();
        assert!(matches!(err, SmileError::Storage { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn failed_replace_removes_the_temporary_file() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(dir.path());
        let conversation = Conversation::new();
        // A non-empty directory at the record path makes the rename fail
        let record = dir.path().join(format!("{}.json", conversation.id));
        std::fs::create_dir(&record).unwrap();
        std::fs::write(record.join("keep"), "").unwrap();

        let err = store.update(&conversation).await.unwrap_err();
        assert!(matches!(err, SmileError::Storage { .. }), "{:?}", err);
        assert!(!dir.path().join(format!("{}.json.tmp", conversation.id)).exists());
    }
}
