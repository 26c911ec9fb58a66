use crate::{
    data::collection::StudentCollection,
    error::{FeebookResult, RmpSerdeDecodeSnafu, RmpSerdeEncodeSnafu},
};
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use snafu::ResultExt;
use std::{fmt::Debug, sync::Arc};

mod directory;
mod memory;

pub use directory::DirectoryBlobStore;
pub use memory::MemoryBlobStore;

/// Somewhere to keep whole byte blobs by name.
#[async_trait]
pub trait BlobStore: Debug + Send + Sync {
    async fn get(&self, key: &str) -> FeebookResult<Option<Vec<u8>>>;
    async fn put(&self, key: &str, bytes: Vec<u8>) -> FeebookResult<()>;
}

/// A value that lives under a fixed key, encoded with MessagePack. A missing key reads back as
/// [`Default`].
pub trait StoredItem: Serialize + DeserializeOwned + Default {
    const KEY: &'static str;
}

impl StoredItem for StudentCollection {
    const KEY: &'static str = "students.bin";
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LastBackup(pub Option<Timestamp>);

impl StoredItem for LastBackup {
    const KEY: &'static str = "last_backup.bin";
}

pub const BACKUP_DIR: &str = "backups";

#[derive(Debug, Clone)]
pub struct Repository {
    store: Arc<dyn BlobStore>,
}

impl Repository {
    pub fn new(store: impl BlobStore + 'static) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    async fn get_item<T: StoredItem>(&self) -> FeebookResult<T> {
        let Some(bytes) = self.store.get(T::KEY).await? else {
            debug!(key = T::KEY, "Nothing stored yet, using default");
            return Ok(T::default());
        };
        rmp_serde::from_slice(&bytes).context(RmpSerdeDecodeSnafu)
    }

    async fn put_item<T: StoredItem>(&self, item: &T) -> FeebookResult<()> {
        let bytes = rmp_serde::to_vec_named(item).context(RmpSerdeEncodeSnafu)?;
        self.store.put(T::KEY, bytes).await
    }

    pub async fn load(&self) -> FeebookResult<StudentCollection> {
        self.get_item().await
    }

    pub async fn save(&self, collection: &StudentCollection) -> FeebookResult<()> {
        self.put_item(collection).await
    }

    pub async fn last_backup(&self) -> FeebookResult<Option<Timestamp>> {
        Ok(self.get_item::<LastBackup>().await?.0)
    }

    pub async fn record_backup(&self, at: Timestamp) -> FeebookResult<()> {
        self.put_item(&LastBackup(Some(at))).await
    }

    /// Stores a finished backup archive under [`BACKUP_DIR`], returning the key it was stored at.
    pub async fn store_backup(&self, name: &str, bytes: Vec<u8>) -> FeebookResult<String> {
        let key = format!("{BACKUP_DIR}/{name}");
        self.store.put(&key, bytes).await?;
        info!(%key, "Stored backup");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::student::test_details;

    #[tokio::test]
    async fn empty_store_loads_empty_collection() {
        let repository = Repository::new(MemoryBlobStore::default());
        assert!(repository.load().await.unwrap().is_empty());
        assert_eq!(repository.last_backup().await.unwrap(), None);
    }

    #[tokio::test]
    async fn collection_survives_a_save_and_load() {
        let repository = Repository::new(MemoryBlobStore::default());
        let mut collection = StudentCollection::default();
        let id = collection
            .add_student(
                test_details("Asha Rao", "asha@example.org"),
                Timestamp::UNIX_EPOCH,
            )
            .unwrap();
        collection
            .record_payment(id, 500.0, Timestamp::UNIX_EPOCH)
            .unwrap();

        repository.save(&collection).await.unwrap();
        assert_eq!(repository.load().await.unwrap(), collection);
    }

    #[tokio::test]
    async fn backup_timestamp_is_kept() {
        let repository = Repository::new(MemoryBlobStore::default());
        let at = Timestamp::from_second(1_700_000_000).unwrap();
        repository.record_backup(at).await.unwrap();
        assert_eq!(repository.last_backup().await.unwrap(), Some(at));
    }

    #[tokio::test]
    async fn corrupt_collection_is_an_error() {
        let store = MemoryBlobStore::default();
        store
            .put(StudentCollection::KEY, vec![0xc1, 0x00])
            .await
            .unwrap();
        let repository = Repository::new(store);
        assert!(repository.load().await.is_err());
    }
}
