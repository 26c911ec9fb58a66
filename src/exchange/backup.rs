use super::ExportBundle;
use crate::{data::collection::StudentCollection, error::FeebookResult, storage::Repository};
use jiff::{SignedDuration, Timestamp, Zoned};

/// A backup is due when none has been taken yet, or the last one is at least `interval` old.
pub fn is_backup_stale(last: Option<Timestamp>, now: Timestamp, interval: SignedDuration) -> bool {
    last.is_none_or(|last| now.duration_since(last) >= interval)
}

pub fn backup_file_name(now: &Zoned) -> String {
    format!("feebook_backup_{}.zip", now.date())
}

/// Writes an export of `collection` into the repository's backup area and records when it was
/// taken. Returns the key the archive was stored under.
pub async fn create_backup(
    repository: &Repository,
    collection: &StudentCollection,
    now: &Zoned,
) -> FeebookResult<String> {
    let zip = ExportBundle::from_collection(collection, now)?.to_zip()?;
    let key = repository
        .store_backup(&backup_file_name(now), zip)
        .await?;
    repository.record_backup(now.timestamp()).await?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::student::test_details,
        error::FeebookError,
        storage::{BlobStore, MemoryBlobStore},
    };
    use jiff::{civil::date, tz::TimeZone};
    use std::sync::Arc;

    fn now() -> Zoned {
        date(2024, 6, 1)
            .at(23, 0, 0, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap()
    }

    #[test]
    fn staleness() {
        let day = SignedDuration::from_hours(24);
        let now = now().timestamp();

        assert!(is_backup_stale(None, now, day));
        assert!(is_backup_stale(
            Some(now - SignedDuration::from_hours(24)),
            now,
            day
        ));
        assert!(!is_backup_stale(
            Some(now - SignedDuration::from_hours(23)),
            now,
            day
        ));
        assert!(!is_backup_stale(Some(now), now, day));
    }

    #[tokio::test]
    async fn backup_is_stored_and_timestamped() {
        let store = Arc::new(MemoryBlobStore::default());
        let repository = Repository::from_shared(store.clone());

        let mut collection = StudentCollection::default();
        collection
            .add_student(test_details("Asha Rao", "asha@example.org"), now().timestamp())
            .unwrap();

        let key = create_backup(&repository, &collection, &now()).await.unwrap();
        assert_eq!(key, "backups/feebook_backup_2024-06-01.zip");
        assert!(store.get(&key).await.unwrap().is_some());
        assert_eq!(
            repository.last_backup().await.unwrap(),
            Some(now().timestamp())
        );
    }

    #[tokio::test]
    async fn empty_collection_is_not_backed_up() {
        let repository = Repository::new(MemoryBlobStore::default());
        assert!(matches!(
            create_backup(&repository, &StudentCollection::default(), &now()).await,
            Err(FeebookError::NothingToExport)
        ));
        assert_eq!(repository.last_backup().await.unwrap(), None);
    }
}
