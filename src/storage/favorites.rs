use std::collections::BTreeSet;

use entities::preference;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set,
    TransactionTrait,
};
use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;

/// Preference key holding the favorite book ids.
pub const FAVORITES_KEY: &str = "favorites";

/// Persisted set of favorited book ids with change notification.
///
/// Toggles are serialized through a single writer and each one commits in its own
/// transaction before the new set is published to subscribers.
pub struct FavoritesStore {
    db: DatabaseConnection,
    writer: Mutex<()>,
    current: watch::Sender<BTreeSet<String>>,
}

impl FavoritesStore {
    /// Load the persisted set (empty if never written) and start publishing from it.
    pub async fn open(db: DatabaseConnection) -> Result<Self, DbErr> {
        let initial = read_favorites(&db).await?;
        tracing::debug!(count = initial.len(), "loaded favorites");
        let (current, _) = watch::channel(initial);
        Ok(FavoritesStore {
            db,
            writer: Mutex::new(()),
            current,
        })
    }

    /// Stream of favorite sets: the current one first, then one per committed toggle.
    /// Every call starts a fresh stream.
    pub fn observe(&self) -> WatchStream<BTreeSet<String>> {
        WatchStream::new(self.current.subscribe())
    }

    pub fn subscribe(&self) -> watch::Receiver<BTreeSet<String>> {
        self.current.subscribe()
    }

    /// Last published set.
    pub fn snapshot(&self) -> BTreeSet<String> {
        self.current.borrow().clone()
    }

    /// Membership as currently persisted.
    pub async fn is_favorite(&self, book_id: &str) -> Result<bool, DbErr> {
        Ok(read_favorites(&self.db).await?.contains(book_id))
    }

    /// Flip membership of `book_id`. Returns whether it is a favorite afterwards.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn toggle(&self, book_id: &str) -> Result<bool, DbErr> {
        let _guard = self.writer.lock().await;

        let txn = self.db.begin().await?;
        let existing = preference::Entity::find_by_id(FAVORITES_KEY.to_string())
            .one(&txn)
            .await?;
        let mut favorites = match &existing {
            Some(row) => decode(&row.value)?,
            None => BTreeSet::new(),
        };

        let now_favorite = if favorites.remove(book_id) {
            false
        } else {
            favorites.insert(book_id.to_string());
            true
        };

        let value = encode(&favorites)?;
        let updated_at = chrono::Utc::now().timestamp_millis();
        match existing {
            Some(row) => {
                let mut active: preference::ActiveModel = row.into();
                active.value = Set(value);
                active.updated_at = Set(updated_at);
                active.update(&txn).await?;
            }
            None => {
                preference::ActiveModel {
                    key: Set(FAVORITES_KEY.to_string()),
                    value: Set(value),
                    updated_at: Set(updated_at),
                }
                .insert(&txn)
                .await?;
            }
        }
        txn.commit().await?;

        tracing::debug!(now_favorite, count = favorites.len(), "favorites committed");
        self.current.send_replace(favorites);
        Ok(now_favorite)
    }
}

async fn read_favorites<C: ConnectionTrait>(conn: &C) -> Result<BTreeSet<String>, DbErr> {
    match preference::Entity::find_by_id(FAVORITES_KEY.to_string())
        .one(conn)
        .await?
    {
        Some(row) => decode(&row.value),
        None => Ok(BTreeSet::new()),
    }
}

fn decode(value: &str) -> Result<BTreeSet<String>, DbErr> {
    serde_json::from_str(value)
        .map_err(|e| DbErr::Custom(format!("corrupt {FAVORITES_KEY} preference: {e}")))
}

fn encode(favorites: &BTreeSet<String>) -> Result<String, DbErr> {
    serde_json::to_string(favorites)
        .map_err(|e| DbErr::Custom(format!("failed to encode {FAVORITES_KEY}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use tokio_stream::StreamExt;

    use super::*;
    use crate::storage::{open_database, test_support};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn starts_empty() {
        let (_dir, db) = test_support::temp_database().await;
        let store = FavoritesStore::open(db).await.unwrap();
        assert!(store.snapshot().is_empty());
        assert!(!store.is_favorite("B1").await.unwrap());

        let mut stream = store.observe();
        assert_eq!(stream.next().await, Some(BTreeSet::new()));
    }

    #[tokio::test]
    async fn toggle_is_its_own_inverse() {
        let (_dir, db) = test_support::temp_database().await;
        let store = FavoritesStore::open(db).await.unwrap();
        assert!(store.toggle("B2").await.unwrap());

        assert!(store.toggle("B1").await.unwrap());
        assert!(store.is_favorite("B1").await.unwrap());
        assert!(!store.toggle("B1").await.unwrap());
        assert!(!store.is_favorite("B1").await.unwrap());

        assert!(store.is_favorite("B2").await.unwrap());
        assert_eq!(store.snapshot(), set(&["B2"]));
    }

    #[tokio::test]
    async fn observers_see_committed_toggles() {
        let (_dir, db) = test_support::temp_database().await;
        let store = FavoritesStore::open(db).await.unwrap();
        let mut stream = store.observe();
        assert_eq!(stream.next().await, Some(set(&[])));

        store.toggle("B1").await.unwrap();
        assert_eq!(stream.next().await, Some(set(&["B1"])));

        // a stream opened later starts from the current value
        let mut late = store.observe();
        assert_eq!(late.next().await, Some(set(&["B1"])));
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = test_support::sqlite_url(&dir);
        {
            let store = FavoritesStore::open(open_database(&url).await.unwrap())
                .await
                .unwrap();
            store.toggle("B1").await.unwrap();
            store.toggle("B7").await.unwrap();
        }

        let store = FavoritesStore::open(open_database(&url).await.unwrap())
            .await
            .unwrap();
        assert_eq!(store.snapshot(), set(&["B1", "B7"]));
        assert!(store.is_favorite("B7").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_toggles_do_not_lose_updates() {
        let (_dir, db) = test_support::temp_database().await;
        let store = Arc::new(FavoritesStore::open(db).await.unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.toggle(&format!("B{i}")).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.snapshot().len(), 16);

        // same id, even number of toggles nets out
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.toggle("B0").await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert!(store.is_favorite("B0").await.unwrap());
        assert_eq!(store.snapshot().len(), 16);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn toggling_twice_restores_the_set(
            initial in proptest::collection::btree_set("B[0-9]{1,2}", 0..6),
            id in "B[0-9]{1,2}",
        ) {
            let (before, after, persisted) = tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(async {
                    let (_dir, db) = test_support::temp_database().await;
                    let store = FavoritesStore::open(db).await.unwrap();
                    for existing in &initial {
                        store.toggle(existing).await.unwrap();
                    }
                    let before = store.snapshot();
                    let first = store.toggle(&id).await.unwrap();
                    let second = store.toggle(&id).await.unwrap();
                    assert_ne!(first, second);
                    let after = store.snapshot();
                    let persisted = read_favorites(&store.db).await.unwrap();
                    (before, after, persisted)
                });
            prop_assert_eq!(&before, &initial);
            prop_assert_eq!(&after, &before);
            prop_assert_eq!(persisted, before);
        }
    }
}
