//! Typed entity repositories.
//!
//! An [`Entity`] knows its name and storage key; a [`Repository`] binds an
//! entity type to one [`EntityStore`] and does the JSON encoding.

use crate::{EntityStore, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A value that can be archived through a [`Repository`].
pub trait Entity: Serialize + DeserializeOwned {
    /// Entity name, used in logs and error messages.
    const NAME: &'static str;

    /// Storage key of this entity.
    fn key(&self) -> String;
}

/// Persistence for one entity type over an injected store.
pub struct Repository<E> {
    store: Arc<dyn EntityStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    /// Creates a repository over the given store.
    ///
    /// Each entity type should get its own store so keys never collide.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Returns the entity name.
    pub fn name(&self) -> &'static str {
        E::NAME
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Reads the entity stored under `key`.
    pub fn read(&self, key: &str) -> Result<E> {
        let data = self.store.read(key)?;
        let entity = serde_json::from_slice(&data)?;
        tracing::trace!(entity = E::NAME, key, "read entity");
        Ok(entity)
    }

    /// Writes an entity under its own key.
    pub fn write(&self, entity: &E) -> Result<()> {
        let key = entity.key();
        let data = serde_json::to_vec(entity)?;
        self.store.write(&key, Bytes::from(data))?;
        tracing::trace!(entity = E::NAME, key = %key, "wrote entity");
        Ok(())
    }

    /// Deletes an entity by its own key.
    pub fn delete(&self, entity: &E) -> Result<()> {
        self.store.delete(&entity.key())
    }

    /// Checks if an entity is stored under `key`.
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.store.contains(key)
    }
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &E::NAME)
            .field("stats", &self.store.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, StorageError};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Checkpoint {
        round: i64,
        label: String,
    }

    impl Entity for Checkpoint {
        const NAME: &'static str = "checkpoint";

        fn key(&self) -> String {
            self.round.to_string()
        }
    }

    fn repo() -> Repository<Checkpoint> {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_write_read_delete() {
        let repo = repo();
        let cp = Checkpoint {
            round: 12,
            label: "a".into(),
        };

        repo.write(&cp).unwrap();
        assert!(repo.contains("12").unwrap());
        assert_eq!(repo.read("12").unwrap(), cp);

        repo.delete(&cp).unwrap();
        assert!(matches!(repo.read("12"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_same_key_overwrites() {
        let repo = repo();
        repo.write(&Checkpoint {
            round: 3,
            label: "first".into(),
        })
        .unwrap();
        repo.write(&Checkpoint {
            round: 3,
            label: "second".into(),
        })
        .unwrap();

        assert_eq!(repo.read("3").unwrap().label, "second");
    }

    #[test]
    fn test_corrupt_entry() {
        let store = Arc::new(MemoryStore::new());
        store.write("5", Bytes::from_static(b"not json")).unwrap();
        let repo: Repository<Checkpoint> = Repository::new(store);

        assert!(matches!(
            repo.read("5"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_name() {
        assert_eq!(repo().name(), "checkpoint");
    }
}
