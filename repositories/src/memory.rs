use crate::GeneratedId;
use engine::error::{OptRepoResult, RepoError, RepoResult};
use engine::filter::Predicate;
use engine::repository::{ChangedFields, EntityRepository};
use engine::{Entity, Timestamp};
use error_stack::Report;
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// A repository that keeps every entity in process memory, ordered by id.
///
/// Reads share the lock; each write holds it for the whole batch, so a failed
/// `create` leaves nothing behind.
#[derive(Debug)]
pub struct InMemoryRepo<E: Entity> {
    entities: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> Default for InMemoryRepo<E> {
    fn default() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E: Entity> InMemoryRepo<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with entities exactly as given, ids included.
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        Self {
            entities: RwLock::new(
                entities
                    .into_iter()
                    .map(|e| (e.id().clone(), e))
                    .collect(),
            ),
        }
    }
}

impl<E> EntityRepository<E> for InMemoryRepo<E>
where
    E: Entity,
    E::Id: GeneratedId,
{
    async fn count(&self) -> RepoResult<u64> {
        Ok(self.entities.read().await.len() as u64)
    }

    async fn get(&self, id: &E::Id) -> OptRepoResult<E> {
        Ok(self.entities.read().await.get(id).cloned())
    }

    async fn get_many(&self, ids: &[E::Id]) -> RepoResult<Vec<E>> {
        let entities = self.entities.read().await;
        Ok(ids
            .iter()
            .unique()
            .filter_map(|id| entities.get(id).cloned())
            .collect())
    }

    async fn list(&self) -> RepoResult<Vec<E>> {
        Ok(self.entities.read().await.values().cloned().collect())
    }

    async fn list_where(&self, predicate: &Predicate<E>) -> RepoResult<Vec<E>> {
        debug!(entity = E::NAME, %predicate, "listing");
        Ok(self
            .entities
            .read()
            .await
            .values()
            .filter(|e| predicate.matches(e))
            .cloned()
            .collect())
    }

    async fn create(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        let mut store = self.entities.write().await;
        let now = Timestamp::now();

        let mut last = store.last_key_value().map(|(id, _)| id.clone());
        let mut staged_ids = HashSet::with_capacity(entities.len());
        let mut staged = Vec::with_capacity(entities.len());

        for mut entity in entities {
            if entity.id().is_unassigned() {
                let id = <E::Id as GeneratedId>::next_after(last.as_ref()).ok_or_else(|| {
                    Report::new(RepoError::Create).attach(format!("no ids left for {}", E::NAME))
                })?;
                entity.set_id(id);
            }

            let id = entity.id().clone();
            if store.contains_key(&id) || !staged_ids.insert(id.clone()) {
                return Err(Report::new(RepoError::Create)
                    .attach(format!("{} with id '{id}' already exists", E::NAME)));
            }

            if last.as_ref().is_none_or(|l| &id > l) {
                last = Some(id);
            }

            entity.stamp_created(now);
            staged.push(entity);
        }

        for entity in &staged {
            store.insert(entity.id().clone(), entity.clone());
        }

        debug!(entity = E::NAME, count = staged.len(), "created");
        Ok(staged)
    }

    async fn update(&self, entity: E, changed: &ChangedFields<E>) -> OptRepoResult<E> {
        let mut store = self.entities.write().await;
        let Some(stored) = store.get_mut(entity.id()) else {
            debug!(entity = E::NAME, id = %entity.id(), "nothing to update");
            return Ok(None);
        };

        changed.apply(&entity, stored);
        debug!(
            entity = E::NAME,
            id = %entity.id(),
            fields = %changed.names().join(","),
            "updated"
        );
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: &E::Id) -> RepoResult<bool> {
        let removed = self.entities.write().await.remove(id).is_some();
        debug!(entity = E::NAME, %id, removed, "delete");
        Ok(removed)
    }
}
