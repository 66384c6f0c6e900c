use crate::Entity;
use crate::error::{OptRepoResult, RepoResult};
use crate::field::FieldDescriptor;
use crate::filter::Predicate;
use std::sync::Arc;

/// The set of fields an update writes. Built by the service from validated names;
/// never contains the identity field.
#[derive(Debug)]
pub struct ChangedFields<E: 'static> {
    fields: Vec<&'static FieldDescriptor<E>>,
}

impl<E: 'static> ChangedFields<E> {
    pub fn new(fields: Vec<&'static FieldDescriptor<E>>) -> Self {
        Self {
            fields: fields.into_iter().filter(|f| !f.is_identity()).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static FieldDescriptor<E>> + '_ {
        self.fields.iter().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy each changed field from `from` onto `to`.
    pub fn apply(&self, from: &E, to: &mut E) {
        for field in &self.fields {
            field.copy(from, to);
        }
    }
}

/// Storage port the service layer depends on. Implementations own consistency
/// and may be called concurrently.
pub trait EntityRepository<E: Entity> {
    fn count(&self) -> impl Future<Output = RepoResult<u64>> + Send;

    fn get(&self, id: &E::Id) -> impl Future<Output = OptRepoResult<E>> + Send;

    /// Ids that don't exist are simply absent from the result.
    fn get_many(&self, ids: &[E::Id]) -> impl Future<Output = RepoResult<Vec<E>>> + Send;

    fn list(&self) -> impl Future<Output = RepoResult<Vec<E>>> + Send;

    fn list_where(
        &self,
        predicate: &Predicate<E>,
    ) -> impl Future<Output = RepoResult<Vec<E>>> + Send;

    /// Returns the stored entities, including any server-assigned fields.
    fn create(&self, entities: Vec<E>) -> impl Future<Output = RepoResult<Vec<E>>> + Send;

    /// Writes only `changed` from `entity` onto the stored entity with the same id.
    /// `None` if there is no such entity.
    fn update(
        &self,
        entity: E,
        changed: &ChangedFields<E>,
    ) -> impl Future<Output = OptRepoResult<E>> + Send;

    /// `false` if there was nothing to delete.
    fn delete(&self, id: &E::Id) -> impl Future<Output = RepoResult<bool>> + Send;
}

impl<E, T> EntityRepository<E> for Arc<T>
where
    E: Entity,
    T: EntityRepository<E> + Send + Sync,
{
    async fn count(&self) -> RepoResult<u64> {
        (**self).count().await
    }

    async fn get(&self, id: &E::Id) -> OptRepoResult<E> {
        (**self).get(id).await
    }

    async fn get_many(&self, ids: &[E::Id]) -> RepoResult<Vec<E>> {
        (**self).get_many(ids).await
    }

    async fn list(&self) -> RepoResult<Vec<E>> {
        (**self).list().await
    }

    async fn list_where(&self, predicate: &Predicate<E>) -> RepoResult<Vec<E>> {
        (**self).list_where(predicate).await
    }

    async fn create(&self, entities: Vec<E>) -> RepoResult<Vec<E>> {
        (**self).create(entities).await
    }

    async fn update(&self, entity: E, changed: &ChangedFields<E>) -> OptRepoResult<E> {
        (**self).update(entity, changed).await
    }

    async fn delete(&self, id: &E::Id) -> RepoResult<bool> {
        (**self).delete(id).await
    }
}
