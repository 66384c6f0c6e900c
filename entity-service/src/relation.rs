//! Related-entity expansion.
//!
//! A [`RelatedEntityResolver`] holds the relations declared for one entity
//! type. Resolving fetches every selected relation at once and hands the
//! collections back in declaration order, however the fetches finish.
use crate::ServiceResult;
use crate::error::{EntityServiceError, RelationFetchError};
use crate::service::EntityService;
use engine::envelope::{RelatedEntity, RelatedEntityCollection};
use engine::field::FieldDescriptor;
use engine::filter::{CompareOp, Predicate};
use engine::query::Expand;
use engine::repository::EntityRepository;
use engine::{Entity, Paging};
use error_stack::{Report, ResultExt};
use futures::future::{BoxFuture, join_all};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub type FetchResult = Result<Vec<RelatedEntity>, Report<RelationFetchError>>;

/// Looks up the entities related to an owner, given the owner's id as a string.
pub trait RelatedEntityFetcher: Send + Sync {
    fn fetch<'a>(&'a self, foreign_key: &'a str) -> BoxFuture<'a, FetchResult>;
}

/// A named relation. Failures of a non-required relation are logged and
/// leave its collection empty.
#[derive(Clone)]
pub struct Relation {
    name: String,
    required: bool,
    fetcher: Arc<dyn RelatedEntityFetcher>,
}

impl Relation {
    pub fn new(name: impl Into<String>, fetcher: impl RelatedEntityFetcher + 'static) -> Self {
        Self {
            name: name.into(),
            required: false,
            fetcher: Arc::new(fetcher),
        }
    }

    /// A failed fetch fails the whole request.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl Debug for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelatedEntityResolver {
    relations: Vec<Relation>,
}

impl RelatedEntityResolver {
    pub fn with(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// One collection per relation `expand` selects, in declaration order.
    #[instrument(skip_all, name = "resolver#resolve", fields(%entity, %entity_id))]
    pub async fn resolve(
        &self,
        entity: &str,
        entity_id: &str,
        expand: &Expand,
    ) -> ServiceResult<Vec<RelatedEntityCollection>> {
        let selected: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| expand.includes(&r.name))
            .collect();
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        let fetched = join_all(selected.iter().map(|r| r.fetcher.fetch(entity_id))).await;

        let mut collections = Vec::with_capacity(selected.len());
        for (relation, result) in selected.into_iter().zip(fetched) {
            let mut collection = RelatedEntityCollection::new(entity, entity_id, &relation.name);
            match result {
                Ok(related) => {
                    debug!(relation = %relation.name, count = related.len(), "fetched");
                    collection.extend(related);
                }
                Err(report) if relation.required => {
                    return Err(report.change_context(EntityServiceError::RelationFetch(
                        relation.name.clone(),
                    )));
                }
                Err(report) => {
                    warn!(
                        relation = %relation.name,
                        "related entities could not be fetched, returning none: {report:?}"
                    );
                }
            }
            collections.push(collection);
        }
        Ok(collections)
    }
}

/// Related entities of type `R` whose `foreign_key` field holds the owner's id,
/// optionally narrowed by an extra predicate.
pub struct ForeignKeyRelation<R: Entity, Repo> {
    service: EntityService<R, Repo>,
    foreign_key: &'static FieldDescriptor<R>,
    filter: Predicate<R>,
    uri: Option<String>,
}

impl<R, Repo> ForeignKeyRelation<R, Repo>
where
    R: Entity,
    Repo: EntityRepository<R> + Send + Sync,
{
    pub fn new(service: EntityService<R, Repo>, foreign_key: &str) -> ServiceResult<Self> {
        let foreign_key = R::fields().get(foreign_key).ok_or_else(|| {
            Report::new(EntityServiceError::invalid(format!(
                "'{foreign_key}' is not a property of {}",
                R::NAME
            )))
        })?;
        Ok(Self {
            service,
            foreign_key,
            filter: Predicate::All,
            uri: None,
        })
    }

    pub fn with_filter(mut self, filter: Predicate<R>) -> Self {
        self.filter = filter;
        self
    }

    /// Related entities get `{base}/{id}` as their uri.
    pub fn with_uri(mut self, base: impl Into<String>) -> Self {
        self.uri = Some(base.into());
        self
    }

    async fn fetch_related(&self, foreign_key: &str) -> FetchResult {
        let value = self
            .foreign_key
            .convert(foreign_key, false)
            .change_context(RelationFetchError)?;
        let predicate = Predicate::Compare {
            field: self.foreign_key,
            op: CompareOp::Eq,
            value,
        }
        .and(self.filter.clone());

        let entities = self
            .service
            .list_where(Some(predicate), Paging::ALL)
            .await
            .change_context(RelationFetchError)?;

        entities
            .iter()
            .map(|entity| -> serde_json::Result<RelatedEntity> {
                let related = RelatedEntity::from_entity(entity)?;
                Ok(match &self.uri {
                    Some(base) => {
                        let uri = format!("{base}/{}", related.id());
                        related.with_uri(uri)
                    }
                    None => related,
                })
            })
            .collect::<serde_json::Result<Vec<_>>>()
            .change_context(RelationFetchError)
    }
}

impl<R, Repo> RelatedEntityFetcher for ForeignKeyRelation<R, Repo>
where
    R: Entity,
    Repo: EntityRepository<R> + Send + Sync,
{
    fn fetch<'a>(&'a self, foreign_key: &'a str) -> BoxFuture<'a, FetchResult> {
        Box::pin(self.fetch_related(foreign_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Delayed {
        millis: u64,
        id: &'static str,
        started: Arc<AtomicUsize>,
    }

    impl RelatedEntityFetcher for Delayed {
        fn fetch<'a>(&'a self, _foreign_key: &'a str) -> BoxFuture<'a, FetchResult> {
            Box::pin(async move {
                self.started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(self.millis)).await;
                Ok(vec![RelatedEntity::new(self.id, format!(r#"{{"Id":"{}"}}"#, self.id)).unwrap()])
            })
        }
    }

    struct Failing;

    impl RelatedEntityFetcher for Failing {
        fn fetch<'a>(&'a self, _foreign_key: &'a str) -> BoxFuture<'a, FetchResult> {
            Box::pin(async { Err(Report::new(RelationFetchError)) })
        }
    }

    fn delayed(millis: u64, id: &'static str, started: &Arc<AtomicUsize>) -> Delayed {
        Delayed {
            millis,
            id,
            started: Arc::clone(started),
        }
    }

    fn names(collections: &[RelatedEntityCollection]) -> Vec<&str> {
        collections.iter().map(|c| c.related_entity()).collect()
    }

    #[tokio::test]
    async fn collections_follow_declaration_order_not_completion_order() {
        let started = Arc::new(AtomicUsize::new(0));
        let resolver = RelatedEntityResolver::default()
            .with(Relation::new("Slow", delayed(60, "s", &started)))
            .with(Relation::new("Medium", delayed(30, "m", &started)))
            .with(Relation::new("Fast", delayed(1, "f", &started)));

        let collections = resolver.resolve("User", "1", &Expand::All).await.unwrap();

        assert_eq!(vec!["Slow", "Medium", "Fast"], names(&collections));
        assert_eq!("s", collections[0].related_entities()[0].id());
        assert_eq!("f", collections[2].related_entities()[0].id());
        assert_eq!(3, started.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_run_concurrently() {
        let started = Arc::new(AtomicUsize::new(0));
        let resolver = RelatedEntityResolver::default()
            .with(Relation::new("A", delayed(100, "a", &started)))
            .with(Relation::new("B", delayed(100, "b", &started)));

        let begin = tokio::time::Instant::now();
        resolver.resolve("User", "1", &Expand::All).await.unwrap();

        assert!(begin.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn failed_optional_relation_is_empty() {
        let started = Arc::new(AtomicUsize::new(0));
        let resolver = RelatedEntityResolver::default()
            .with(Relation::new("Broken", Failing))
            .with(Relation::new("Fine", delayed(1, "x", &started)));

        let collections = resolver.resolve("User", "1", &Expand::All).await.unwrap();

        assert_eq!(vec!["Broken", "Fine"], names(&collections));
        assert!(collections[0].is_empty());
        assert_eq!(1, collections[1].count());
    }

    #[tokio::test]
    async fn failed_required_relation_fails_resolution() {
        let resolver = RelatedEntityResolver::default()
            .with(Relation::new("Broken", Failing).required());

        let err = resolver
            .resolve("User", "1", &Expand::All)
            .await
            .unwrap_err();

        assert_eq!(
            &EntityServiceError::RelationFetch("Broken".into()),
            err.current_context()
        );
    }

    #[tokio::test]
    async fn expand_selects_relations() {
        let started = Arc::new(AtomicUsize::new(0));
        let resolver = RelatedEntityResolver::default()
            .with(Relation::new("Addendum", delayed(1, "a", &started)))
            .with(Relation::new("UserGroup", delayed(1, "g", &started)));

        let none = resolver.resolve("User", "1", &Expand::None).await.unwrap();
        assert!(none.is_empty());

        let only = resolver
            .resolve("User", "1", &Expand::Only(vec!["usergroup".into()]))
            .await
            .unwrap();
        assert_eq!(vec!["UserGroup"], names(&only));
        assert_eq!("User", only[0].entity());
        assert_eq!("1", only[0].entity_id());
        assert_eq!(1, started.load(Ordering::SeqCst));
    }
}
