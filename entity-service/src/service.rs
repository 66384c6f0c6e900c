use crate::error::{EntityServiceError, from_filter, from_query};
use crate::relation::RelatedEntityResolver;
use crate::{OptServiceResult, ServiceResult};
use engine::envelope::Envelope;
use engine::error::ConversionError;
use engine::field::{FieldDescriptor, FieldType, FieldValue};
use engine::filter::{CompareOp, Predicate};
use engine::query::{Expand, QueryParams};
use engine::repository::{ChangedFields, EntityRepository};
use engine::{Entity, Paging};
use error_stack::{Report, ResultExt};
use itertools::Itertools;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Generic CRUD and query operations over one entity type, backed by a repository.
///
/// Argument validation happens before the repository is called. Repository
/// failures surface as [`EntityServiceError::Storage`] and are never retried.
pub struct EntityService<E, R> {
    repo: R,
    resolver: Arc<RelatedEntityResolver>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, R: Clone> Clone for EntityService<E, R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            resolver: Arc::clone(&self.resolver),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, R: Debug> Debug for EntityService<E, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("entity", &E::NAME)
            .field("repo", &self.repo)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl<E, R> EntityService<E, R>
where
    E: Entity,
    R: EntityRepository<E> + Send + Sync,
{
    /// A service with no relations to expand.
    pub fn new(repo: R) -> Self {
        Self::with_resolver(repo, Arc::new(RelatedEntityResolver::default()))
    }

    pub fn with_resolver(repo: R, resolver: Arc<RelatedEntityResolver>) -> Self {
        Self {
            repo,
            resolver,
            _entity: PhantomData,
        }
    }

    #[instrument(skip_all, name = "service#count")]
    pub async fn count(&self) -> ServiceResult<u64> {
        self.repo
            .count()
            .await
            .change_context(EntityServiceError::Storage)
    }

    /// Ids that don't exist are left out of the result.
    #[instrument(skip_all, name = "service#list_by_ids", fields(ids = ids.len()))]
    pub async fn list_by_ids(&self, ids: &[E::Id]) -> ServiceResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repo
            .get_many(ids)
            .await
            .change_context(EntityServiceError::Storage)
    }

    #[instrument(skip_all, name = "service#list")]
    pub async fn list(&self) -> ServiceResult<Vec<E>> {
        self.list_where(None, Paging::ALL).await
    }

    #[instrument(skip_all, name = "service#get", fields(%id))]
    pub async fn get(&self, id: &E::Id) -> OptServiceResult<E> {
        self.repo
            .get(id)
            .await
            .change_context(EntityServiceError::Storage)
            .attach_with(|| format!("{} id: {id}", E::NAME))
    }

    /// Entities whose `property` equals any of `values`, each value converted to the field's type.
    #[instrument(skip_all, name = "service#get_by_property", fields(%property))]
    pub async fn get_by_property<S: AsRef<str>>(
        &self,
        property: &str,
        values: &[S],
    ) -> ServiceResult<Vec<E>> {
        if values.is_empty() {
            return Err(Report::new(EntityServiceError::invalid(
                "at least one value is required",
            )));
        }
        let field = field::<E>(property)?;

        let values = values
            .iter()
            .map(|raw| field.convert(raw.as_ref(), true).map_err(conversion))
            .collect::<Result<Vec<_>, _>>()?;

        self.list_where(Some(Predicate::In { field, values }), Paging::ALL)
            .await
    }

    /// Matching entities ordered by id, then `paging` applied. No predicate matches everything.
    #[instrument(skip_all, name = "service#list_where", fields(?paging))]
    pub async fn list_where(
        &self,
        predicate: Option<Predicate<E>>,
        paging: Paging,
    ) -> ServiceResult<Vec<E>> {
        let entities = match predicate.unwrap_or(Predicate::All) {
            Predicate::All => self.repo.list().await,
            predicate => self.repo.list_where(&predicate).await,
        }
        .change_context(EntityServiceError::Storage)?;

        Ok(paging.apply(sorted(entities)))
    }

    /// Listing driven by raw `$filter`, `$top` and `$skip` query parameters.
    #[instrument(skip_all, name = "service#list_query")]
    pub async fn list_query(&self, params: &QueryParams) -> ServiceResult<Vec<E>> {
        let paging = params.paging().map_err(from_query)?;
        let predicate = params
            .filter()
            .map(engine::filter::parse::<E>)
            .transpose()
            .map_err(from_filter)?;

        self.list_where(predicate, paging).await
    }

    /// All entities, handed to `transform` before being returned.
    pub async fn list_with<F>(&self, transform: F) -> ServiceResult<Vec<E>>
    where
        F: FnOnce(Vec<E>) -> Vec<E>,
    {
        self.list().await.map(transform)
    }

    pub async fn list_where_with<F>(
        &self,
        predicate: Predicate<E>,
        transform: F,
    ) -> ServiceResult<Vec<E>>
    where
        F: FnOnce(Vec<E>) -> Vec<E>,
    {
        self.list_where(Some(predicate), Paging::ALL)
            .await
            .map(transform)
    }

    /// The named field of the entity, as a string. `None` if either the
    /// entity doesn't exist or the field is null.
    #[instrument(skip_all, name = "service#get_property_value", fields(%id, %property))]
    pub async fn get_property_value(
        &self,
        id: &E::Id,
        property: &str,
    ) -> OptServiceResult<String> {
        let field = field::<E>(property)?;
        Ok(self
            .get(id)
            .await?
            .and_then(|entity| field.read(&entity).into_string()))
    }

    /// Set a single field from its string form and return the stored value, as a string.
    #[instrument(skip_all, name = "service#update_property_value", fields(%id, %property))]
    pub async fn update_property_value(
        &self,
        id: E::Id,
        property: &str,
        raw: &str,
    ) -> OptServiceResult<String> {
        let field = field::<E>(property)?;
        if field.is_identity() {
            return Err(Report::new(EntityServiceError::invalid(format!(
                "'{}' is the identity of {} and cannot be updated",
                field.name(),
                E::NAME
            ))));
        }

        let value = field.convert(raw, true).map_err(conversion)?;
        let mut shell = E::default();
        if !field.write(&mut shell, value) {
            return Err(Report::new(EntityServiceError::TypeConversion {
                field: field.name().to_owned(),
                raw: raw.to_owned(),
            }));
        }

        let updated = self
            .update_fields(id, shell, ChangedFields::new(vec![field]))
            .await?;
        Ok(field.read(&updated).into_string())
    }

    #[instrument(skip_all, name = "service#add")]
    pub async fn add(&self, entity: E) -> ServiceResult<E> {
        self.add_many(vec![entity])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Report::new(EntityServiceError::Storage))
            .attach("the repository returned nothing for a created entity")
    }

    /// The created entities, with any id or audit fields the repository filled in.
    #[instrument(skip_all, name = "service#add_many", fields(count = entities.len()))]
    pub async fn add_many(&self, entities: Vec<E>) -> ServiceResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        self.repo
            .create(entities)
            .await
            .change_context(EntityServiceError::Storage)
    }

    /// Partial update: only `changed` fields are written, everything else on the
    /// stored entity stays as it was. The payload's id is overwritten with `id`.
    #[instrument(skip_all, name = "service#update", fields(%id))]
    pub async fn update<S: AsRef<str>>(
        &self,
        id: E::Id,
        entity: E,
        changed: &[S],
    ) -> ServiceResult<E> {
        if changed.is_empty() {
            return Err(Report::new(EntityServiceError::invalid(
                "at least one changed property is required",
            )));
        }
        let fields = changed
            .iter()
            .map(|name| field::<E>(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        self.update_fields(id, entity, ChangedFields::new(fields))
            .await
    }

    /// Full replace: every field but the identity is written, defaults included.
    #[instrument(skip_all, name = "service#replace", fields(%id))]
    pub async fn replace(&self, id: E::Id, entity: E) -> ServiceResult<E> {
        let changed = ChangedFields::new(E::fields().writable().collect());
        self.update_fields(id, entity, changed).await
    }

    /// `false` when there was nothing to delete.
    #[instrument(skip_all, name = "service#delete", fields(%id))]
    pub async fn delete(&self, id: &E::Id) -> ServiceResult<bool> {
        self.repo
            .delete(id)
            .await
            .change_context(EntityServiceError::Storage)
    }

    /// Entities whose alternate key contains `text`, ignoring case.
    #[instrument(skip_all, name = "service#search")]
    pub async fn search(&self, text: &str) -> ServiceResult<Vec<E>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Report::new(EntityServiceError::invalid(
                "search text is required",
            )));
        }
        let key = alternate_key::<E>()?;

        let needle = text.to_lowercase();
        let predicate = Predicate::from_fn(move |entity: &E| {
            key.read(entity)
                .as_str()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        });
        self.list_where(Some(predicate), Paging::ALL).await
    }

    /// Look `raw` up as an id first, then as an exact alternate key.
    #[instrument(skip_all, name = "service#get_by_key", fields(%raw))]
    pub async fn get_by_key(&self, raw: &str) -> OptServiceResult<E> {
        if let Some(id) = <E::Id as FieldType>::parse(raw) {
            if let Some(entity) = self.get(&id).await? {
                return Ok(Some(entity));
            }
        }

        let Some(name) = E::ALTERNATE_KEY else {
            return Ok(None);
        };
        let key = field::<E>(name)?;
        let predicate = Predicate::Compare {
            field: key,
            op: CompareOp::Eq,
            value: FieldValue::Text(raw.to_owned()),
        };
        Ok(self
            .list_where(Some(predicate), Paging::new(Some(1), None))
            .await?
            .into_iter()
            .next())
    }

    /// Wrap `entity`, attaching the relations `expand` selects.
    #[instrument(skip_all, name = "service#envelope", fields(id = %entity.id()))]
    pub async fn envelope(
        &self,
        entity: E,
        uri: Option<String>,
        expand: &Expand,
    ) -> ServiceResult<Envelope<E>> {
        let related = self
            .resolver
            .resolve(E::NAME, &entity.id().to_string(), expand)
            .await?;
        let envelope = Envelope::new(entity).with_related(related);
        Ok(match uri {
            Some(uri) => envelope.with_uri(uri),
            None => envelope,
        })
    }

    /// Envelopes in the order given. With `base_uri`, each gets `{base_uri}/{id}`.
    #[instrument(skip_all, name = "service#envelopes", fields(count = entities.len()))]
    pub async fn envelopes(
        &self,
        entities: Vec<E>,
        base_uri: Option<&str>,
        expand: &Expand,
    ) -> ServiceResult<Vec<Envelope<E>>> {
        let mut envelopes = Vec::with_capacity(entities.len());
        for entity in entities {
            let uri = base_uri.map(|base| format!("{base}/{}", entity.id()));
            envelopes.push(self.envelope(entity, uri, expand).await?);
        }
        Ok(envelopes)
    }

    async fn update_fields(
        &self,
        id: E::Id,
        mut entity: E,
        changed: ChangedFields<E>,
    ) -> ServiceResult<E> {
        if changed.is_empty() {
            return Err(Report::new(EntityServiceError::invalid(format!(
                "no writable properties of {} were named",
                E::NAME
            ))));
        }
        debug!(fields = %changed.names().join(","), "updating");

        entity.set_id(id.clone());
        self.repo
            .update(entity, &changed)
            .await
            .change_context(EntityServiceError::Storage)?
            .ok_or_else(|| Report::new(EntityServiceError::NotFound))
            .attach_with(|| format!("{} id: {id}", E::NAME))
    }
}

fn field<E: Entity>(name: &str) -> ServiceResult<&'static FieldDescriptor<E>> {
    if name.trim().is_empty() {
        return Err(Report::new(EntityServiceError::invalid(
            "property name is required",
        )));
    }
    E::fields().get(name).ok_or_else(|| {
        Report::new(EntityServiceError::invalid(format!(
            "'{name}' is not a property of {}",
            E::NAME
        )))
    })
}

fn alternate_key<E: Entity>() -> ServiceResult<&'static FieldDescriptor<E>> {
    match E::ALTERNATE_KEY {
        Some(name) => field::<E>(name),
        None => Err(Report::new(EntityServiceError::invalid(format!(
            "{} has no alternate key to search",
            E::NAME
        )))),
    }
}

fn conversion(report: Report<ConversionError>) -> Report<EntityServiceError> {
    let context = EntityServiceError::TypeConversion {
        field: report.current_context().field.clone(),
        raw: report.current_context().raw.clone(),
    };
    report.change_context(context)
}

fn sorted<E: Entity>(mut entities: Vec<E>) -> Vec<E> {
    entities.sort_by(|a, b| a.id().cmp(b.id()));
    entities
}
