use crate::error::{EndpointError, ErrorResponse};
use crate::routes::requests::PatchRequest;
use crate::routes::responses::EnvelopeResponse;
use crate::state::EntityAppState;
use crate::stream::StreamingResponse;
use axum::http::StatusCode;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use engine::Entity;
use engine::envelope::Envelope;
use engine::query::{Expand, QueryParams};
use engine::repository::EntityRepository;
use tracing::instrument;

mod requests;
mod responses;

const LIST_PATH: &str = "/";
const COUNT_PATH: &str = "/count";
const IDS_PATH: &str = "/ids";
const BY_PROPERTY_PATH: &str = "/by/{property}";
const SEARCH_PATH: &str = "/search/{text}";
const ENTITY_PATH: &str = "/{id}";
const PROPERTY_PATH: &str = "/{id}/{property}";

type Params = Query<Vec<(String, String)>>;
type EndpointResult = Result<Response, EndpointError>;

/// All routes for one entity type, nested under the state's root path.
pub fn build<E, R>(state: EntityAppState<E, R>) -> Router
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let root = state.root;
    let router = Router::new()
        .route(LIST_PATH, get(list::<E, R>).post(create::<E, R>))
        .route(COUNT_PATH, get(count::<E, R>))
        .route(IDS_PATH, post(list_by_ids::<E, R>))
        .route(BY_PROPERTY_PATH, post(list_by_property::<E, R>))
        .route(SEARCH_PATH, get(search::<E, R>))
        .route(
            ENTITY_PATH,
            get(get_entity::<E, R>)
                .patch(patch_entity::<E, R>)
                .put(replace_entity::<E, R>)
                .delete(delete_entity::<E, R>),
        )
        .route(
            PROPERTY_PATH,
            get(get_property::<E, R>).put(put_property::<E, R>),
        )
        .with_state(state);

    Router::new().nest(root, router)
}

fn query(params: Vec<(String, String)>) -> QueryParams {
    params.into_iter().collect()
}

async fn envelopes<E, R>(
    state: &EntityAppState<E, R>,
    entities: Vec<E>,
    expand: &Expand,
) -> Result<Vec<Envelope<E>>, EndpointError>
where
    E: Entity,
    R: EntityRepository<E> + Send + Sync,
{
    Ok(state
        .service
        .envelopes(entities, Some(state.root), expand)
        .await?)
}

/// Entities matching `$filter`, paged by `$top`/`$skip`, expanded by `$expand`.
#[instrument(skip_all, err(Debug))]
async fn list<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Query(params): Params,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let params = query(params);
    let entities = state.service.list_query(&params).await?;
    let envelopes = envelopes(&state, entities, &params.expand()).await?;
    Ok(StreamingResponse::ok(envelopes).into_response())
}

#[instrument(skip_all, err(Debug))]
async fn count<E, R>(State(state): State<EntityAppState<E, R>>) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    Ok(Json(state.service.count().await?).into_response())
}

#[instrument(skip_all, err(Debug), fields(ids = ids.len()))]
async fn list_by_ids<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Query(params): Params,
    Json(ids): Json<Vec<E::Id>>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let entities = state.service.list_by_ids(&ids).await?;
    let envelopes = envelopes(&state, entities, &query(params).expand()).await?;
    Ok(StreamingResponse::ok(envelopes).into_response())
}

/// Entities whose `property` equals any of the values in the body.
#[instrument(skip_all, err(Debug), fields(%property))]
async fn list_by_property<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path(property): Path<String>,
    Query(params): Params,
    Json(values): Json<Vec<String>>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let entities = state.service.get_by_property(&property, &values).await?;
    let envelopes = envelopes(&state, entities, &query(params).expand()).await?;
    Ok(StreamingResponse::ok(envelopes).into_response())
}

#[instrument(skip_all, err(Debug), fields(%text))]
async fn search<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path(text): Path<String>,
    Query(params): Params,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let entities = state.service.search(&text).await?;
    let envelopes = envelopes(&state, entities, &query(params).expand()).await?;
    Ok(StreamingResponse::ok(envelopes).into_response())
}

/// Look up by id, or by alternate key when the segment isn't a known id.
#[instrument(skip_all, err(Debug), fields(%id_or_key))]
async fn get_entity<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path(id_or_key): Path<String>,
    Query(params): Params,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let Some(entity) = state.service.get_by_key(&id_or_key).await? else {
        return Ok(ErrorResponse::not_found().into_response());
    };

    let uri = state.uri(entity.id());
    let envelope = state
        .service
        .envelope(entity, Some(uri), &query(params).expand())
        .await?;
    Ok(EnvelopeResponse::ok(envelope).into_response())
}

#[instrument(skip_all, err(Debug))]
async fn create<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Json(entities): Json<Vec<E>>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    if entities.is_empty() {
        return Ok(
            ErrorResponse::new(StatusCode::BAD_REQUEST, "a non-empty array is required")
                .into_response(),
        );
    }

    let created = state.service.add_many(entities).await?;
    let envelopes = envelopes(&state, created, &Expand::None).await?;
    Ok(StreamingResponse::created(envelopes).into_response())
}

/// Partial update: only `ChangedProperties` are written.
#[instrument(skip_all, err(Debug), fields(%id, changed = ?request.changed_properties))]
async fn patch_entity<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path(id): Path<E::Id>,
    Json(request): Json<PatchRequest<E>>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let updated = state
        .service
        .update(id.clone(), request.entity, &request.changed_properties)
        .await?;
    let envelope = state
        .service
        .envelope(updated, Some(state.uri(&id)), &Expand::None)
        .await?;
    Ok(EnvelopeResponse::ok(envelope).into_response())
}

#[instrument(skip_all, err(Debug), fields(%id))]
async fn replace_entity<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path(id): Path<E::Id>,
    Json(entity): Json<E>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    let replaced = state.service.replace(id.clone(), entity).await?;
    let envelope = state
        .service
        .envelope(replaced, Some(state.uri(&id)), &Expand::None)
        .await?;
    Ok(EnvelopeResponse::ok(envelope).into_response())
}

/// `true` when something was deleted. Deleting a missing id isn't an error.
#[instrument(skip_all, err(Debug), fields(%id))]
async fn delete_entity<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path(id): Path<E::Id>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    Ok(Json(state.service.delete(&id).await?).into_response())
}

#[instrument(skip_all, err(Debug), fields(%id, %property))]
async fn get_property<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path((id, property)): Path<(E::Id, String)>,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    Ok(Json(state.service.get_property_value(&id, &property).await?).into_response())
}

/// The body is the raw new value; the stored value comes back as a JSON string or null.
#[instrument(skip_all, err(Debug), fields(%id, %property))]
async fn put_property<E, R>(
    State(state): State<EntityAppState<E, R>>,
    Path((id, property)): Path<(E::Id, String)>,
    value: String,
) -> EndpointResult
where
    E: Entity,
    R: EntityRepository<E> + Clone + Send + Sync + 'static,
{
    Ok(Json(
        state
            .service
            .update_property_value(id, &property, &value)
            .await?,
    )
    .into_response())
}
