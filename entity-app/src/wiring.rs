//! Builds the services and routes for every entity the app serves.
use crate::{AppError, AppResult};
use axum::Router;
use engine::Entity;
use engine::filter::parse;
use entities::{Addendum, User, UserGroup};
use entity_routes::routes;
use entity_routes::state::EntityAppState;
use entity_service::{EntityService, ForeignKeyRelation, RelatedEntityResolver, Relation};
use error_stack::ResultExt;
use repositories::InMemoryRepo;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const USERS_ROOT: &str = "/users";
pub const USER_GROUPS_ROOT: &str = "/usergroups";
pub const ADDENDA_ROOT: &str = "/addenda";

type Repo<E> = Arc<InMemoryRepo<E>>;

/// Addenda owned by entities of type `owner`, joined on `EntityId`.
fn addenda_of(owner: &str, addenda: &EntityService<Addendum, Repo<Addendum>>) -> AppResult<Relation> {
    let relation = ForeignKeyRelation::new(addenda.clone(), "EntityId")
        .change_context(AppError)?
        .with_filter(
            parse(&format!("Entity eq '{owner}'"))
                .change_context(AppError)
                .attach_with(|| format!("addendum filter for {owner}"))?,
        )
        .with_uri(ADDENDA_ROOT);
    Ok(Relation::new(Addendum::NAME, relation))
}

#[instrument(skip_all)]
pub fn build_routes() -> AppResult<Router> {
    let addenda = EntityService::new(Repo::<Addendum>::default());

    let users = EntityService::with_resolver(
        Repo::<User>::default(),
        Arc::new(RelatedEntityResolver::default().with(addenda_of(User::NAME, &addenda)?)),
    );
    let user_groups = EntityService::with_resolver(
        Repo::<UserGroup>::default(),
        Arc::new(RelatedEntityResolver::default().with(addenda_of(UserGroup::NAME, &addenda)?)),
    );

    debug!("building routes..");
    Ok(Router::new()
        .merge(routes::build(EntityAppState::new(USERS_ROOT, users)))
        .merge(routes::build(EntityAppState::new(USER_GROUPS_ROOT, user_groups)))
        .merge(routes::build(EntityAppState::new(ADDENDA_ROOT, addenda))))
    .inspect(|_| debug!("routes built"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addendum_relation_is_named_after_the_entity() {
        let addenda = EntityService::new(Repo::<Addendum>::default());
        let relation = addenda_of("User", &addenda).unwrap();
        assert_eq!("Addendum", relation.name());
        assert!(!relation.is_required());
    }
}
