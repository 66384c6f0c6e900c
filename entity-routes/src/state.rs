use engine::Entity;
use engine::repository::EntityRepository;
use entity_service::EntityService;

pub struct EntityAppState<E, R> {
    pub service: EntityService<E, R>,
    /// Path the entity's routes are nested under, used to build resource uris.
    pub root: &'static str,
}

impl<E, R: Clone> Clone for EntityAppState<E, R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            root: self.root,
        }
    }
}

impl<E, R> EntityAppState<E, R>
where
    E: Entity,
    R: EntityRepository<E> + Send + Sync,
{
    pub fn new(root: &'static str, service: EntityService<E, R>) -> Self {
        Self { service, root }
    }

    pub fn uri(&self, id: &E::Id) -> String {
        format!("{}/{id}", self.root)
    }
}
