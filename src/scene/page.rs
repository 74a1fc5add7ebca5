//! Scene Page
//!
//! A page is one level: a camera, an actor registry and a collider
//! registry, both fixed-capacity pools created with the page.
//!
//! Actors are owned by the page once linked. The collider registry holds
//! links, not colliders: an actor's collider stays inside the actor and the
//! registry entry points back at the actor, so the collider always follows
//! the actor's current transform. Standalone colliders (walls, triggers)
//! live directly in the registry with their own transform.
//!
//! Registration order is update order. The first aggressive collider to be
//! processed in a tick wins a mutual block.

use std::fmt;

use tracing::{debug, trace};

use super::actor::{Actor, ActorFlags, ActorId};
use super::camera::Camera;
use super::transform::Transform;
use crate::buffer::pool::{Handle, Pool, PoolError};
use crate::buffer::string::BvrString;
use crate::config::EngineConfig;
use crate::math::Vec3;
use crate::physics::body::Body;
use crate::physics::collider::{Anchor, Collider};
use crate::physics::collision::{compare, ColliderRef};
use crate::render::Renderer;

/// Default actor registry size
pub const MAX_SCENE_ACTORS: usize = 64;
/// Default collider registry size
pub const MAX_SCENE_COLLIDERS: usize = 128;

/// Stable reference to a collider registry entry
pub type ColliderId = Handle<ColliderLink>;

/// Collider registry entry
#[derive(Debug)]
pub enum ColliderLink {
    /// The collider of a linked actor
    Actor(ActorId),
    /// A collider owned by the registry, anchored to its own transform
    Standalone(Collider),
}

/// Error type for page operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Registry could not be created
    Pool(PoolError),
    ActorPoolFull,
    ColliderPoolFull,
    /// Actor handle is stale or was never linked here
    StaleActor(ActorId),
    StaleCollider(ColliderId),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::Pool(e) => write!(f, "registry error: {}", e),
            PageError::ActorPoolFull => write!(f, "actor registry is full"),
            PageError::ColliderPoolFull => write!(f, "collider registry is full"),
            PageError::StaleActor(id) => write!(f, "actor {:?} is not linked to this page", id),
            PageError::StaleCollider(id) => write!(f, "collider {:?} is not linked to this page", id),
        }
    }
}

impl std::error::Error for PageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageError::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for PageError {
    fn from(e: PoolError) -> Self {
        PageError::Pool(e)
    }
}

/// A rejected [`Page::try_link_actor`], carrying the actor back
#[derive(Debug)]
pub struct LinkError {
    pub error: PageError,
    pub actor: Box<Actor>,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot link actor {}: {}", self.actor.name, self.error)
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A motion vetoed during [`Page::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub mover: ColliderId,
    pub other: ColliderId,
}

/// What one update tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Colliders that moved
    pub moved: usize,
    /// Aggressive colliders whose motion was vetoed
    pub blocked: Vec<Contact>,
    /// Passive colliders whose queued motion was dropped
    pub held: usize,
    /// Entries skipped (inactive actor)
    pub skipped: usize,
}

enum Step {
    Move,
    Hold,
    Block(ColliderId),
}

pub struct Page {
    pub name: BvrString,
    pub camera: Camera,
    actors: Pool<Actor>,
    colliders: Pool<ColliderLink>,
}

impl Page {
    pub fn new(name: &str, max_actors: usize, max_colliders: usize) -> Result<Self, PageError> {
        Ok(Self {
            name: BvrString::new(name),
            camera: Camera::default(),
            actors: Pool::new(max_actors)?,
            colliders: Pool::new(max_colliders)?,
        })
    }

    pub fn from_config(name: &str, config: &EngineConfig) -> Result<Self, PageError> {
        Self::new(name, config.max_actors, config.max_colliders)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Link an actor, and its collider if it has one.
    ///
    /// On failure nothing stays registered and the actor is torn down,
    /// unless it is flagged `NOT_FREE`. Use [`Page::try_link_actor`] to get
    /// the actor back instead.
    pub fn link_actor(&mut self, actor: Actor) -> Result<ActorId, PageError> {
        self.try_link_actor(actor).map_err(|LinkError { error, actor }| {
            if actor.flags.contains(ActorFlags::NOT_FREE) {
                debug!(actor = %actor.name, "NOT_FREE actor rejected, left to its owner");
            } else {
                (*actor).destroy();
            }
            error
        })
    }

    /// Link an actor, handing it back untouched if a registry is full.
    pub fn try_link_actor(&mut self, actor: Actor) -> Result<ActorId, LinkError> {
        let has_collider = actor.collider().is_some();
        let name = actor.name.clone();

        let id = self.actors.try_alloc(actor).map_err(|actor| {
            debug!(actor = %name, "actor registry full");
            LinkError { error: PageError::ActorPoolFull, actor: Box::new(actor) }
        })?;

        if has_collider {
            let link = match self.colliders.try_alloc(ColliderLink::Actor(id)) {
                Ok(link) => link,
                Err(_) => {
                    debug!(actor = %name, "collider registry full, actor link rolled back");
                    return match self.actors.free(id) {
                        Ok(actor) => Err(LinkError { error: PageError::ColliderPoolFull, actor: Box::new(actor) }),
                        Err(_) => unreachable!("actor {:?} was allocated above", id),
                    };
                }
            };
            if let Some(actor) = self.actors.get_mut(id) {
                actor.collider_link = Some(link);
                if let Some(collider) = actor.collider_mut() {
                    collider.set_anchor(Anchor::Actor(id));
                }
            }
        }

        debug!(actor = %name, ?id, "linked actor");
        Ok(id)
    }

    /// How many actor and collider slots linking `actors` would take.
    pub fn slots_needed<'a, I>(actors: I) -> (usize, usize)
    where
        I: IntoIterator<Item = &'a Actor>,
    {
        actors.into_iter().fold((0, 0), |(a, c), actor| {
            (a + 1, c + usize::from(actor.collider().is_some()))
        })
    }

    /// Register a standalone collider positioned by `transform`.
    pub fn link_collider(&mut self, mut collider: Collider, transform: Transform) -> Result<ColliderId, PageError> {
        collider.set_anchor(Anchor::Owned(transform));
        self.colliders
            .alloc(ColliderLink::Standalone(collider))
            .map_err(|_| PageError::ColliderPoolFull)
    }

    /// Remove an actor and its collider link, handing the actor back.
    pub fn unlink_actor(&mut self, id: ActorId) -> Result<Actor, PageError> {
        let mut actor = self.actors.free(id).map_err(|_| PageError::StaleActor(id))?;
        if let Some(link) = actor.collider_link.take() {
            // The link may already be gone if it was unlinked on its own
            let _ = self.colliders.free(link);
        }
        if let Some(collider) = actor.collider_mut() {
            collider.set_anchor(Anchor::Unbound);
        }
        debug!(actor = %actor.name, ?id, "unlinked actor");
        Ok(actor)
    }

    /// Remove a collider registry entry.
    ///
    /// Returns the collider if it was standalone. An actor's collider stays
    /// with the actor, which keeps its transform but stops colliding.
    pub fn unlink_collider(&mut self, id: ColliderId) -> Result<Option<Collider>, PageError> {
        match self.colliders.free(id).map_err(|_| PageError::StaleCollider(id))? {
            ColliderLink::Standalone(mut collider) => {
                collider.set_anchor(Anchor::Unbound);
                Ok(Some(collider))
            }
            ColliderLink::Actor(actor_id) => {
                if let Some(actor) = self.actors.get_mut(actor_id) {
                    actor.collider_link = None;
                    if let Some(collider) = actor.collider_mut() {
                        collider.set_anchor(Anchor::Unbound);
                    }
                }
                Ok(None)
            }
        }
    }

    /// Tear down both registries.
    ///
    /// Every linked actor is destroyed, except those flagged `NOT_FREE`,
    /// which are returned to the caller that owns them.
    pub fn destroy(mut self) -> Vec<Actor> {
        self.colliders.clear();
        let mut kept = Vec::new();
        for mut actor in self.actors.drain() {
            actor.collider_link = None;
            if let Some(collider) = actor.collider_mut() {
                collider.set_anchor(Anchor::Unbound);
            }
            if actor.flags.contains(ActorFlags::NOT_FREE) {
                kept.push(actor);
            } else {
                actor.destroy();
            }
        }
        debug!(page = %self.name, kept = kept.len(), "destroyed page");
        kept
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    /// Linked actors in registration slot order
    pub fn actors(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.actors.iter()
    }

    pub fn find_actor(&self, name: &str) -> Option<ActorId> {
        self.actors
            .iter()
            .find(|(_, actor)| actor.name.as_str() == name)
            .map(|(id, _)| id)
    }

    /// Collider registry entries in update order
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderId, &ColliderLink)> {
        self.colliders.iter()
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        match self.colliders.get(id)? {
            ColliderLink::Actor(actor_id) => self.actors.get(*actor_id)?.collider(),
            ColliderLink::Standalone(collider) => Some(collider),
        }
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        match self.colliders.get_mut(id)? {
            ColliderLink::Actor(actor_id) => self.actors.get_mut(*actor_id)?.collider_mut(),
            ColliderLink::Standalone(collider) => Some(collider),
        }
    }

    /// World position the collider's boxes are offset from.
    pub fn collider_position(&self, id: ColliderId) -> Option<Vec3> {
        match self.colliders.get(id)? {
            ColliderLink::Actor(actor_id) => Some(self.actors.get(*actor_id)?.transform.position),
            ColliderLink::Standalone(collider) => Some(anchor_position(collider)),
        }
    }

    pub fn actor_count(&self) -> usize {
        self.actors.live_count()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.live_count()
    }

    pub fn actor_capacity(&self) -> usize {
        self.actors.capacity()
    }

    pub fn collider_capacity(&self) -> usize {
        self.colliders.capacity()
    }

    /// Resolve a registry entry for collision. `None` for inactive actors
    /// and dangling links.
    fn resolve(&self, id: ColliderId) -> Option<ColliderRef<'_>> {
        match self.colliders.get(id)? {
            ColliderLink::Actor(actor_id) => {
                let actor = self.actors.get(*actor_id)?;
                if !actor.active {
                    return None;
                }
                Some(ColliderRef::new(id, actor.collider()?, actor.transform.position))
            }
            ColliderLink::Standalone(collider) => {
                Some(ColliderRef::new(id, collider, anchor_position(collider)))
            }
        }
    }

    // =========================================================================
    // Per-frame
    // =========================================================================

    /// Run one physics tick over every registered collider, in order.
    ///
    /// - disabled or empty: queued motion always applies
    /// - aggressive: motion applies unless it would overlap another enabled
    ///   collider; a blocked body loses its queued force
    /// - passive: queued motion is dropped
    pub fn update(&mut self) -> UpdateReport {
        let mut report = UpdateReport::default();

        for id in self.colliders.handles() {
            let step = {
                let Some(mover) = self.resolve(id) else {
                    report.skipped += 1;
                    continue;
                };
                let mode = mover.collider.body.mode;

                if !mode.is_enabled() || mover.collider.is_empty() {
                    Step::Move
                } else if mode.is_aggressive() {
                    let hit = self
                        .colliders
                        .iter()
                        .filter(|(other, _)| *other != id)
                        .filter_map(|(other, _)| self.resolve(other))
                        .filter(|other| other.collider.body.mode.is_enabled())
                        .map(|other| compare(mover, other))
                        .find(|result| result.collided());
                    match hit.and_then(|result| result.other) {
                        Some(other) => Step::Block(other),
                        None => Step::Move,
                    }
                } else {
                    Step::Hold
                }
            };

            match step {
                Step::Move => {
                    if self.consume_motion(id, true) {
                        report.moved += 1;
                    }
                }
                Step::Hold => {
                    self.consume_motion(id, false);
                    report.held += 1;
                }
                Step::Block(other) => {
                    self.consume_motion(id, false);
                    trace!(mover = ?id, ?other, "motion blocked");
                    report.blocked.push(Contact { mover: id, other });
                }
            }
        }

        report
    }

    /// Apply (or drop) the queued motion of a registry entry.
    /// Returns true if the owner actually moved.
    fn consume_motion(&mut self, id: ColliderId, apply: bool) -> bool {
        let Some(link) = self.colliders.get_mut(id) else {
            return false;
        };
        match link {
            ColliderLink::Actor(actor_id) => {
                let Some(actor) = self.actors.get_mut(*actor_id) else {
                    return false;
                };
                match actor.collider_and_transform_mut() {
                    Some((collider, transform)) => step_body(&mut collider.body, Some(transform), apply),
                    None => false,
                }
            }
            ColliderLink::Standalone(collider) => {
                let (body, anchor) = collider.body_and_anchor_mut();
                match anchor {
                    Anchor::Owned(transform) => step_body(body, Some(transform), apply),
                    _ => step_body(body, None, apply),
                }
            }
        }
    }

    /// Draw active actors, lowest `order_in_layer` first. Ties keep
    /// registration order.
    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        let mut order: Vec<(u16, ActorId)> = self
            .actors
            .iter()
            .filter(|(_, actor)| actor.active)
            .map(|(id, actor)| (actor.order_in_layer, id))
            .collect();
        order.sort_by_key(|(layer, _)| *layer);

        for (_, id) in order {
            if let Some(actor) = self.actors.get_mut(id) {
                actor.draw(renderer);
            }
        }
    }
}

fn anchor_position(collider: &Collider) -> Vec3 {
    match collider.anchor() {
        Anchor::Owned(transform) => transform.position,
        _ => Vec3::ZERO,
    }
}

fn step_body(body: &mut Body, transform: Option<&mut Transform>, apply: bool) -> bool {
    let moving = body.acceleration() > 0.0;
    match transform {
        Some(transform) if apply => {
            body.apply_motion(transform);
            moving
        }
        _ => {
            body.reset();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::physics::body::BodyMode;
    use crate::physics::bounds::Bounds;
    use crate::render::mesh::MeshData;
    use crate::render::{ShaderHandle, TextureHandle};
    use crate::scene::actor::{ActorDesc, ActorType};

    fn page() -> Page {
        Page::new("test", MAX_SCENE_ACTORS, MAX_SCENE_COLLIDERS).unwrap()
    }

    fn boxed(name: &str, x: f32, mode: BodyMode) -> Actor {
        let collider = Collider::from_bounds(vec![Bounds::new(0.0, 0.0, 10, 10)]).with_mode(mode);
        Actor::dynamic_with_collider(name, Vec3::new(x, 0.0, 0.0), collider)
    }

    fn passive() -> BodyMode {
        BodyMode::ENABLED | BodyMode::AABB | BodyMode::PASSIVE
    }

    fn aggressive() -> BodyMode {
        BodyMode::ENABLED | BodyMode::AABB | BodyMode::AGGRESSIVE
    }

    #[test]
    fn test_link_registers_collider() {
        let mut page = page();
        let id = page.link_actor(boxed("a", 0.0, passive())).unwrap();
        let link = page.actor(id).unwrap().collider_id().unwrap();

        assert_eq!(page.collider_count(), 1);
        assert_eq!(page.collider(link).unwrap().anchor(), &Anchor::Actor(id));

        // Kinds without colliders only take an actor slot
        page.link_actor(Actor::empty("root")).unwrap();
        assert_eq!(page.actor_count(), 2);
        assert_eq!(page.collider_count(), 1);
    }

    #[test]
    fn test_link_rolls_back_when_collider_registry_full() {
        let mut page = Page::new("small", 4, 1).unwrap();
        page.link_actor(boxed("first", 0.0, passive())).unwrap();

        let err = page.link_actor(boxed("second", 50.0, passive())).unwrap_err();
        assert_eq!(err, PageError::ColliderPoolFull);
        assert_eq!(page.actor_count(), 1);
        assert!(page.find_actor("second").is_none());
    }

    #[test]
    fn test_try_link_hands_actor_back() {
        let mut page = Page::new("small", 4, 1).unwrap();
        page.link_actor(boxed("first", 0.0, passive())).unwrap();

        let mut keeper = boxed("keeper", 50.0, passive());
        keeper.flags = ActorFlags::NOT_FREE;
        let rejected = page.try_link_actor(keeper).unwrap_err();
        assert_eq!(rejected.error, PageError::ColliderPoolFull);
        assert_eq!(rejected.actor.name.as_str(), "keeper");
        assert_eq!(rejected.actor.collider().unwrap().geometry().len(), 1);
        assert_eq!(page.actor_count(), 1);

        let mut full = Page::new("tiny", 1, 4).unwrap();
        full.link_actor(Actor::empty("a")).unwrap();
        let rejected = full.try_link_actor(Actor::empty("b")).unwrap_err();
        assert_eq!(rejected.error, PageError::ActorPoolFull);
        assert_eq!(rejected.actor.name.as_str(), "b");
    }

    #[test]
    fn test_actor_registry_full() {
        let mut page = Page::new("small", 1, 4).unwrap();
        page.link_actor(Actor::empty("a")).unwrap();
        assert_eq!(page.link_actor(Actor::empty("b")), Err(PageError::ActorPoolFull));
    }

    #[test]
    fn test_unlink_actor_frees_both_slots() {
        let mut page = page();
        let id = page.link_actor(boxed("a", 0.0, passive())).unwrap();
        let actor = page.unlink_actor(id).unwrap();

        assert_eq!(actor.collider().unwrap().anchor(), &Anchor::Unbound);
        assert_eq!(page.actor_count(), 0);
        assert_eq!(page.collider_count(), 0);
        assert_eq!(page.unlink_actor(id).unwrap_err(), PageError::StaleActor(id));
    }

    #[test]
    fn test_blocked_aggressive_loses_force() {
        let mut page = page();
        page.link_actor(boxed("wall", 0.0, passive())).unwrap();
        let mover = page.link_actor(boxed("mover", 5.0, aggressive())).unwrap();

        page.actor_mut(mover).unwrap().add_force(-1.0, 0.0, 0.0);
        let report = page.update();

        let actor = page.actor(mover).unwrap();
        assert_eq!(actor.transform.position.x, 5.0);
        assert_eq!(actor.collider().unwrap().body.acceleration(), 0.0);
        assert_eq!(report.blocked.len(), 1);

        // Force is not retried on the next tick
        page.actor_mut(mover).unwrap().transform.position.x = 30.0;
        page.update();
        assert_eq!(page.actor(mover).unwrap().transform.position.x, 30.0);
    }

    #[test]
    fn test_disabled_collider_moves_through() {
        let mut page = page();
        page.link_actor(boxed("wall", 0.0, passive())).unwrap();
        let ghost = page.link_actor(boxed("ghost", 5.0, BodyMode::DISABLED)).unwrap();

        page.actor_mut(ghost).unwrap().add_force(-3.0, 0.0, 0.0);
        let report = page.update();
        assert_eq!(page.actor(ghost).unwrap().transform.position.x, 2.0);
        assert_eq!(report.moved, 1);
    }

    #[test]
    fn test_passive_never_moves() {
        let mut page = page();
        let wall = page.link_actor(boxed("wall", 0.0, passive())).unwrap();
        page.actor_mut(wall).unwrap().add_force(4.0, 0.0, 0.0);
        let report = page.update();

        let actor = page.actor(wall).unwrap();
        assert_eq!(actor.transform.position.x, 0.0);
        assert_eq!(actor.collider().unwrap().body.acceleration(), 0.0);
        assert_eq!(report.held, 1);
    }

    #[test]
    fn test_inactive_actor_is_not_an_obstacle() {
        let mut page = page();
        let wall = page.link_actor(boxed("wall", 0.0, passive())).unwrap();
        let mover = page.link_actor(boxed("mover", 12.0, aggressive())).unwrap();
        page.actor_mut(wall).unwrap().active = false;

        page.actor_mut(mover).unwrap().add_force(-5.0, 0.0, 0.0);
        let report = page.update();
        assert_eq!(page.actor(mover).unwrap().transform.position.x, 7.0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_standalone_collider_blocks() {
        let mut page = page();
        let wall = Collider::from_bounds(vec![Bounds::new(0.0, 0.0, 10, 100)]).with_mode(passive());
        let wall_id = page.link_collider(wall, Transform::from_position(Vec3::new(-10.0, 0.0, 0.0))).unwrap();
        let mover = page.link_actor(boxed("mover", 2.0, aggressive())).unwrap();

        page.actor_mut(mover).unwrap().add_force(-5.0, 0.0, 0.0);
        let report = page.update();
        assert_eq!(report.blocked, vec![Contact { mover: page.actor(mover).unwrap().collider_id().unwrap(), other: wall_id }]);
        assert_eq!(page.collider_position(wall_id), Some(Vec3::new(-10.0, 0.0, 0.0)));

        assert!(page.unlink_collider(wall_id).unwrap().is_some());
        page.actor_mut(mover).unwrap().add_force(-5.0, 0.0, 0.0);
        page.update();
        assert_eq!(page.actor(mover).unwrap().transform.position.x, -3.0);
    }

    #[test]
    fn test_destroy_returns_not_free_actors() {
        let mut page = page();
        let mut kept = Actor::empty("kept");
        kept.flags = ActorFlags::NOT_FREE;
        page.link_actor(kept).unwrap();
        page.link_actor(boxed("gone", 0.0, passive())).unwrap();

        let returned = page.destroy();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].name.as_str(), "kept");
    }

    struct OrderRenderer(Vec<f32>);

    impl Renderer for OrderRenderer {
        fn draw_mesh(&mut self, _: &MeshData, _: ShaderHandle, _: Option<TextureHandle>, model: &Mat4) {
            self.0.push(model[0][3]);
        }
    }

    #[test]
    fn test_draw_sorted_by_order_in_layer() {
        let mut page = page();
        for (x, order) in [(1.0, 5u16), (2.0, 0), (3.0, 5), (4.0, 2)] {
            let desc = ActorDesc::new("s", ActorType::Static).position(Vec3::new(x, 0.0, 0.0)).order(order);
            page.link_actor(Actor::new(desc)).unwrap();
        }
        let mut renderer = OrderRenderer(Vec::new());
        page.draw(&mut renderer);
        assert_eq!(renderer.0, vec![2.0, 4.0, 1.0, 3.0]);
    }
}
