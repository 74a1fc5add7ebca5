//! Engine context
//!
//! A `Book` is created once at startup and passed to whatever needs engine
//! state: it owns the config, the current page, the asset registry and
//! frame timing. Nothing in the engine reaches for a global.

use std::path::Path;

use tracing::{debug, info};

use super::actor::{Actor, ActorFlags, ActorId, MaskSettings};
use super::layout::{load_layout, LayoutError, SceneLayout};
use super::page::{Page, PageError, UpdateReport};
use crate::asset::book_file::{read_book, write_book, BookData, BookError};
use crate::asset::registry::{AssetRegistry, OpenMode};
use crate::config::EngineConfig;
use crate::render::Renderer;

pub struct Book {
    pub config: EngineConfig,
    pub page: Page,
    pub assets: AssetRegistry,
    prev_time_ms: f64,
    current_time_ms: f64,
    delta_time: f32,
}

impl Book {
    pub fn new(config: EngineConfig) -> Result<Self, PageError> {
        let page = Page::from_config("untitled", &config)?;
        Ok(Self {
            config,
            page,
            assets: AssetRegistry::new(),
            prev_time_ms: 0.0,
            current_time_ms: 0.0,
            delta_time: 0.0,
        })
    }

    /// Mask settings derived from the config
    pub fn mask_settings(&self) -> MaskSettings {
        MaskSettings {
            max_rects: self.config.max_mask_rects,
            pixel_scale: self.config.mask_pixel_scale,
        }
    }

    // =========================================================================
    // Frame timing
    // =========================================================================

    /// Start a frame at `now_ms`. Returns the seconds since the last frame.
    pub fn new_frame(&mut self, now_ms: f64) -> f32 {
        self.current_time_ms = now_ms;
        self.delta_time = ((now_ms - self.prev_time_ms).max(0.0) / 1000.0) as f32;
        self.delta_time
    }

    /// Milliseconds to wait at `now_ms` to honor the target framerate.
    /// `None` when uncapped or already late.
    pub fn frame_delay_ms(&self, now_ms: f64) -> Option<f64> {
        let budget = self.config.frame_budget_ms()?;
        let remaining = self.current_time_ms + budget - now_ms;
        (remaining > 0.0).then_some(remaining)
    }

    /// Close the frame started by [`Book::new_frame`].
    pub fn end_frame(&mut self) {
        self.prev_time_ms = self.current_time_ms;
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    // =========================================================================
    // Page
    // =========================================================================

    /// Physics tick for the current page.
    pub fn step(&mut self) -> UpdateReport {
        self.page.update()
    }

    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        self.page.draw(renderer);
    }

    /// Replace the current page with a fresh, empty one.
    ///
    /// Returns the `NOT_FREE` actors of the old page.
    pub fn new_page(&mut self, name: &str) -> Result<Vec<Actor>, PageError> {
        let page = Page::from_config(name, &self.config)?;
        let old = std::mem::replace(&mut self.page, page);
        Ok(old.destroy())
    }

    /// Build a new page from a layout file. Mask images are registered as
    /// read assets.
    pub fn load_layout<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<ActorId>, LayoutError> {
        let path = path.as_ref();
        let layout = load_layout(path)?;
        self.apply_layout(&layout, path.parent())
    }

    pub fn apply_layout(&mut self, layout: &SceneLayout, base_dir: Option<&Path>) -> Result<Vec<ActorId>, LayoutError> {
        let settings = self.mask_settings();

        // Build everything before touching the current page
        let mut actors = Vec::with_capacity(layout.actors.len());
        for entry in &layout.actors {
            let mut actor = Actor::new(entry.to_desc(base_dir, settings)?);
            actor.active = entry.active;
            actors.push(actor);

            if let Some(mask) = &entry.mask {
                let mask_path = base_dir.map(|d| d.join(mask)).unwrap_or_else(|| mask.into());
                if let Err(e) = self.assets.register(&mask_path, OpenMode::Read) {
                    debug!(error = %e, "mask asset not registered");
                }
            }
        }

        // Everything must fit before the current page is torn down
        let persistent = self.page.actors().map(|(_, a)| a).filter(|a| a.flags.contains(ActorFlags::NOT_FREE));
        let (kept_actors, kept_colliders) = Page::slots_needed(persistent);
        let (new_actors, new_colliders) = Page::slots_needed(&actors);
        if kept_actors + new_actors > self.config.max_actors {
            debug!(needed = kept_actors + new_actors, capacity = self.config.max_actors, "layout does not fit");
            return Err(PageError::ActorPoolFull.into());
        }
        if kept_colliders + new_colliders > self.config.max_colliders {
            debug!(needed = kept_colliders + new_colliders, capacity = self.config.max_colliders, "layout does not fit");
            return Err(PageError::ColliderPoolFull.into());
        }

        // Persistent actors follow the book onto the new page
        for kept in self.new_page(&layout.name)? {
            debug!(actor = %kept.name, "carrying NOT_FREE actor over");
            self.page.try_link_actor(kept).map_err(|rejected| rejected.error)?;
        }
        if let Some(camera) = layout.camera {
            self.page.camera = camera;
        }

        let mut ids = Vec::with_capacity(actors.len());
        for actor in actors {
            ids.push(self.page.link_actor(actor)?);
        }
        info!(page = %layout.name, actors = ids.len(), "applied scene layout");
        Ok(ids)
    }

    // =========================================================================
    // Book files
    // =========================================================================

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BookError> {
        write_book(path, &BookData::from_page(&self.page, &self.assets))
    }

    /// Load a book file into the current page.
    ///
    /// The page name, camera and asset registry are replaced. Actor records
    /// are applied to linked actors with the same id, or failing that the
    /// same name; records with no match are returned in the data for the
    /// caller to construct.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<BookData, BookError> {
        let data = read_book(path)?;

        self.page.name = data.page_name.clone();
        if let Some(camera) = data.camera {
            self.page.camera = camera;
        }
        self.assets = data.assets.clone();

        let mut matched = 0;
        for record in &data.actors {
            let target = self
                .page
                .actors()
                .find(|(_, a)| a.id == record.id)
                .or_else(|| self.page.actors().find(|(_, a)| a.name == record.name))
                .map(|(id, _)| id);

            if let Some(actor) = target.and_then(|id| self.page.actor_mut(id)) {
                actor.id = record.id;
                actor.flags = record.flags;
                actor.active = record.active;
                actor.order_in_layer = record.order_in_layer;
                actor.transform = record.transform;
                matched += 1;
            }
        }
        debug!(records = data.actors.len(), matched, "opened book");
        Ok(data)
    }

    /// Tear down the page. Returns its `NOT_FREE` actors.
    pub fn destroy(self) -> Vec<Actor> {
        self.page.destroy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::string::BvrString;
    use crate::math::Vec3;
    use crate::scene::actor::{ActorFlags, ActorType};
    use crate::scene::layout::ActorLayout;

    #[test]
    fn test_frame_timing() {
        let mut book = Book::new(EngineConfig::default()).unwrap();
        book.new_frame(1000.0);
        book.end_frame();

        let dt = book.new_frame(1010.0);
        assert!((dt - 0.010).abs() < 0.0001);
        let wait = book.frame_delay_ms(1012.0).unwrap();
        assert!((wait - (1000.0 / 60.0 - 2.0)).abs() < 0.001);
        assert!(book.frame_delay_ms(1100.0).is_none());

        book.config.target_framerate = 0;
        assert!(book.frame_delay_ms(1010.0).is_none());
    }

    #[test]
    fn test_apply_layout_replaces_page() {
        let mut book = Book::new(EngineConfig::default()).unwrap();
        book.page.link_actor(Actor::empty("old")).unwrap();

        let mut layout = SceneLayout::new("fresh");
        let mut wall = ActorLayout::new("wall", ActorType::Dynamic);
        wall.flags = ActorFlags::DYNACTOR_PASSIVE | ActorFlags::DYNACTOR_CREATE_COLLIDER_FROM_VERTICES;
        wall.position = Vec3::new(3.0, 0.0, 0.0);
        layout.actors.push(wall);

        let ids = book.apply_layout(&layout, None).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(book.page.name.as_str(), "fresh");
        assert!(book.page.find_actor("old").is_none());
        assert_eq!(book.page.collider_count(), 1);
    }

    #[test]
    fn test_oversized_layout_keeps_current_page() {
        let config = EngineConfig { max_actors: 2, ..EngineConfig::default() };
        let mut book = Book::new(config).unwrap();
        book.page.name = BvrString::new("current");
        book.page.link_actor(Actor::empty("old")).unwrap();

        let mut layout = SceneLayout::new("too_big");
        for name in ["a", "b", "c"] {
            layout.actors.push(ActorLayout::new(name, ActorType::Empty));
        }

        let err = book.apply_layout(&layout, None).unwrap_err();
        assert!(matches!(err, LayoutError::Page(PageError::ActorPoolFull)));
        assert_eq!(book.page.name.as_str(), "current");
        assert!(book.page.find_actor("old").is_some());
        assert_eq!(book.page.actor_count(), 1);
    }

    #[test]
    fn test_layout_counts_persistent_actors() {
        let config = EngineConfig { max_actors: 2, ..EngineConfig::default() };
        let mut book = Book::new(config).unwrap();
        let mut keeper = Actor::empty("keeper");
        keeper.flags = ActorFlags::NOT_FREE;
        book.page.link_actor(keeper).unwrap();

        let mut layout = SceneLayout::new("next");
        layout.actors.push(ActorLayout::new("a", ActorType::Empty));
        book.apply_layout(&layout, None).unwrap();
        assert!(book.page.find_actor("keeper").is_some());

        layout.actors.push(ActorLayout::new("b", ActorType::Empty));
        assert!(book.apply_layout(&layout, None).is_err());
        assert_eq!(book.page.actor_count(), 2);
    }

    #[test]
    fn test_save_and_open_restores_transforms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.bvrb");

        let mut book = Book::new(EngineConfig::default()).unwrap();
        let id = book.page.link_actor(Actor::empty("marker")).unwrap();
        book.page.actor_mut(id).unwrap().transform.position = Vec3::new(9.0, 8.0, 7.0);
        book.save(&path).unwrap();

        book.page.actor_mut(id).unwrap().transform.position = Vec3::ZERO;
        let data = book.open(&path).unwrap();
        assert_eq!(data.actors.len(), 1);
        assert_eq!(book.page.actor(id).unwrap().transform.position, Vec3::new(9.0, 8.0, 7.0));
    }
}
