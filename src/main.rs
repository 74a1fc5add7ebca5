//! Beauvoir collider demo
//!
//! Arrow keys push the player. It is blocked by a passive wall and by a
//! tile map whose collider is decomposed from a procedural mask.
//! F5 saves the page to `demo.bvrb`, F9 reopens it.

use beauvoir::logging::init_logging;
use beauvoir::math::{mat4_mul, mat4_transform_point, Mat4, Vec3};
use beauvoir::physics::{CollisionMask, MaskError};
use beauvoir::render::{MeshData, Renderer, ShaderHandle, TextureHandle};
use beauvoir::scene::{Actor, ActorDesc, ActorFlags, ActorId, ActorType, Book, Camera, ColliderLink, PageError};
use beauvoir::{EngineConfig, VERSION};
use macroquad::prelude::*;
use tracing::{error, info, warn};

const BOOK_PATH: &str = "demo.bvrb";
const CONFIG_PATH: &str = "beauvoir.ron";

const MAP_WIDTH: u32 = 48;
const MAP_HEIGHT: u32 = 30;
/// World units per second at full push
const PLAYER_SPEED: f32 = 12.0;

const SHADER_PLAYER: ShaderHandle = ShaderHandle(1);
const SHADER_WALL: ShaderHandle = ShaderHandle(2);
const SHADER_TILES: ShaderHandle = ShaderHandle(3);

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Beauvoir v{}", VERSION),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Floor, two side walls, and a few platforms. Row 0 is the top.
fn tile_mask() -> Result<CollisionMask, MaskError> {
    let (w, h) = (MAP_WIDTH, MAP_HEIGHT);
    let mut pixels = vec![0u8; (w * h) as usize];
    let mut fill = |x0: u32, y0: u32, x1: u32, y1: u32| {
        for y in y0..y1.min(h) {
            for x in x0..x1.min(w) {
                pixels[(y * w + x) as usize] = 255;
            }
        }
    };
    fill(0, h - 2, w, h);
    fill(0, 0, 1, h);
    fill(w - 1, 0, w, h);
    fill(6, 20, 16, 22);
    fill(30, 14, 42, 16);
    fill(20, 8, 24, 18);
    CollisionMask::from_raw(w, h, pixels)
}

struct Demo {
    book: Book,
    player: Option<ActorId>,
    status: String,
}

impl Demo {
    fn new(config: EngineConfig) -> Result<Self, PageError> {
        let book = Book::new(config)?;
        let mut demo = Self { book, player: None, status: String::new() };
        demo.build_page();
        Ok(demo)
    }

    fn build_page(&mut self) {
        if let Err(e) = self.book.new_page("collider_test") {
            error!("failed to reset page: {}", e);
            return;
        }
        self.book.page.camera = Camera::orthographic(-10.0, 10.0, 16.0);

        let settings = self.book.mask_settings();
        let mut actors = vec![
            Actor::new(
                ActorDesc::new("player", ActorType::Dynamic)
                    .flags(ActorFlags::DYNACTOR_AGGRESSIVE | ActorFlags::DYNACTOR_CREATE_COLLIDER_FROM_VERTICES)
                    .mesh(MeshData::quad_2d(1.0, 1.0))
                    .shader(SHADER_PLAYER)
                    .position(Vec3::new(-12.0, 0.0, 0.0))
                    .order(2),
            ),
            Actor::new(
                ActorDesc::new("wall", ActorType::Dynamic)
                    .flags(ActorFlags::DYNACTOR_PASSIVE | ActorFlags::DYNACTOR_CREATE_COLLIDER_FROM_VERTICES)
                    .mesh(MeshData::quad_2d(2.0, 4.0))
                    .shader(SHADER_WALL)
                    .position(Vec3::new(6.0, -8.0, 0.0))
                    .order(1),
            ),
        ];
        match tile_mask() {
            Ok(mask) => actors.push(Actor::new(
                ActorDesc::new("tiles", ActorType::Bitmap)
                    .flags(ActorFlags::BITMAP_CREATE_COLLIDER)
                    .shader(SHADER_TILES)
                    .mask(mask, settings),
            )),
            Err(e) => error!("tile mask: {}", e),
        }

        self.player = None;
        for actor in actors {
            let name = actor.name.to_string();
            match self.book.page.link_actor(actor) {
                Ok(id) if name == "player" => self.player = Some(id),
                Ok(_) => {}
                Err(e) => warn!(actor = %name, "could not link actor: {}", e),
            }
        }
        info!(
            actors = self.book.page.actor_count(),
            colliders = self.book.page.collider_count(),
            "demo page ready"
        );
    }

    fn handle_input(&mut self, dt: f32) {
        let mut push = Vec3::ZERO;
        if is_key_down(KeyCode::Left) {
            push.x -= 1.0;
        }
        if is_key_down(KeyCode::Right) {
            push.x += 1.0;
        }
        if is_key_down(KeyCode::Up) {
            push.y += 1.0;
        }
        if is_key_down(KeyCode::Down) {
            push.y -= 1.0;
        }
        if !push.is_zero() {
            let step = push.normalize().scale(PLAYER_SPEED * dt);
            if let Some(player) = self.player.and_then(|id| self.book.page.actor_mut(id)) {
                player.add_force(step.x, step.y, step.z);
            }
        }

        if is_key_pressed(KeyCode::F5) {
            self.status = match self.book.save(BOOK_PATH) {
                Ok(()) => format!("saved {}", BOOK_PATH),
                Err(e) => {
                    error!("save failed: {}", e);
                    format!("save failed: {}", e)
                }
            };
        }
        if is_key_pressed(KeyCode::F9) {
            self.status = match self.book.open(BOOK_PATH) {
                Ok(data) => format!("opened {} ({} actors)", BOOK_PATH, data.actors.len()),
                Err(e) => {
                    error!("open failed: {}", e);
                    format!("open failed: {}", e)
                }
            };
        }
        if is_key_pressed(KeyCode::R) {
            self.build_page();
            self.status = "page rebuilt".to_string();
        }
    }

    fn view_projection(&self) -> Mat4 {
        let camera = &self.book.page.camera;
        mat4_mul(&camera.projection(screen_width(), screen_height()), &camera.view())
    }

    fn draw_collider_outlines(&self, view_projection: &Mat4) {
        let page = &self.book.page;
        for (id, link) in page.colliders() {
            let (Some(collider), Some(origin)) = (page.collider(id), page.collider_position(id)) else {
                continue;
            };
            let color = if !collider.body.mode.is_enabled() {
                GRAY
            } else if collider.body.mode.is_aggressive() {
                YELLOW
            } else {
                SKYBLUE
            };
            let thickness = if matches!(link, ColliderLink::Standalone(_)) { 1.0 } else { 2.0 };
            for bounds in collider.geometry() {
                let rect = bounds.world_rect(origin, Vec3::ZERO);
                let a = to_screen(view_projection, Vec3::new(rect.x, rect.top(), 0.0));
                let b = to_screen(view_projection, Vec3::new(rect.right(), rect.y, 0.0));
                draw_rectangle_lines(a.x, a.y, b.x - a.x, b.y - a.y, thickness, color);
            }
        }
    }

    fn draw_hierarchy(&self) {
        let page = &self.book.page;
        let x = 12.0;
        let mut y = 22.0;
        let mut line = |text: &str, color: Color| {
            draw_text(text, x, y, 18.0, color);
            y += 18.0;
        };

        line(&format!("page: {}", page.name), WHITE);
        line(
            &format!(
                "actors {}/{}  colliders {}/{}",
                page.actor_count(),
                page.actor_capacity(),
                page.collider_count(),
                page.collider_capacity()
            ),
            LIGHTGRAY,
        );
        for (id, actor) in page.actors() {
            let boxes = actor.collider().map(|c| c.geometry().len()).unwrap_or(0);
            let p = actor.transform.position;
            line(
                &format!(
                    "  [{}] {} {} ({:.1}, {:.1}) boxes={}",
                    id.index(),
                    actor.actor_type().label(),
                    actor.name,
                    p.x,
                    p.y,
                    boxes
                ),
                if actor.active { WHITE } else { GRAY },
            );
        }
        line(&format!("dt {:.1} ms", self.book.delta_time() * 1000.0), LIGHTGRAY);
        if !self.status.is_empty() {
            line(&self.status, GREEN);
        }
        line("arrows: move  F5: save  F9: open  R: rebuild", DARKGRAY);
    }
}

/// Fills meshes as flat triangles, projected through the page camera.
struct MacroquadRenderer {
    view_projection: Mat4,
}

impl MacroquadRenderer {
    fn shader_color(shader: ShaderHandle) -> Color {
        match shader {
            SHADER_PLAYER => ORANGE,
            SHADER_WALL => Color::new(0.35, 0.45, 0.6, 1.0),
            SHADER_TILES => Color::new(0.2, 0.2, 0.25, 0.35),
            _ => PINK,
        }
    }
}

impl Renderer for MacroquadRenderer {
    fn draw_mesh(&mut self, mesh: &MeshData, shader: ShaderHandle, _texture: Option<TextureHandle>, model: &Mat4) {
        let mvp = mat4_mul(&self.view_projection, model);
        let stride = mesh.layout.stride();
        let components = mesh.layout.position_components();
        let position = |index: u32| -> Option<Vec2> {
            let start = index as usize * stride;
            let v = mesh.vertices.get(start..start + components)?;
            let world = if components == 2 {
                Vec3::new(v[0], v[1], 0.0)
            } else {
                Vec3::new(v[0], v[1], v[2])
            };
            Some(to_screen(&mvp, world))
        };

        let color = Self::shader_color(shader);
        for tri in mesh.indices.chunks_exact(3) {
            if let (Some(a), Some(b), Some(c)) = (position(tri[0]), position(tri[1]), position(tri[2])) {
                draw_triangle(a, b, c, color);
            }
        }
    }
}

/// Clip space to window pixels, y down.
fn to_screen(m: &Mat4, p: Vec3) -> Vec2 {
    let ndc = mat4_transform_point(m, p);
    vec2(
        (ndc.x + 1.0) * 0.5 * screen_width(),
        (1.0 - ndc.y) * 0.5 * screen_height(),
    )
}

fn load_config() -> EngineConfig {
    match EngineConfig::load(CONFIG_PATH) {
        Ok(config) => {
            info!("loaded {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            info!("using default config ({})", e);
            EngineConfig::default()
        }
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    init_logging();

    let mut demo = match Demo::new(load_config()) {
        Ok(demo) => demo,
        Err(e) => {
            error!("cannot start: {}", e);
            return;
        }
    };

    loop {
        let dt = demo.book.new_frame(get_time() * 1000.0);

        demo.handle_input(dt);
        let report = demo.book.step();
        for contact in &report.blocked {
            tracing::trace!(mover = ?contact.mover, other = ?contact.other, "blocked");
        }

        clear_background(Color::new(0.08, 0.08, 0.1, 1.0));
        let view_projection = demo.view_projection();
        let mut renderer = MacroquadRenderer { view_projection };
        demo.book.draw(&mut renderer);
        demo.draw_collider_outlines(&view_projection);
        demo.draw_hierarchy();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(delay) = demo.book.frame_delay_ms(get_time() * 1000.0) {
            std::thread::sleep(std::time::Duration::from_secs_f64(delay / 1000.0));
        }
        demo.book.end_frame();

        next_frame().await;
    }
}
