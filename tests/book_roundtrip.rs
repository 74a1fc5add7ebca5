//! Book files and layout files on disk.

use beauvoir::asset::{read_book, OpenMode};
use beauvoir::math::Vec3;
use beauvoir::physics::ColliderShape;
use beauvoir::scene::layout::save_layout;
use beauvoir::scene::{ActorFlags, ActorLayout, ActorType, Book, Camera, SceneLayout};
use beauvoir::EngineConfig;

fn write_mask(path: &std::path::Path) {
    // 4x4, solid bottom row and one solid column
    #[rustfmt::skip]
    let pixels = vec![
        255, 0, 0, 0,
        255, 0, 0, 0,
        255, 0, 0, 0,
        255, 255, 255, 255,
    ];
    image::GrayImage::from_raw(4, 4, pixels).unwrap().save(path).unwrap();
}

fn sample_layout() -> SceneLayout {
    let mut layout = SceneLayout::new("level_1");
    layout.camera = Some(Camera::orthographic(-10.0, 10.0, 3.0));

    let mut player = ActorLayout::new("player", ActorType::Dynamic);
    player.flags = ActorFlags::DYNACTOR_AGGRESSIVE | ActorFlags::DYNACTOR_CREATE_COLLIDER_FROM_VERTICES;
    player.position = Vec3::new(0.0, 40.0, 0.0);
    player.order_in_layer = 2;
    layout.actors.push(player);

    let mut tiles = ActorLayout::new("tiles", ActorType::Bitmap);
    tiles.flags = ActorFlags::BITMAP_CREATE_COLLIDER;
    tiles.mask = Some("mask.png".to_string());
    layout.actors.push(tiles);

    layout.actors.push(ActorLayout::new("background", ActorType::Layer));
    layout
}

#[test]
fn layout_builds_page_with_mask_collider() {
    let dir = tempfile::tempdir().unwrap();
    write_mask(&dir.path().join("mask.png"));
    let layout_path = dir.path().join("level_1.ron.br");
    save_layout(&sample_layout(), &layout_path).unwrap();

    let mut book = Book::new(EngineConfig::default()).unwrap();
    let ids = book.load_layout(&layout_path).unwrap();
    assert_eq!(ids.len(), 3);
    assert_eq!(book.page.collider_count(), 2);

    let tiles = book.page.find_actor("tiles").unwrap();
    let collider = book.page.actor(tiles).unwrap().collider().unwrap();
    assert_eq!(collider.shape(), ColliderShape::Boxes);
    // Column then the rest of the bottom row
    assert_eq!(collider.geometry().len(), 2);

    // The mask was registered as an asset
    let mask_path = dir.path().join("mask.png");
    let record = book.assets.find(&mask_path.to_string_lossy()).unwrap();
    assert_eq!(record.mode, OpenMode::Read);
}

#[test]
fn saved_book_lists_actors_and_assets() {
    let dir = tempfile::tempdir().unwrap();
    write_mask(&dir.path().join("mask.png"));

    let mut book = Book::new(EngineConfig::default()).unwrap();
    book.apply_layout(&sample_layout(), Some(dir.path())).unwrap();

    let book_path = dir.path().join("level_1.bvrb");
    book.save(&book_path).unwrap();

    let data = read_book(&book_path).unwrap();
    assert_eq!(data.page_name.as_str(), "level_1");
    assert_eq!(data.camera.unwrap().scale, 3.0);
    assert_eq!(data.assets.len(), 1);

    let names: Vec<&str> = data.actors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["player", "tiles", "background"]);
    assert_eq!(data.actors[0].actor_type, ActorType::Dynamic);
    assert_eq!(data.actors[0].order_in_layer, 2);
    assert_eq!(data.actors[0].transform.position, Vec3::new(0.0, 40.0, 0.0));
}

#[test]
fn garbage_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.bvrb");
    std::fs::write(&path, b"not a book at all").unwrap();
    assert!(read_book(&path).is_err());
}
