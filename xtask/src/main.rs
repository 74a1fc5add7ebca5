//! Developer tasks for the Beauvoir engine
//!
//! Usage:
//!   cargo xtask dump-book level.bvrb           # Print a book file's contents
//!   cargo xtask decompose-mask mask.png        # Show the boxes a mask becomes
//!   cargo xtask pack-layout in.ron out.ron.br  # Validate and compress a layout

use anyhow::{bail, Context, Result};
use beauvoir::asset::read_book;
use beauvoir::physics::mask::MAX_MASK_PIXEL_SCALE;
use beauvoir::physics::{CollisionMask, DEFAULT_MAX_MASK_RECTS};
use beauvoir::scene::layout::{load_layout, save_layout};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Developer tasks for Beauvoir")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the page, camera, actors and assets stored in a .bvrb file
    DumpBook {
        file: PathBuf,
    },
    /// Decompose a collision mask image into boxes
    DecomposeMask {
        image: PathBuf,
        /// Stop after this many boxes
        #[arg(long, default_value_t = DEFAULT_MAX_MASK_RECTS)]
        max_rects: usize,
        /// World units per mask pixel
        #[arg(long, default_value_t = 1)]
        pixel_scale: u32,
    },
    /// Validate a RON layout and re-save it brotli-compressed
    PackLayout {
        input: PathBuf,
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    beauvoir::logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpBook { file } => dump_book(&file),
        Commands::DecomposeMask { image, max_rects, pixel_scale } => decompose_mask(&image, max_rects, pixel_scale),
        Commands::PackLayout { input, output } => pack_layout(&input, &output),
    }
}

fn dump_book(file: &PathBuf) -> Result<()> {
    let data = read_book(file).with_context(|| format!("Failed to read {}", file.display()))?;

    println!("page:    {}", data.page_name);
    match &data.camera {
        Some(camera) => println!(
            "camera:  {:?} near={} far={} scale={} at ({}, {}, {})",
            camera.mode,
            camera.near,
            camera.far,
            camera.scale,
            camera.transform.position.x,
            camera.transform.position.y,
            camera.transform.position.z,
        ),
        None => println!("camera:  (none)"),
    }

    println!("actors:  {}", data.actors.len());
    for actor in &data.actors {
        let p = actor.transform.position;
        println!(
            "  {:<16} {:<8} {:?} layer={} active={} pos=({}, {}, {}) id={}",
            actor.name.as_str(),
            actor.actor_type.label(),
            actor.flags,
            actor.order_in_layer,
            actor.active,
            p.x,
            p.y,
            p.z,
            actor.id,
        );
    }

    println!("assets:  {}", data.assets.len());
    for record in data.assets.iter() {
        println!("  {} {:?} {}", record.id, record.mode, record.path);
    }
    Ok(())
}

fn decompose_mask(image: &PathBuf, max_rects: usize, pixel_scale: u32) -> Result<()> {
    if max_rects == 0 {
        bail!("--max-rects must be at least 1");
    }
    if pixel_scale == 0 || pixel_scale > MAX_MASK_PIXEL_SCALE {
        bail!("--pixel-scale must be between 1 and {}", MAX_MASK_PIXEL_SCALE);
    }
    let mask = CollisionMask::load(image).with_context(|| format!("Failed to load {}", image.display()))?;
    let decomposition = mask.decompose(max_rects);

    println!(
        "{}x{} mask, {} solid pixels, {} boxes{}",
        mask.width(),
        mask.height(),
        mask.solid_count(),
        decomposition.rects.len(),
        if decomposition.truncated { " (truncated)" } else { "" },
    );

    let bounds = mask.rects_to_bounds(&decomposition.rects, pixel_scale);
    for (rect, b) in decomposition.rects.iter().zip(&bounds) {
        println!(
            "  px ({:>3}, {:>3}) {:>3}x{:<3} -> local ({}, {}) {}x{}",
            rect.x, rect.y, rect.width, rect.height, b.coords.x, b.coords.y, b.width, b.height,
        );
    }
    Ok(())
}

fn pack_layout(input: &PathBuf, output: &PathBuf) -> Result<()> {
    let layout = load_layout(input).with_context(|| format!("Failed to load {}", input.display()))?;
    save_layout(&layout, output).with_context(|| format!("Failed to save {}", output.display()))?;
    println!("{} actors -> {}", layout.actors.len(), output.display());
    Ok(())
}
