mod scenario;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kestrel_assets::{FrameSequence, MeshData, MeshLibrary, ObjModel, load_sequence};
use kestrel_ecs::{Animator, MeshComponent, World};
use kestrel_kernel::{Engine, EngineConfig};
use kestrel_render::{FrameRenderer, RecordingRenderer};
use kestrel_tools::{PassTimings, SceneInspector};
use scenario::DropGame;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kestrel-cli", about = "Headless tools for the kestrel engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version, crate info and the effective config
    Info,
    /// Drop a sphere onto the ground and report where it settles
    Drop {
        /// Start height of the sphere centre
        #[arg(long, default_value = "5.0")]
        height: f32,
        /// Sphere radius
        #[arg(long, default_value = "0.5")]
        radius: f32,
        /// Simulated seconds
        #[arg(short, long, default_value = "3.0")]
        seconds: f32,
        /// Frame delta in seconds; need not match the fixed step
        #[arg(long, default_value = "0.016666668")]
        dt: f32,
        /// Produce collision debug lines every frame
        #[arg(long)]
        debug_draw: bool,
    },
    /// Parse an OBJ file and print its geometry
    Mesh {
        path: PathBuf,
    },
    /// Load a numbered OBJ sequence and play it back
    Anim {
        /// Path and file prefix, e.g. `models/frog/hop_`
        prefix: String,
        #[arg(long, default_value = "1")]
        start: u32,
        #[arg(long)]
        end: u32,
        #[arg(long, default_value = "3")]
        padding: usize,
        #[arg(long, default_value = "24.0")]
        fps: f32,
        /// Play once and stop on the last frame
        #[arg(long)]
        once: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("kestrel-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {}", kestrel_kernel::crate_info());
            println!("ecs: {}", kestrel_ecs::crate_info());
            println!("physics: {}", kestrel_physics::crate_info());
            println!("render: {}", kestrel_render::crate_info());
            println!("render-wgpu: {}", kestrel_render_wgpu::crate_info());
            println!("assets: {}", kestrel_assets::crate_info());
            println!("input: {}", kestrel_input::crate_info());
            println!("tools: {}", kestrel_tools::crate_info());
            println!("common: {}", kestrel_common::crate_info());
            println!("{}", config.to_json()?);
        }
        Commands::Drop {
            height,
            radius,
            seconds,
            dt,
            debug_draw,
        } => run_drop(config, height, radius, seconds, dt, debug_draw)?,
        Commands::Mesh { path } => {
            let model = ObjModel::load(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            let mesh = MeshData::from_obj(mesh_name(&path), &model);
            let (min, max) = bounds(&mesh);
            println!("Mesh '{}'", mesh.name);
            println!(
                "  positions={} normals={} uvs={} triangles={}",
                model.positions.len(),
                model.normals.len(),
                model.uvs.len(),
                model.triangle_count()
            );
            println!("  vertices={}", mesh.vertex_count());
            println!(
                "  bounds (z-up): ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
                min.x, min.y, min.z, max.x, max.y, max.z
            );
        }
        Commands::Anim {
            prefix,
            start,
            end,
            padding,
            fps,
            once,
        } => run_anim(prefix, start, end, padding, fps, once)?,
    }

    Ok(())
}

fn mesh_name(path: &std::path::Path) -> String {
    kestrel_assets::mesh_name_for(&path.to_string_lossy())
}

fn bounds(mesh: &MeshData) -> (glam::Vec3, glam::Vec3) {
    mesh.vertices.iter().fold(
        (glam::Vec3::splat(f32::MAX), glam::Vec3::splat(f32::MIN)),
        |(min, max), v| {
            let p = glam::Vec3::from_array(v.position);
            (min.min(p), max.max(p))
        },
    )
}

fn run_drop(
    config: EngineConfig,
    height: f32,
    radius: f32,
    seconds: f32,
    dt: f32,
    debug_draw: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(dt > 0.0, "dt must be positive");
    let frames = (seconds / dt).ceil() as u64;
    let mut renderer = RecordingRenderer::new(config.render.clone()).with_history(1);
    let mut timings = PassTimings::new(frames.max(1) as u32);
    let mut game = DropGame::new(height, radius);
    game.debug_draw = debug_draw;
    let mut engine = Engine::new(config, game);

    println!("Drop: height={height} radius={radius} frames={frames} dt={dt}");
    let mut steps = 0;
    let mut contacts = 0;
    for frame in 0..frames {
        let start = Instant::now();
        let report = engine.frame(dt, Some(&mut renderer as &mut dyn FrameRenderer));
        let elapsed = start.elapsed();
        if let Some(outcome) = &report.rendered {
            for pass in &outcome.passes {
                timings.record(*pass, elapsed / outcome.passes.len() as u32);
            }
        }
        if let Some(average) = timings.end_frame() {
            println!("{average}");
        }
        steps += report.fixed_steps;
        contacts += report.contacts;

        let sample = engine.game().sample(engine.context());
        if frame % 30 == 0 {
            if let Some(s) = sample {
                println!(
                    "  frame {frame:>4}: z={:.3} vz={:.3} grounded={}",
                    s.z, s.velocity_z, s.grounded
                );
            }
        }
    }

    let cx = engine.context();
    let scene = cx.scene().context("drop scene not loaded")?;
    let sample = engine
        .game()
        .sample(cx)
        .context("ball missing from scene")?;
    println!("{}", SceneInspector::summary(scene.world(), Some(scene.collision())));
    println!(
        "Settled: z={:.3} (expected {:.3}) grounded={} impacts={} steps={steps} contacts={contacts}",
        sample.z,
        radius,
        sample.grounded,
        engine.game().impacts.get()
    );
    if let Some(frame) = renderer.last() {
        println!(
            "Last frame: passes={:?} draws={} debug_lines={}",
            frame.passes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            frame.draws.len(),
            frame.debug_lines
        );
    }
    engine.shutdown();
    Ok(())
}

fn run_anim(
    prefix: String,
    start: u32,
    end: u32,
    padding: usize,
    fps: f32,
    once: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(end >= start, "end frame {end} is before start frame {start}");
    let mut sequence = FrameSequence::new("clip", prefix, start, end);
    sequence.padding = padding;
    sequence.frame_rate = fps;
    sequence.looping = !once;

    let mut meshes = MeshLibrary::new();
    let clip = load_sequence(&mut meshes, &sequence);
    anyhow::ensure!(!clip.frames.is_empty(), "no frames could be loaded");
    println!(
        "Clip '{}': {} frames at {} fps ({:.2}s, looping={})",
        clip.name,
        clip.frames.len(),
        clip.frame_rate,
        clip.duration(),
        clip.looping
    );

    let mut world = World::new();
    let actor = world.create_object("actor");
    world.insert(actor, MeshComponent::new(clip.frames[0].clone()));
    let mut animator = Animator::new();
    animator.add_clip(clip.clone());
    world.insert(actor, animator);
    world.play_animation(actor, "clip", true);

    let step = 1.0 / 60.0;
    let ticks = ((clip.duration() * 1.5) / step).ceil() as u32;
    let mut last = String::new();
    for tick in 0..=ticks {
        if tick > 0 {
            world.update_animators(step);
        }
        let Some(mesh) = world.get::<MeshComponent>(actor) else {
            break;
        };
        if mesh.mesh != last {
            let vertices = meshes.get_by_name(&mesh.mesh).map_or(0, MeshData::vertex_count);
            println!("  t={:.3}s -> {} ({vertices} vertices)", tick as f32 * step, mesh.mesh);
            last = mesh.mesh.clone();
        }
    }
    let playing = world
        .get::<Animator>(actor)
        .is_some_and(Animator::is_playing);
    println!("Playing after {:.2}s: {playing}", ticks as f32 * step);
    Ok(())
}
