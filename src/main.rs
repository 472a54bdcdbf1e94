use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec3};
use log::{error, info};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use tinsel::{App, AssetBundle, CameraParams, MaterialKind, Renderer};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    if options.summary_only {
        return run_summary(&options);
    }

    match run_windowed(&options) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_summary(&options)
            } else {
                Err(err)
            }
        }
    }
}

/// Headless mode: loads the assets synchronously, prints what the scene
/// would contain, and runs the simulation for a few seconds of virtual time.
fn run_summary(options: &CliOptions) -> Result<()> {
    let mut app = App::new(options.seed, 1280, 720);
    let bundle = AssetBundle::load_dir(&options.assets);
    app.install_bundle(bundle);

    match app.tree.as_ready() {
        Some(tree) => {
            let ornaments = tree
                .parts
                .iter()
                .filter(|p| p.kind == MaterialKind::Ornament)
                .count();
            println!(
                "Loaded tree with {} parts ({} foliage, {} ornaments)",
                tree.parts.len(),
                tree.parts.len() - ornaments,
                ornaments
            );
            for part in &tree.parts {
                println!(" - {} ({})", part.name, part.kind);
            }
            println!(
                "Star seated at ({:.2}, {:.2}, {:.2})",
                tree.star_position.x, tree.star_position.y, tree.star_position.z
            );
        }
        None => println!("Tree unavailable"),
    }

    let greeting_meshes = app.greeting_meshes.as_ready().map_or(0, |m| m.len());
    println!(
        "Loaded {} greeting meshes for {} lines",
        greeting_meshes,
        app.greeting.len()
    );
    println!("Placed {} gifts", app.gifts.len());

    const FRAMES: u32 = 240;
    for frame in 1..=FRAMES {
        app.tick(frame as f32 / 60.0);
    }
    let lowest = app
        .snow
        .positions()
        .iter()
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min);
    println!(
        "Simulated {FRAMES} frames ({:.2}s): {} snowflakes airborne (lowest y={lowest:.2}), {} fireflies",
        FRAMES as f32 / 60.0,
        app.snow.len(),
        app.fireflies.positions().len()
    );
    Ok(())
}

fn run_windowed(options: &CliOptions) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title("tinsel")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let size = window.inner_size();
    let mut app = App::new(options.seed, size.width, size.height);
    app.attach_loader(AssetBundle::load_dir_background(options.assets.clone()));

    let mut renderer = block_on(Renderer::new(Arc::clone(&window), &app))?;
    info!("renderer up, surface {}x{}", size.width, size.height);

    let start = Instant::now();
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { window_id, event } if window_id == renderer.window_id() => {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => elwt.exit(),
                        WindowEvent::Resized(new_size) => {
                            app.resize(new_size.width, new_size.height);
                            renderer.resize(new_size, &app.post);
                        }
                        WindowEvent::RedrawRequested => {
                            let elapsed = start.elapsed().as_secs_f32();
                            app.tick(elapsed);
                            let camera = orbit_camera(elapsed, renderer.aspect());
                            match renderer.render(&app, &camera) {
                                Ok(()) => {}
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    let size = renderer.window().inner_size();
                                    renderer.resize(size, &app.post);
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    error!("GPU is out of memory, shutting down");
                                    elwt.exit();
                                }
                                Err(wgpu::SurfaceError::Timeout) => {
                                    info!("surface timeout; retrying next frame");
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => renderer.window().request_redraw(),
                _ => {}
            }
        })
        .context("event loop failed")?;

    Ok(())
}

/// Slow automatic orbit around the tree; no user camera controls.
fn orbit_camera(elapsed: f32, aspect: f32) -> CameraParams {
    let azimuth = elapsed * 0.05;
    let distance = 12.0;
    let position = Vec3::new(
        f32::sin(azimuth) * distance,
        4.5,
        f32::cos(azimuth) * distance,
    );
    let target = Vec3::new(0.0, 1.5, 0.0);
    let view = Mat4::look_at_rh(position, target, Vec3::Y);
    let projection = Mat4::perspective_rh(45f32.to_radians(), aspect.max(0.01), 0.1, 100.0);
    CameraParams {
        view_proj: projection * view,
        position,
    }
}

struct CliOptions {
    assets: PathBuf,
    summary_only: bool,
    seed: u64,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(assets) = args.next() else {
            return Err(anyhow!(
                "Usage: tinsel <assets-dir> [--summary-only] [--seed N]"
            ));
        };
        let mut summary_only = false;
        let mut seed = 1225;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--seed" => {
                    let value = args.next().ok_or_else(|| anyhow!("--seed needs a value"))?;
                    seed = value
                        .parse()
                        .with_context(|| format!("invalid seed: {value}"))?;
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only or --seed"
                    ));
                }
            }
        }
        Ok(Self {
            assets: PathBuf::from(assets),
            summary_only,
            seed,
        })
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}
