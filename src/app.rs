use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::assets::AssetBundle;
use crate::clock::{FrameClock, FrameTime};
use crate::greeting::{default_greeting, pulse, GreetingLine, TextPulse};
use crate::obj::MeshData;
use crate::particles::{Fireflies, SnowField, FIREFLY_COUNT, SNOW_COUNT};
use crate::post::PostChain;
use crate::scene::{assemble_tree, gift_placements, GiftPlacement, Lifecycle, TreeScene};

/// Top-level engine context. Constructed exactly once by the entry point and
/// passed by reference to the renderer; there is no ambient global instance.
///
/// Everything time-dependent is advanced by [`App::tick`] in a fixed order:
/// clock, asset arrival, snow, fireflies, greeting pulses, stylization time.
/// All mutation happens inside the tick; no component runs out of order or
/// skips a frame.
pub struct App {
    clock: FrameClock,
    rng: ChaCha8Rng,
    pub snow: SnowField,
    pub fireflies: Fireflies,
    pub gifts: Vec<GiftPlacement>,
    pub greeting: Vec<GreetingLine>,
    pub pulses: Vec<TextPulse>,
    pub tree: Lifecycle<TreeScene>,
    pub greeting_meshes: Lifecycle<HashMap<String, MeshData>>,
    pub post: PostChain,
    assets: Option<Receiver<AssetBundle>>,
}

impl App {
    pub fn new(seed: u64, width: u32, height: u32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let snow = SnowField::new(SNOW_COUNT, &mut rng);
        let fireflies = Fireflies::new(FIREFLY_COUNT, &mut rng);
        Self {
            clock: FrameClock::new(),
            rng,
            snow,
            fireflies,
            gifts: gift_placements(),
            greeting: default_greeting(),
            pulses: Vec::new(),
            tree: Lifecycle::NotLoaded,
            greeting_meshes: Lifecycle::NotLoaded,
            post: PostChain::new(width, height),
            assets: None,
        }
    }

    /// Hooks up the background asset loader. Components stay `Loading` until
    /// the bundle arrives; the render loop keeps running regardless.
    pub fn attach_loader(&mut self, receiver: Receiver<AssetBundle>) {
        self.tree = Lifecycle::Loading;
        self.greeting_meshes = Lifecycle::Loading;
        self.assets = Some(receiver);
    }

    /// Installs an already-loaded bundle (synchronous paths: tests, summary
    /// mode).
    pub fn install_bundle(&mut self, bundle: AssetBundle) {
        self.tree = match bundle.tree {
            Some(meshes) => Lifecycle::Ready(assemble_tree(meshes, &mut self.rng)),
            None => Lifecycle::NotLoaded,
        };
        self.greeting_meshes = if bundle.greetings.is_empty() {
            Lifecycle::NotLoaded
        } else {
            Lifecycle::Ready(bundle.greetings)
        };
    }

    fn poll_assets(&mut self) {
        let Some(receiver) = &self.assets else {
            return;
        };
        match receiver.try_recv() {
            Ok(bundle) => {
                self.install_bundle(bundle);
                self.assets = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                // Loader died without delivering; mark the components absent
                // so the loop stops waiting on them.
                self.tree = Lifecycle::NotLoaded;
                self.greeting_meshes = Lifecycle::NotLoaded;
                self.assets = None;
            }
        }
    }

    /// Advances one frame. `elapsed` is seconds from the external monotonic
    /// time source, the sole input driving all animation.
    pub fn tick(&mut self, elapsed: f32) -> FrameTime {
        let frame = self.clock.tick(elapsed);
        self.poll_assets();

        // Gift and tree materials are time-invariant; their slots in the
        // update order are the shared frame time the renderer uploads.
        self.snow.update(frame.delta, &mut self.rng);
        self.fireflies.update(frame.elapsed);

        if self.greeting_meshes.is_ready() {
            self.pulses.clear();
            for (index, line) in self.greeting.iter().enumerate() {
                self.pulses
                    .push(pulse(frame.elapsed, index, line.style.base_intensity));
            }
        }

        self.post.set_time(frame.elapsed);
        frame
    }

    /// Propagates a viewport change to every resolution-dependent consumer
    /// before the next frame renders.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.post.resize(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obj::NamedMesh;
    use std::sync::mpsc;

    fn triangle(name: &str) -> NamedMesh {
        NamedMesh {
            name: name.to_string(),
            mesh: MeshData {
                vertices: vec![
                    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                    0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
                ],
                indices: vec![0, 1, 2],
            },
        }
    }

    #[test]
    fn tick_advances_every_component() {
        let mut app = App::new(1, 800, 600);
        let before = app.snow.positions()[0];
        let frame = app.tick(0.5);
        assert_eq!(frame.elapsed, 0.5);
        assert_ne!(app.snow.positions()[0], before);
        assert_eq!(app.fireflies.time(), 0.5);
        assert_eq!(app.post.stylize.time, 0.5);
    }

    #[test]
    fn greeting_pulses_wait_for_meshes() {
        let mut app = App::new(1, 800, 600);
        app.tick(1.0);
        assert!(app.pulses.is_empty());

        let mut bundle = AssetBundle::default();
        bundle.greetings.insert("greeting_0".into(), MeshData::default());
        app.install_bundle(bundle);
        app.tick(2.0);
        assert_eq!(app.pulses.len(), app.greeting.len());
    }

    #[test]
    fn bundle_arrival_flips_lifecycle() {
        let mut app = App::new(1, 800, 600);
        let (tx, rx) = mpsc::channel();
        app.attach_loader(rx);
        assert!(matches!(app.tree, Lifecycle::Loading));

        let bundle = AssetBundle {
            tree: Some(vec![triangle("trunk")]),
            greetings: HashMap::new(),
        };
        tx.send(bundle).unwrap();
        app.tick(0.1);
        assert!(app.tree.is_ready());
        assert!(matches!(app.greeting_meshes, Lifecycle::NotLoaded));
    }

    #[test]
    fn dead_loader_marks_components_absent() {
        let mut app = App::new(1, 800, 600);
        let (tx, rx) = mpsc::channel::<AssetBundle>();
        app.attach_loader(rx);
        drop(tx);
        app.tick(0.1);
        assert!(matches!(app.tree, Lifecycle::NotLoaded));
        // The loop keeps ticking fine without the optional components.
        app.tick(0.2);
    }

    #[test]
    fn resize_reaches_the_post_chain() {
        let mut app = App::new(1, 800, 600);
        app.resize(1024, 768);
        assert_eq!(app.post.stylize.resolution.x, 1024.0);
        assert_eq!(app.post.vignette.resolution.y, 768.0);
    }

    #[test]
    fn delta_clamp_survives_stalls() {
        let mut app = App::new(1, 800, 600);
        app.tick(0.0);
        let frame = app.tick(100.0);
        assert_eq!(frame.delta, crate::clock::MAX_DELTA);
    }
}
