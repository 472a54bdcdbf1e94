use glam::Vec3;
use rand::Rng;

/// Downward fall speed in units per second.
pub const SNOW_FALL_SPEED: f32 = 0.42;
/// Height a flake respawns at once it crosses the floor threshold.
pub const SNOW_RESPAWN_HEIGHT: f32 = 15.0;
/// Flakes below this height are recycled within the same update pass.
pub const SNOW_FLOOR: f32 = -0.2;
/// Horizontal spawn extent: X and Z are drawn uniformly from [-10, 10].
pub const SNOW_SPREAD: f32 = 20.0;

pub const SNOW_COUNT: usize = 6000;
pub const FIREFLY_COUNT: usize = 30;

/// Falling snow as a fixed-size recycled particle set.
///
/// The particle count never changes after allocation; flakes that cross the
/// floor are respawned at the ceiling with fresh horizontal positions rather
/// than destroyed.
#[derive(Debug)]
pub struct SnowField {
    positions: Vec<Vec3>,
    scales: Vec<f32>,
}

impl SnowField {
    pub fn new<R: Rng>(count: usize, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut scales = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(Vec3::new(
                (rng.gen::<f32>() - 0.5) * SNOW_SPREAD,
                rng.gen::<f32>() * 20.0,
                (rng.gen::<f32>() - 0.5) * SNOW_SPREAD,
            ));
            // Bigger, more cartoonish flakes.
            scales.push(0.7 + rng.gen::<f32>() * 1.6);
        }
        Self { positions, scales }
    }

    /// Builds a field from explicit positions; scales default to 1.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        let scales = vec![1.0; positions.len()];
        Self { positions, scales }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    /// Advances every flake by `delta` seconds.
    ///
    /// Order per flake is normative: fall first, then sinusoidal X/Z drift as
    /// a function of the new height (per-particle wind variance without
    /// per-particle state), then the floor check. A flake that crosses the
    /// floor respawns in this same pass, never with a one-frame lag.
    pub fn update<R: Rng>(&mut self, delta: f32, rng: &mut R) {
        for p in &mut self.positions {
            p.y -= delta * SNOW_FALL_SPEED;
            p.x += f32::sin(p.y * 0.6) * delta * 0.25;
            p.z += f32::cos(p.y * 0.35) * delta * 0.14;

            if p.y < SNOW_FLOOR {
                p.y = SNOW_RESPAWN_HEIGHT;
                p.x = (rng.gen::<f32>() - 0.5) * SNOW_SPREAD;
                p.z = (rng.gen::<f32>() - 0.5) * SNOW_SPREAD;
            }
        }
    }
}

/// Ambient fireflies around the tree.
///
/// The position buffer is written once at allocation; all motion is
/// vertex-shader jitter driven by the shared time uniform, with amplitude and
/// phase varied per particle through the scale attribute. The update step
/// only advances time.
#[derive(Debug)]
pub struct Fireflies {
    positions: Vec<Vec3>,
    scales: Vec<f32>,
    time: f32,
}

impl Fireflies {
    pub fn new<R: Rng>(count: usize, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut scales = Vec::with_capacity(count);
        for _ in 0..count {
            positions.push(Vec3::new(
                (rng.gen::<f32>() - 0.5) * 10.0,
                rng.gen::<f32>() * 4.0 + 0.5,
                (rng.gen::<f32>() - 0.5) * 10.0,
            ));
            scales.push(rng.gen::<f32>());
        }
        Self {
            positions,
            scales,
            time: 0.0,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn update(&mut self, elapsed: f32) {
        self.time = elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn flakes_fall_at_constant_speed() {
        let mut field = SnowField::from_positions(vec![Vec3::new(0.0, 10.0, 0.0)]);
        field.update(1.0, &mut rng());
        let p = field.positions()[0];
        assert!((p.y - 9.58).abs() < 1e-5);
    }

    #[test]
    fn crossing_the_floor_respawns_in_the_same_pass() {
        let mut field = SnowField::from_positions(vec![Vec3::new(3.0, -0.19, 3.0)]);
        // -0.19 - 0.42 = -0.61 < -0.2, so the flake must already be back at
        // the ceiling after this single update.
        field.update(1.0, &mut rng());
        let p = field.positions()[0];
        assert_eq!(p.y, SNOW_RESPAWN_HEIGHT);
        assert!((-10.0..=10.0).contains(&p.x));
        assert!((-10.0..=10.0).contains(&p.z));
    }

    #[test]
    fn decrement_happens_before_the_floor_check() {
        // y = 0.05: one full-second tick brings it to -0.37, which is below
        // the floor, so it respawns. y = -0.3 was already below and respawns
        // too. y = 10 just falls.
        let mut field = SnowField::from_positions(vec![
            Vec3::new(0.0, 0.05, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, -0.3, 0.0),
        ]);
        field.update(1.0, &mut rng());
        let ys: Vec<f32> = field.positions().iter().map(|p| p.y).collect();
        assert_eq!(ys[0], SNOW_RESPAWN_HEIGHT);
        assert!((ys[1] - 9.58).abs() < 1e-5);
        assert_eq!(ys[2], SNOW_RESPAWN_HEIGHT);
    }

    #[test]
    fn count_is_fixed_across_updates() {
        let mut r = rng();
        let mut field = SnowField::new(256, &mut r);
        for _ in 0..600 {
            field.update(0.1, &mut r);
        }
        assert_eq!(field.len(), 256);
        for p in field.positions() {
            assert!(p.y >= SNOW_FLOOR - SNOW_FALL_SPEED * 0.1);
            assert!(p.y <= 20.0);
        }
    }

    #[test]
    fn drift_follows_height() {
        let mut field = SnowField::from_positions(vec![Vec3::new(1.0, 8.0, 2.0)]);
        field.update(0.5, &mut rng());
        let p = field.positions()[0];
        let y = 8.0 - 0.42 * 0.5;
        assert!((p.x - (1.0 + f32::sin(y * 0.6) * 0.5 * 0.25)).abs() < 1e-5);
        assert!((p.z - (2.0 + f32::cos(y * 0.35) * 0.5 * 0.14)).abs() < 1e-5);
    }

    #[test]
    fn fireflies_never_move_on_the_cpu() {
        let mut flies = Fireflies::new(FIREFLY_COUNT, &mut rng());
        let before = flies.positions().to_vec();
        flies.update(12.5);
        flies.update(25.0);
        assert_eq!(flies.positions(), before.as_slice());
        assert_eq!(flies.time(), 25.0);
    }

    #[test]
    fn firefly_scales_are_unit_range() {
        let flies = Fireflies::new(FIREFLY_COUNT, &mut rng());
        assert!(flies.scales().iter().all(|s| (0.0..1.0).contains(s)));
    }
}
