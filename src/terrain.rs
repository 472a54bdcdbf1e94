//! CPU reference for the snow-ground displacement field.
//!
//! The ground vertex shader evaluates the identical hash/noise/fbm chain on
//! the GPU; these functions are the testable source of truth and are also
//! used to rest procedural props on the displaced surface.

use glam::Vec2;

/// Integer-lattice hash, identical to the shader's.
fn hash(p: Vec2) -> f32 {
    fract(f32::sin(p.dot(Vec2::new(12.9898, 78.233))) * 43758.5453)
}

/// GPU-style fract: always in [0, 1), unlike `f32::fract`.
fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Value noise with `3t^2 - 2t^3` corner smoothing.
pub fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let f = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let a = hash(i);
    let b = hash(i + Vec2::new(1.0, 0.0));
    let c = hash(i + Vec2::new(0.0, 1.0));
    let d = hash(i + Vec2::new(1.0, 1.0));
    lerp(lerp(a, b, f.x), lerp(c, d, f.x), f.y)
}

/// Three-octave fractal Brownian motion: amplitude halves, frequency doubles.
pub fn fbm(mut p: Vec2) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    for _ in 0..3 {
        value += amplitude * value_noise(p);
        p *= 2.0;
        amplitude *= 0.5;
    }
    value
}

/// Raw displacement sum: large rolling dunes plus fine ripple, dunes
/// weighted heavily so the poster read stays flat.
pub fn raw_displacement(x: f32, z: f32) -> f32 {
    let p = Vec2::new(x, z);
    fbm(p * 0.28) * 1.10 + fbm(p * 1.05) * 0.07
}

/// Displacement with the center flattened so the tree and gifts rest on
/// undisturbed ground: zero within radius 1, full beyond radius 4.
pub fn displacement(x: f32, z: f32) -> f32 {
    let dist = Vec2::new(x, z).length();
    raw_displacement(x, z) * smoothstep(1.0, 4.0, dist)
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_stays_in_unit_range() {
        for i in -40..40 {
            for j in -40..40 {
                let n = value_noise(Vec2::new(i as f32 * 0.37, j as f32 * 0.29));
                assert!((0.0..=1.0).contains(&n), "noise out of range: {n}");
            }
        }
    }

    #[test]
    fn fbm_is_bounded_by_octave_sum() {
        // 0.5 + 0.25 + 0.125 = 0.875
        for i in 0..100 {
            let v = fbm(Vec2::new(i as f32 * 0.173, i as f32 * -0.091));
            assert!((0.0..=0.875).contains(&v));
        }
    }

    #[test]
    fn center_is_flat() {
        for (x, z) in [(0.0, 0.0), (0.5, 0.5), (0.9, 0.0), (0.0, -0.99)] {
            assert_eq!(displacement(x, z), 0.0, "({x}, {z}) should be flat");
        }
    }

    #[test]
    fn far_field_is_undamped() {
        for (x, z) in [(4.0, 0.0), (0.0, -8.0), (5.0, 5.0), (-12.0, 3.0)] {
            assert_eq!(displacement(x, z), raw_displacement(x, z));
        }
    }

    #[test]
    fn falloff_ramps_between_radii() {
        // Somewhere strictly inside the ramp the displacement is damped but
        // not zeroed.
        let x = 2.5;
        let raw = raw_displacement(x, 0.0);
        let damped = displacement(x, 0.0);
        assert!(damped > 0.0);
        assert!(damped < raw);
    }

    #[test]
    fn displacement_is_deterministic() {
        assert_eq!(displacement(7.3, -2.1), displacement(7.3, -2.1));
    }
}
