use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::palette::rgb;

/// Visual style of a greeting line: surface tint, emissive color, and the
/// emissive intensity the glow pulses around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreetingStyle {
    pub color: Vec3,
    pub emissive: Vec3,
    pub base_intensity: f32,
}

/// One line of floating text. Content configuration data, not behavior: the
/// renderer looks up the pre-extruded mesh by `mesh` name and animates it
/// with [`pulse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetingLine {
    pub text: String,
    /// Asset name of the extruded text mesh (`<mesh>.obj` in the asset dir).
    pub mesh: String,
    pub size: f32,
    pub base_y: f32,
    pub z: f32,
    pub style: GreetingStyle,
}

/// The active greeting configuration. Exactly one is live at a time.
pub fn default_greeting() -> Vec<GreetingLine> {
    let gold = GreetingStyle {
        color: Vec3::ONE,
        emissive: rgb(0xffd700),
        base_intensity: 1.2,
    };
    let rose = GreetingStyle {
        color: rgb(0xff8888),
        emissive: rgb(0xff3366),
        base_intensity: 1.0,
    };
    let ice = GreetingStyle {
        color: Vec3::ONE,
        emissive: rgb(0xaaddff),
        base_intensity: 0.9,
    };

    let line = |text: &str, mesh: &str, size: f32, base_y: f32, style: GreetingStyle| GreetingLine {
        text: text.to_string(),
        mesh: mesh.to_string(),
        size,
        base_y,
        z: -2.5,
        style,
    };

    vec![
        line("Merry Christmas", "greeting_0", 0.8, 5.0, gold),
        line("Happy New Year", "greeting_1", 0.65, 4.0, rose),
        line("warm wishes", "greeting_2", 0.32, 3.2, ice),
        line("from our home to yours", "greeting_3", 0.32, 2.85, ice),
        line("may all good things find you", "greeting_4", 0.25, 2.4, ice),
    ]
}

/// Per-frame animation state for one greeting line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPulse {
    pub y_offset: f32,
    pub yaw: f32,
    pub roll: f32,
    pub scale: f32,
    pub emissive_intensity: f32,
}

/// Floating/pulsing animation, a pure function of elapsed time and line
/// index. Lines are phase-shifted by 0.7 per index so they do not bob in
/// lockstep.
pub fn pulse(elapsed: f32, index: usize, base_intensity: f32) -> TextPulse {
    let offset = index as f32 * 0.7;
    TextPulse {
        y_offset: f32::sin(elapsed * 0.8 + offset) * 0.08,
        yaw: f32::sin(elapsed * 0.5 + offset) * 0.08,
        roll: f32::sin(elapsed * 0.4 + offset) * 0.02,
        scale: 1.0 + f32::sin(elapsed * 1.5 + offset) * 0.05,
        emissive_intensity: base_intensity + f32::sin(elapsed * 2.0 + offset) * 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_greeting_has_one_active_configuration() {
        let lines = default_greeting();
        assert_eq!(lines.len(), 5);
        // Mesh names are distinct so asset lookup is unambiguous.
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.mesh, format!("greeting_{i}"));
            assert_eq!(line.z, -2.5);
        }
    }

    #[test]
    fn pulse_at_time_zero_is_phase_only() {
        let p = pulse(0.0, 0, 1.2);
        assert_eq!(p.y_offset, 0.0);
        assert_eq!(p.yaw, 0.0);
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.emissive_intensity, 1.2);
    }

    #[test]
    fn pulse_amplitudes_are_bounded() {
        for i in 0..5 {
            let mut t = 0.0f32;
            while t < 20.0 {
                let p = pulse(t, i, 1.0);
                assert!(p.y_offset.abs() <= 0.08 + 1e-6);
                assert!(p.yaw.abs() <= 0.08 + 1e-6);
                assert!(p.roll.abs() <= 0.02 + 1e-6);
                assert!((p.scale - 1.0).abs() <= 0.05 + 1e-6);
                assert!((p.emissive_intensity - 1.0).abs() <= 0.3 + 1e-6);
                t += 0.37;
            }
        }
    }

    #[test]
    fn lines_are_phase_shifted() {
        let a = pulse(1.0, 0, 1.0);
        let b = pulse(1.0, 1, 1.0);
        assert_ne!(a.y_offset, b.y_offset);
    }
}
