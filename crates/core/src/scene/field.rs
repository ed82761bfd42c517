use std::f32::consts::TAU;

use folio_protocol::{CardPlacement, Color, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SceneTuning;

/// Hue range of the particle colors (blue).
const HUE: std::ops::Range<f32> = 0.60..0.65;
const SATURATION: f32 = 0.8;
const LIGHTNESS: std::ops::Range<f32> = 0.5..0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleField {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Color>,
}

/// Scatter `count` particles uniformly in a cube of edge `spread` centred on
/// the origin. The same seed always gives the same field.
pub fn particle_field(count: u32, spread: f32, seed: u64) -> ParticleField {
    let mut rng = StdRng::seed_from_u64(seed);
    let half = spread / 2.0;
    let mut positions = Vec::with_capacity(count as usize);
    let mut colors = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let mut axis = || {
            if half > 0.0 {
                rng.gen_range(-half..half)
            } else {
                0.0
            }
        };
        positions.push(Vec3::new(axis(), axis(), axis()));
        let hue = rng.gen_range(HUE);
        let lightness = rng.gen_range(LIGHTNESS);
        colors.push(Color::from_hsl(hue, SATURATION, lightness));
    }

    ParticleField { positions, colors }
}

/// Place `count` cards evenly on a horizontal circle, each turned to face
/// the centre.
pub fn card_layout(count: usize, radius: f32) -> Vec<CardPlacement> {
    (0..count)
        .map(|i| {
            let angle = TAU * i as f32 / count as f32;
            let (sin, cos) = angle.sin_cos();
            let position = glam::Vec3::new(cos, 0.0, sin) * radius;
            CardPlacement {
                index: i as u32,
                position: to_vec3(position),
                rotation_y: -angle,
            }
        })
        .collect()
}

/// Bobbing offset and sway of card `index` at `time` seconds.
///
/// Each card runs the same sine motion, phase-shifted by its position on
/// the ring so neighbours never move in lockstep.
pub fn card_float(time: f32, index: u32, count: usize, tuning: &SceneTuning) -> (Vec3, Vec3) {
    let phase = if count > 0 {
        TAU * index as f32 / count as f32
    } else {
        0.0
    };
    let t = (time + phase) / 4.0 * tuning.float_speed;
    let offset = glam::Vec3::Y * (t.sin() / 10.0) * tuning.float_intensity;
    let rotation = glam::Vec3::new(t.cos() / 8.0, t.sin() / 8.0, t.sin() / 20.0)
        * tuning.rotation_intensity;
    (to_vec3(offset), to_vec3(rotation))
}

fn to_vec3(v: glam::Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}
