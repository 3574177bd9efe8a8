//! Butterflies wandering around the origin with flapping wings.
//!
//! All butterflies of the flow share one loaded [`Model`] and are drawn in a
//! single instanced call. The wing angles travel in the instance `params`.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Rotation3, Vector3};
use instant::Duration;
use rand::{Rng, rngs::StdRng};
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::{ButterflyConfig, SceneConfig},
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::Model,
    },
    entities::{mk_instance_buffer, scene_rng, write_instances},
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::{Instanced, Render},
    resources::{self, ModelLoadOptions, obj::ObjLoadOptions},
};

const WING_SPEED: f32 = 5.0;
const FLIGHT_SPEED: f32 = 0.5;
const WING_AMPLITUDE: f32 = 0.2;
/// Seconds of straight flight before a turn becomes possible.
const TURN_DELAY: f32 = 3.0;
const TURN_CHANCE: f32 = 0.05;
const TURN_STRENGTH: f32 = 0.3;
const BOUNDARY: f32 = 10.0;
const MIN_HEIGHT: f32 = 0.5;
const MAX_HEIGHT: f32 = 5.0;
const SPAWN_HEIGHT: f32 = 1.5;
/// Model-space half width of the body. Vertices further out belong to a wing.
const BODY_HALF_WIDTH: f32 = 10.0;
const INSTANCE_LABEL: &str = "Butterfly Instance Buffer";

#[derive(Clone, Debug, PartialEq)]
pub struct Butterfly {
    pub position: Vector3<f32>,
    /// Unit flight direction.
    pub direction: Vector3<f32>,
    pub wing_angle: f32,
    pub wing_speed: f32,
    pub flight_speed: f32,
    pub scale: f32,
    pub time_since_turn: f32,
}

/// A random unit vector in the XZ plane.
pub fn random_direction(rng: &mut impl Rng) -> Vector3<f32> {
    let angle = rng.random_range(-1.0f32..1.0) * TAU;
    Vector3::new(angle.cos(), 0.0, angle.sin())
}

impl Butterfly {
    pub fn new(position: Vector3<f32>, direction: Vector3<f32>, scale: f32) -> Self {
        Self {
            position,
            direction,
            wing_angle: 0.0,
            wing_speed: WING_SPEED,
            flight_speed: FLIGHT_SPEED,
            scale,
            time_since_turn: 0.0,
        }
    }

    /// Places butterfly `index` of `count` on a widening ring around the origin.
    pub fn spawn(index: usize, count: usize, scale: f32, rng: &mut impl Rng) -> Self {
        let angle = index as f32 / count.max(1) as f32 * TAU;
        let radius = 3.0 + 2.0 * index as f32;
        let position = Vector3::new(angle.sin() * radius, SPAWN_HEIGHT, angle.cos() * radius);
        Self::new(position, random_direction(rng), scale)
    }

    pub fn update(&mut self, dt: f32, rng: &mut impl Rng) {
        self.position += self.direction * self.flight_speed * dt;
        self.wing_angle += self.wing_speed * dt;

        self.time_since_turn += dt;
        if self.time_since_turn > TURN_DELAY && rng.random::<f32>() < TURN_CHANCE {
            self.direction = (self.direction + random_direction(rng) * TURN_STRENGTH).normalize();
            self.time_since_turn = 0.0;
        }

        if self.position.x.abs() > BOUNDARY || self.position.z.abs() > BOUNDARY {
            self.direction = Vector3::new(-self.position.x, 0.0, -self.position.z).normalize();
        }

        if self.position.y < MIN_HEIGHT {
            self.position.y = MIN_HEIGHT;
            self.direction.y = self.direction.y.abs();
        } else if self.position.y > MAX_HEIGHT {
            self.position.y = MAX_HEIGHT;
            self.direction.y = -self.direction.y.abs();
        }
    }

    /// Left and right wing rotation in radians, half a beat apart.
    pub fn wing_angles(&self) -> (f32, f32) {
        (
            WING_AMPLITUDE * self.wing_angle.sin(),
            WING_AMPLITUDE * (self.wing_angle + PI).sin(),
        )
    }

    /// `T(position) * R_y(180 deg) * S(scale)` with the wing angles attached.
    pub fn to_instance(&self) -> Instance {
        let (left, right) = self.wing_angles();
        Instance {
            position: self.position,
            rotation: cgmath::Quaternion::from_angle_y(cgmath::Deg(180.0)),
            scale: Vector3::new(self.scale, self.scale, self.scale),
            tint: [1.0; 4],
            params: [0.0, left, right, BODY_HALF_WIDTH],
        }
    }
}

pub struct ButterflyFlow {
    butterflies: Vec<Butterfly>,
    rng: StdRng,
    model: Model,
    instance_buffer: wgpu::Buffer,
}

impl ButterflyFlow {
    pub async fn new(ctx: &InitContext, scene: &SceneConfig) -> anyhow::Result<Self> {
        let config: &ButterflyConfig = &scene.butterfly;
        let options = ModelLoadOptions {
            obj: ObjLoadOptions {
                clip_below: config.clip_below,
                ..Default::default()
            },
            texture_overrides: config.texture_overrides.clone(),
        };
        let model =
            resources::load_model_obj(&scene.asset(&config.model), &ctx.device, &ctx.queue, &options)
                .await?;

        let mut rng = scene_rng(config.seed);
        let butterflies: Vec<_> = (0..config.count)
            .map(|i| Butterfly::spawn(i, config.count, config.scale, &mut rng))
            .collect();
        log::info!(
            "{} butterflies share a model of {} meshes",
            butterflies.len(),
            model.meshes.len()
        );

        let instance_buffer = mk_instance_buffer(&ctx.device, &to_raw(&butterflies), INSTANCE_LABEL);
        Ok(Self {
            butterflies,
            rng,
            model,
            instance_buffer,
        })
    }
}

fn to_raw(butterflies: &[Butterfly]) -> Vec<InstanceRaw> {
    butterflies.iter().map(|b| b.to_instance().to_raw()).collect()
}

pub fn constructor<S: 'static, E: 'static>(scene: &SceneConfig) -> FlowConstructor<S, E> {
    let scene = scene.clone();
    Box::new(move |ctx| {
        Box::pin(async move {
            let flow = ButterflyFlow::new(&ctx, &scene).await?;
            anyhow::Ok(Box::new(flow) as Box<dyn GraphicsFlow<S, E>>)
        })
    })
}

impl<S, E> GraphicsFlow<S, E> for ButterflyFlow {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, dt: Duration) -> Out<S, E> {
        let dt = dt.as_secs_f32();
        let rng = &mut self.rng;
        self.butterflies.iter_mut().for_each(|b| b.update(dt, rng));
        write_instances(
            &ctx.device,
            &ctx.queue,
            &mut self.instance_buffer,
            &to_raw(&self.butterflies),
            INSTANCE_LABEL,
        );
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        if self.butterflies.is_empty() {
            return Render::None;
        }
        Render::Model(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: self.butterflies.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn spawn_places_on_a_widening_ring() {
        let mut rng = rng();
        let first = Butterfly::spawn(0, 4, 0.005, &mut rng);
        assert_relative_eq!(first.position.x, 0.0);
        assert_relative_eq!(first.position.y, 1.5);
        assert_relative_eq!(first.position.z, 3.0);

        let second = Butterfly::spawn(1, 4, 0.005, &mut rng);
        assert_relative_eq!(second.position.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(second.position.z, 0.0, epsilon = 1e-5);

        assert_relative_eq!(first.direction.magnitude(), 1.0, epsilon = 1e-5);
        assert_eq!(first.direction.y, 0.0);
        assert_eq!(first.wing_angle, 0.0);
        assert_eq!(first.wing_speed, 5.0);
        assert_eq!(first.flight_speed, 0.5);
        assert_eq!(first.scale, 0.005);
    }

    #[test]
    fn flies_straight_before_the_turn_delay() {
        let mut rng = rng();
        let mut b = Butterfly::new(Vector3::new(0.0, 2.0, 0.0), Vector3::unit_x(), 1.0);
        b.update(1.0, &mut rng);
        assert_relative_eq!(b.position.x, 0.5);
        assert_relative_eq!(b.wing_angle, 5.0);
        assert_relative_eq!(b.time_since_turn, 1.0);
        assert_eq!(b.direction, Vector3::unit_x());
    }

    #[test]
    fn turns_back_at_the_boundary() {
        let mut rng = rng();
        let mut b = Butterfly::new(Vector3::new(9.9, 2.0, 4.0), Vector3::unit_x(), 1.0);
        b.update(1.0, &mut rng);
        assert!(b.position.x > 10.0);
        let expected = Vector3::new(-b.position.x, 0.0, -b.position.z).normalize();
        assert_relative_eq!(b.direction.x, expected.x, epsilon = 1e-6);
        assert_relative_eq!(b.direction.z, expected.z, epsilon = 1e-6);
        assert_eq!(b.direction.y, 0.0);
    }

    #[test]
    fn height_is_clamped_and_flips_the_climb() {
        let mut rng = rng();
        let mut low = Butterfly::new(
            Vector3::new(0.0, 0.6, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            1.0,
        );
        low.update(1.0, &mut rng);
        assert_eq!(low.position.y, MIN_HEIGHT);
        assert_eq!(low.direction.y, 1.0);

        let mut high = Butterfly::new(
            Vector3::new(0.0, 4.9, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
        );
        high.update(1.0, &mut rng);
        assert_eq!(high.position.y, MAX_HEIGHT);
        assert_eq!(high.direction.y, -1.0);
    }

    #[test]
    fn eventually_turns_after_the_delay() {
        let mut rng = rng();
        let mut b = Butterfly::new(Vector3::new(0.0, 2.0, 0.0), Vector3::unit_x(), 1.0);
        b.time_since_turn = 3.5;
        // with a 5% chance per update, 1000 tiny steps turn at least once
        let turned = (0..1000).any(|_| {
            b.update(0.0001, &mut rng);
            b.time_since_turn == 0.0
        });
        assert!(turned);
        assert_relative_eq!(b.direction.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn wings_beat_in_opposite_phase() {
        let mut b = Butterfly::new(Vector3::new(0.0, 2.0, 0.0), Vector3::unit_x(), 1.0);
        b.wing_angle = PI / 2.0;
        let (left, right) = b.wing_angles();
        assert_relative_eq!(left, 0.2);
        assert_relative_eq!(right, -0.2, epsilon = 1e-6);

        let instance = b.to_instance();
        assert_eq!(instance.params[1], left);
        assert_eq!(instance.params[2], right);
        assert!(instance.params[3] > 0.0);
    }

    #[test]
    fn model_matrix_faces_backwards() {
        let b = Butterfly::new(Vector3::new(1.0, 2.0, 3.0), Vector3::unit_x(), 0.5);
        let m = b.to_instance().to_matrix();
        let p = m * cgmath::Vector4::new(1.0, 0.0, 1.0, 1.0);
        // scaled by 0.5, turned half way round Y, then moved
        assert_relative_eq!(p.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 2.5, epsilon = 1e-5);
    }
}
