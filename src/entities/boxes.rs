//! The box field: a grid of cubes drifting through a wrap-around region.
//!
//! One box may be a light source. It is drawn emissive and unrotated, and its
//! position becomes the scene light every frame.

use std::f32::consts::TAU;

use cgmath::{One, Rotation3, Vector3, Zero};
use instant::Duration;
use rand::Rng;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::{BoxesConfig, SceneConfig},
    context::{Context, DEFAULT_LIGHT_POSITION, InitContext},
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{Material, MaterialTextures, Model, ModelVertex, Phong},
        texture::Placeholders,
    },
    entities::{mk_instance_buffer, scene_rng, write_instances},
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::{Instanced, Render},
    resources::{mesh, obj::MeshData, texture::material_layout},
};

const BOX_SCALE: f32 = 0.5;
const LIGHT_BOX_SCALE: f32 = 1.0;
const INSTANCE_LABEL: &str = "Box Instance Buffer";

#[derive(Clone, Debug, PartialEq)]
pub struct BoxInstance {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub color: [f32; 3],
    pub scale: f32,
    /// Radians about +Y, kept in `[0, 2pi)`.
    pub rotation: f32,
    pub rotation_speed: f32,
    pub is_light_source: bool,
}

impl BoxInstance {
    /// Advances the box by `dt` seconds inside the cube `[-bounds, bounds]^3`.
    pub fn update(&mut self, dt: f32, bounds: f32) {
        self.position += self.velocity * dt;
        self.position.x = wrap(self.position.x, bounds);
        self.position.y = wrap(self.position.y, bounds);
        self.position.z = wrap(self.position.z, bounds);
        let rotation = (self.rotation + self.rotation_speed * dt).rem_euclid(TAU);
        // rem_euclid rounds tiny negative angles up to exactly TAU
        self.rotation = if rotation >= TAU { 0.0 } else { rotation };
    }

    pub fn to_instance(&self) -> Instance {
        let rotation = if self.is_light_source {
            cgmath::Quaternion::one()
        } else {
            cgmath::Quaternion::from_angle_y(cgmath::Rad(self.rotation))
        };
        let [r, g, b] = self.color;
        Instance {
            position: self.position,
            rotation,
            scale: Vector3::new(self.scale, self.scale, self.scale),
            tint: [r, g, b, 1.0],
            params: [if self.is_light_source { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Wraps `value` into `[-bounds, bounds]` so that leaving one face re-enters at
/// the opposite one. A non-positive `bounds` disables wrapping.
pub fn wrap(value: f32, bounds: f32) -> f32 {
    if bounds <= 0.0 || (-bounds..=bounds).contains(&value) {
        return value;
    }
    (value + bounds).rem_euclid(2.0 * bounds) - bounds
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxField {
    pub boxes: Vec<BoxInstance>,
    pub bounds: f32,
}

impl BoxField {
    /// Lays out a `grid_x * grid_z` grid centred on the origin with random
    /// colour, drift and spin, plus the light box when configured.
    pub fn generate(config: &BoxesConfig, rng: &mut impl Rng) -> Self {
        let half_x = config.grid_x.saturating_sub(1) as f32 * config.spacing / 2.0;
        let half_z = config.grid_z.saturating_sub(1) as f32 * config.spacing / 2.0;

        let mut boxes = Vec::with_capacity((config.grid_x * config.grid_z) as usize + 1);
        for ix in 0..config.grid_x {
            for iz in 0..config.grid_z {
                let position = Vector3::new(
                    ix as f32 * config.spacing - half_x,
                    rng.random_range(-0.5..0.5),
                    iz as f32 * config.spacing - half_z,
                );
                let velocity = Vector3::new(
                    rng.random_range(-0.5..0.5),
                    rng.random_range(-0.1..0.1),
                    rng.random_range(-0.5..0.5),
                );
                boxes.push(BoxInstance {
                    position,
                    velocity,
                    color: [
                        rng.random_range(0.2..1.0),
                        rng.random_range(0.2..1.0),
                        rng.random_range(0.2..1.0),
                    ],
                    scale: BOX_SCALE,
                    rotation: rng.random_range(0.0..TAU),
                    rotation_speed: rng.random_range(-1.0..1.0),
                    is_light_source: false,
                });
            }
        }

        if config.light_source {
            boxes.push(BoxInstance {
                position: Vector3::new(0.0, config.light_height, 0.0),
                velocity: Vector3::zero(),
                color: [1.0, 1.0, 1.0],
                scale: LIGHT_BOX_SCALE,
                rotation: 0.0,
                rotation_speed: 0.0,
                is_light_source: true,
            });
        }

        Self {
            boxes,
            bounds: config.bounds,
        }
    }

    pub fn update(&mut self, dt: f32) {
        let bounds = self.bounds;
        self.boxes.iter_mut().for_each(|b| b.update(dt, bounds));
    }

    /// Position of the first light-source box, or the default light position.
    pub fn light_position(&self) -> Vector3<f32> {
        self.boxes
            .iter()
            .find(|b| b.is_light_source)
            .map(|b| b.position)
            .unwrap_or_else(|| DEFAULT_LIGHT_POSITION.into())
    }

    pub fn has_light_source(&self) -> bool {
        self.boxes.iter().any(|b| b.is_light_source)
    }

    pub fn to_raw(&self) -> Vec<InstanceRaw> {
        self.boxes.iter().map(|b| b.to_instance().to_raw()).collect()
    }
}

/// A unit cube centred on the origin with one quad (4 vertices) per face, so
/// every face carries its own flat normal.
pub fn cube_mesh() -> MeshData {
    // (normal, u, v) with u x v == normal so quads wind counter-clockwise
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let tex_coords = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let (n, u, v) = (Vector3::from(normal), Vector3::from(u), Vector3::from(v));
        let base = vertices.len() as u32;
        for ((su, sv), uv) in corners.into_iter().zip(tex_coords) {
            let position = (n + u * su + v * sv) * 0.5;
            vertices.push(ModelVertex {
                position: position.into(),
                tex_coords: uv,
                normal,
                ..Default::default()
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData {
        name: "cube".to_string(),
        vertices,
        indices,
        material: None,
    }
}

fn cube_model(device: &wgpu::Device, queue: &wgpu::Queue) -> Model {
    let mesh = mesh::upload_mesh(device, &cube_mesh(), None, "cube");
    let placeholders = Placeholders::new(device, queue);
    let fallback = Material::new(
        device,
        "box material",
        Phong::default(),
        MaterialTextures::default(),
        &placeholders,
        &material_layout(device),
    );
    Model {
        meshes: vec![mesh],
        materials: Vec::new(),
        fallback,
    }
}

pub struct BoxesFlow {
    field: BoxField,
    model: Model,
    instance_buffer: wgpu::Buffer,
}

impl BoxesFlow {
    pub fn new(ctx: &InitContext, config: &BoxesConfig) -> Self {
        let mut rng = scene_rng(config.seed);
        let field = BoxField::generate(config, &mut rng);
        log::info!(
            "generated {} boxes ({} light sources)",
            field.boxes.len(),
            field.boxes.iter().filter(|b| b.is_light_source).count()
        );
        let instance_buffer = mk_instance_buffer(&ctx.device, &field.to_raw(), INSTANCE_LABEL);
        Self {
            field,
            model: cube_model(&ctx.device, &ctx.queue),
            instance_buffer,
        }
    }
}

pub fn constructor<S: 'static, E: 'static>(scene: &SceneConfig) -> FlowConstructor<S, E> {
    let config = scene.boxes.clone();
    Box::new(move |ctx| {
        Box::pin(async move {
            let flow = BoxesFlow::new(&ctx, &config);
            anyhow::Ok(Box::new(flow) as Box<dyn GraphicsFlow<S, E>>)
        })
    })
}

impl<S, E> GraphicsFlow<S, E> for BoxesFlow {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, E> {
        let light: [f32; 3] = self.field.light_position().into();
        Out::Configure(Box::new(move |ctx: &mut Context| {
            ctx.light.uniform.position = light;
        }))
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, dt: Duration) -> Out<S, E> {
        self.field.update(dt.as_secs_f32());
        write_instances(
            &ctx.device,
            &ctx.queue,
            &mut self.instance_buffer,
            &self.field.to_raw(),
            INSTANCE_LABEL,
        );
        if !self.field.has_light_source() {
            return Out::Empty;
        }
        let light: [f32; 3] = self.field.light_position().into();
        Out::Configure(Box::new(move |ctx: &mut Context| {
            ctx.light.uniform.position = light;
        }))
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
        if self.field.boxes.is_empty() {
            return Render::None;
        }
        Render::Boxes(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: self.field.boxes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn config() -> BoxesConfig {
        BoxesConfig {
            grid_x: 3,
            grid_z: 2,
            spacing: 2.0,
            bounds: 15.0,
            seed: Some(1),
            light_source: true,
            light_height: 5.0,
        }
    }

    fn drifting(position: [f32; 3], velocity: [f32; 3]) -> BoxInstance {
        BoxInstance {
            position: position.into(),
            velocity: velocity.into(),
            color: [1.0, 0.0, 0.0],
            scale: 1.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            is_light_source: false,
        }
    }

    #[test]
    fn grid_is_centred_with_one_light() {
        let field = BoxField::generate(&config(), &mut StdRng::seed_from_u64(3));
        assert_eq!(field.boxes.len(), 7);

        let grid: Vec<_> = field.boxes.iter().filter(|b| !b.is_light_source).collect();
        assert_eq!(grid.len(), 6);
        let xs: Vec<f32> = grid.iter().map(|b| b.position.x).collect();
        assert_relative_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -2.0);
        assert_relative_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 2.0);
        for b in &grid {
            assert!(b.position.z == -1.0 || b.position.z == 1.0);
            assert!(b.position.y.abs() <= 0.5);
            assert!((0.0..TAU).contains(&b.rotation));
            assert!(b.color.iter().all(|c| (0.2..1.0).contains(c)));
        }

        let light = field.boxes.last().unwrap();
        assert!(light.is_light_source);
        assert_eq!(light.color, [1.0, 1.0, 1.0]);
        assert_eq!(light.rotation_speed, 0.0);
        assert!(light.scale > BOX_SCALE);
        assert_eq!(field.light_position(), Vector3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn same_seed_same_field() {
        let a = BoxField::generate(&config(), &mut StdRng::seed_from_u64(9));
        let b = BoxField::generate(&config(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn light_defaults_without_a_light_box() {
        let config = BoxesConfig {
            light_source: false,
            ..config()
        };
        let field = BoxField::generate(&config, &mut StdRng::seed_from_u64(0));
        assert_eq!(field.boxes.len(), 6);
        assert!(!field.has_light_source());
        assert_eq!(field.light_position(), Vector3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn leaving_a_face_reenters_at_the_opposite_one() {
        let mut b = drifting([14.5, 0.0, -14.8], [1.0, 0.0, -1.0]);
        b.update(1.0, 15.0);
        assert_relative_eq!(b.position.x, -14.5, epsilon = 1e-4);
        assert_relative_eq!(b.position.z, 14.2, epsilon = 1e-4);
        assert_relative_eq!(b.position.y, 0.0);
    }

    #[test]
    fn wrap_keeps_values_inside() {
        assert_eq!(wrap(3.0, 15.0), 3.0);
        assert_eq!(wrap(15.0, 15.0), 15.0);
        assert_relative_eq!(wrap(16.0, 15.0), -14.0);
        assert_relative_eq!(wrap(-16.0, 15.0), 14.0);
        // a long frame can overshoot by more than the region
        assert_relative_eq!(wrap(47.0, 15.0), -13.0);
        assert_eq!(wrap(4.0, 0.0), 4.0);
    }

    #[test]
    fn rotation_wraps_into_one_turn() {
        let mut b = drifting([0.0; 3], [0.0; 3]);
        b.rotation = 6.0;
        b.rotation_speed = 1.0;
        b.update(0.5, 15.0);
        assert_relative_eq!(b.rotation, 6.5 - TAU, epsilon = 1e-5);

        b.rotation_speed = -2.0;
        b.update(0.5, 15.0);
        assert!((0.0..TAU).contains(&b.rotation));
    }

    #[test]
    fn light_boxes_are_emissive_and_unrotated() {
        let mut light = drifting([0.0, 5.0, 0.0], [0.0; 3]);
        light.is_light_source = true;
        light.rotation = 1.0;
        let instance = light.to_instance();
        assert_eq!(instance.rotation, cgmath::Quaternion::one());
        assert_eq!(instance.params[0], 1.0);

        let mut spinning = drifting([0.0; 3], [0.0; 3]);
        spinning.rotation = 1.0;
        let instance = spinning.to_instance();
        assert_eq!(instance.params[0], 0.0);
        assert_ne!(instance.rotation, cgmath::Quaternion::one());
    }

    #[test]
    fn cube_faces_wind_outwards() {
        let cube = cube_mesh();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                Vector3::from(cube.vertices[i as usize].position)
            });
            let face_normal = (b - a).cross(c - a);
            let vertex_normal = Vector3::from(cube.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(vertex_normal) > 0.0);
            // every corner sits on the unit cube
            assert!([a, b, c].iter().all(|p| p.x.abs() == 0.5 && p.y.abs() == 0.5 && p.z.abs() == 0.5));
        }
    }
}
