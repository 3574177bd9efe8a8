//! Free-fly camera, projection and the uniform the shaders read.
//!
//! The camera is described by a position and yaw/pitch angles. The
//! [`CameraController`] accumulates keyboard, mouse and scroll input between
//! frames and applies it in [`CameraController::update`].

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use instant::Duration;
use winit::{
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const MAX_PITCH_DEG: f32 = 89.0;
const MIN_FOV_DEG: f32 = 1.0;
const MAX_FOV_DEG: f32 = 90.0;

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Unit view direction. Yaw -90 deg with pitch 0 looks down -Z.
    pub fn front(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front(), Vector3::unit_y())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    /// Narrows the field of view by `amount` degrees, kept within [1, 90].
    pub fn zoom(&mut self, amount: f32) {
        let degrees = cgmath::Deg::from(self.fovy).0 - amount;
        self.fovy = cgmath::Deg(degrees.clamp(MIN_FOV_DEG, MAX_FOV_DEG)).into();
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Debug, Default)]
pub struct CameraController {
    forward: f32,
    backward: f32,
    left: f32,
    right: f32,
    up: f32,
    down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    /// `speed` in units per second, `sensitivity` in degrees per mouse count.
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            ..Default::default()
        }
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => self.forward = amount,
            KeyCode::KeyS | KeyCode::ArrowDown => self.backward = amount,
            KeyCode::KeyA | KeyCode::ArrowLeft => self.left = amount,
            KeyCode::KeyD | KeyCode::ArrowRight => self.right = amount,
            KeyCode::Space => self.up = amount,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => self.down = amount,
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.rotate_horizontal += dx as f32;
        self.rotate_vertical += dy as f32;
    }

    pub fn handle_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            // Roughly one line per 20 pixels
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / 20.0,
        };
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                self.process_keyboard(*key, *state);
            }
            WindowEvent::MouseWheel { delta, .. } => self.handle_scroll(delta),
            _ => (),
        }
    }

    pub fn update(&mut self, camera: &mut Camera, projection: &mut Projection, dt: Duration) {
        let dt = dt.as_secs_f32();
        let front = camera.front();
        let right = front.cross(Vector3::unit_y()).normalize();

        camera.position += front * (self.forward - self.backward) * self.speed * dt;
        camera.position += right * (self.right - self.left) * self.speed * dt;
        camera.position.y += (self.up - self.down) * self.speed * dt;

        let yaw = cgmath::Deg::from(camera.yaw).0 + self.rotate_horizontal * self.sensitivity;
        // Mouse y grows downwards
        let pitch = cgmath::Deg::from(camera.pitch).0 - self.rotate_vertical * self.sensitivity;
        camera.yaw = cgmath::Deg(yaw).into();
        camera.pitch = cgmath::Deg(pitch.clamp(-MAX_PITCH_DEG, MAX_PITCH_DEG)).into();
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        if self.scroll != 0.0 {
            projection.zoom(self.scroll);
            self.scroll = 0.0;
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    inv_proj: [[f32; 4]; 4],
    inv_view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
            inv_proj: Matrix4::identity().into(),
            inv_view: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        let view = camera.calc_matrix();
        let proj = projection.calc_matrix();
        self.view_proj = (proj * view).into();
        // A singular matrix keeps the previous inverse
        if let Some(inv) = proj.invert() {
            self.inv_proj = inv.into();
        }
        if let Some(inv) = view.invert() {
            self.inv_view = inv.into();
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, config: &CameraConfig, projection: &Projection) -> Self {
        use wgpu::util::DeviceExt;

        let camera = Camera::new(
            config.position,
            cgmath::Deg(config.yaw),
            cgmath::Deg(config.pitch),
        );
        let controller = CameraController::new(config.speed, config.sensitivity);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Deg;

    use super::*;

    #[test]
    fn default_orientation_looks_down_negative_z() {
        let camera = Camera::new((0.0, 0.0, 3.0), Deg(-90.0), Deg(0.0));
        let front = camera.front();
        assert_relative_eq!(front.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(front.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(front.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let mut controller = CameraController::new(2.5, 0.1);
        controller.handle_mouse(0.0, -10_000.0);
        controller.update(&mut camera, &mut projection, Duration::from_millis(16));
        assert_relative_eq!(Deg::from(camera.pitch).0, 89.0, epsilon = 1e-4);

        controller.handle_mouse(0.0, 20_000.0);
        controller.update(&mut camera, &mut projection, Duration::from_millis(16));
        assert_relative_eq!(Deg::from(camera.pitch).0, -89.0, epsilon = 1e-4);
    }

    #[test]
    fn mouse_motion_scales_by_sensitivity() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let mut controller = CameraController::new(2.5, 0.1);
        controller.handle_mouse(100.0, 0.0);
        controller.update(&mut camera, &mut projection, Duration::ZERO);
        assert_relative_eq!(Deg::from(camera.yaw).0, -80.0, epsilon = 1e-4);
    }

    #[test]
    fn zoom_is_clamped_between_one_and_ninety_degrees() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        projection.zoom(5.0);
        assert_relative_eq!(Deg::from(projection.fovy()).0, 40.0, epsilon = 1e-4);
        projection.zoom(100.0);
        assert_relative_eq!(Deg::from(projection.fovy()).0, 1.0, epsilon = 1e-4);
        projection.zoom(-500.0);
        assert_relative_eq!(Deg::from(projection.fovy()).0, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn forward_key_moves_along_view_direction() {
        let mut camera = Camera::new((0.0, 0.0, 3.0), Deg(-90.0), Deg(0.0));
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let mut controller = CameraController::new(2.5, 0.1);
        assert!(controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed));
        controller.update(&mut camera, &mut projection, Duration::from_secs(1));
        assert_relative_eq!(camera.position.z, 0.5, epsilon = 1e-5);

        controller.process_keyboard(KeyCode::KeyW, ElementState::Released);
        assert!(controller.process_keyboard(KeyCode::Space, ElementState::Pressed));
        controller.update(&mut camera, &mut projection, Duration::from_secs(2));
        assert_relative_eq!(camera.position.y, 5.0, epsilon = 1e-5);
        assert!(!controller.process_keyboard(KeyCode::KeyQ, ElementState::Pressed));
    }
}
