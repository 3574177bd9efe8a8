//! Scene configuration.
//!
//! Everything the scene needs that is not code lives in a [`SceneConfig`]:
//! window, camera, asset locations and the entity parameters. The config is
//! read from TOML; every field is optional and falls back to the defaults
//! below.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::resources::mtl::TextureOverride;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "luminous-field.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub assets: AssetsConfig,
    pub skybox: SkyboxConfig,
    pub butterfly: ButterflyConfig,
    pub boxes: BoxesConfig,
    pub overlay: OverlayConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub capture_cursor: bool,
    pub clear_colour: [f64; 3],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "The Luminous Field".to_string(),
            width: 1280,
            height: 720,
            capture_cursor: true,
            clear_colour: [0.1, 0.1, 0.1],
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Degrees; -90 looks down -Z.
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub znear: f32,
    pub zfar: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            fov: 45.0,
            znear: 0.1,
            zfar: 100.0,
            speed: 2.5,
            sensitivity: 0.1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetsConfig {
    pub root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SkyboxConfig {
    pub right: PathBuf,
    pub left: PathBuf,
    pub top: PathBuf,
    pub bottom: PathBuf,
    pub front: PathBuf,
    pub back: PathBuf,
}

impl SkyboxConfig {
    /// Faces in cube layer order: +X, -X, +Y, -Y, +Z, -Z.
    pub fn faces(&self, root: &Path) -> [PathBuf; 6] {
        [
            &self.right,
            &self.left,
            &self.top,
            &self.bottom,
            &self.front,
            &self.back,
        ]
        .map(|face| root.join(face))
    }
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        let face = |name: &str| PathBuf::from("textures/skybox_cubemap").join(name);
        Self {
            right: face("right.png"),
            left: face("left.png"),
            top: face("top.png"),
            bottom: face("bottom.png"),
            front: face("front.png"),
            back: face("back.png"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ButterflyConfig {
    pub model: PathBuf,
    pub count: usize,
    pub scale: f32,
    /// Strips geometry below this height, such as a display base baked into the asset.
    pub clip_below: Option<f32>,
    pub seed: Option<u64>,
    pub texture_overrides: HashMap<String, TextureOverride>,
}

impl Default for ButterflyConfig {
    fn default() -> Self {
        let diffuse = |file: &str| TextureOverride {
            diffuse: Some(file.to_string()),
            ..Default::default()
        };
        let reflective = |file: &str| TextureOverride {
            diffuse: Some(file.to_string()),
            specular: Some(file.to_string()),
            normal: None,
        };
        Self {
            model: PathBuf::from("butterfly/Matiposa_001.obj"),
            count: 3,
            scale: 0.005,
            clip_below: Some(-0.1),
            seed: None,
            texture_overrides: HashMap::from([
                ("wire_154215229".to_string(), diffuse("Alas_Corona_Beauty.jpg")),
                ("wire_184007009".to_string(), diffuse("Venas_Corona_Beauty.jpg")),
                ("wire_255255000".to_string(), diffuse("Cuerpo_Corona_Beauty.jpg")),
                ("wire_135059008".to_string(), diffuse("Suelo_Corona_Beauty.jpg")),
                ("wire_042116168".to_string(), reflective("Alas_Corona_ReflectColor.jpg")),
                ("wire_000255000".to_string(), reflective("Cuerpo_Corona_ReflectColor.jpg")),
            ]),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoxesConfig {
    pub grid_x: u32,
    pub grid_z: u32,
    pub spacing: f32,
    /// Half extent of the cube boxes wrap around in.
    pub bounds: f32,
    pub seed: Option<u64>,
    pub light_source: bool,
    pub light_height: f32,
}

impl Default for BoxesConfig {
    fn default() -> Self {
        Self {
            grid_x: 10,
            grid_z: 10,
            spacing: 2.0,
            bounds: 15.0,
            seed: None,
            light_source: true,
            light_height: 5.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Optional font file; system fonts are used when absent or unreadable.
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub colour: [u8; 3],
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font: Some(PathBuf::from("fonts/Roboto-Regular.ttf")),
            font_size: 32.0,
            colour: [255, 255, 0],
        }
    }
}

impl SceneConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Loads `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    log::info!("no {DEFAULT_CONFIG_FILE} found, using the built-in scene");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn asset(&self, relative: &Path) -> PathBuf {
        self.assets.root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = SceneConfig::from_toml(
            r#"
            [camera]
            fov = 60.0

            [boxes]
            grid_x = 4
            seed = 7

            [butterfly.texture_overrides.wing]
            diffuse = "wing.png"
            "#,
            Path::new("inline.toml"),
        )
        .unwrap();

        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.speed, 2.5);
        assert_eq!(config.boxes.grid_x, 4);
        assert_eq!(config.boxes.grid_z, 10);
        assert_eq!(config.boxes.seed, Some(7));
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.butterfly.texture_overrides.len(), 1);
        assert_eq!(
            config.butterfly.texture_overrides["wing"].diffuse.as_deref(),
            Some("wing.png")
        );
    }

    #[test]
    fn invalid_value_names_the_file() {
        let err = SceneConfig::from_toml("[window]\nwidth = \"wide\"\n", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[window]\ntitle = \"Meadow\"").unwrap();
        let config = SceneConfig::load(file.path()).unwrap();
        assert_eq!(config.window.title, "Meadow");

        let missing = SceneConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn shipped_file_matches_defaults() {
        let shipped = include_str!("../luminous-field.toml");
        let config = SceneConfig::from_toml(shipped, Path::new(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn skybox_faces_are_in_layer_order() {
        let faces = SkyboxConfig::default().faces(Path::new("root"));
        let names: Vec<_> = faces
            .iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["right", "left", "top", "bottom", "front", "back"]);
        assert!(faces[0].starts_with("root"));
    }
}
