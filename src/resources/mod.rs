use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    data_structures::{
        model::{self, MaterialTextures, Phong},
        texture::{self as gpu_texture, Placeholders},
    },
    resources::{
        mtl::{MaterialDesc, TextureOverride},
        obj::{ObjData, ObjLoadOptions},
    },
};

/**
 * This module contains all logic for loading mesh/textures/etc. from external files.
 */
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod texture;

/// Reads a text asset. Bytes that are not UTF-8 (Latin-1 names and comments
/// from some exporters) become U+FFFD instead of failing the read.
pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    let bytes = load_binary(path).await?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::debug!("{} is not valid UTF-8, decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

#[derive(Clone, Debug, Default)]
pub struct ModelLoadOptions {
    pub obj: ObjLoadOptions,
    pub texture_overrides: HashMap<String, TextureOverride>,
}

/// An OBJ file with its material libraries resolved, still on the CPU.
#[derive(Clone, Debug)]
pub struct ObjScene {
    pub data: ObjData,
    pub materials: Vec<MaterialDesc>,
    /// Material slot per mesh of `data`.
    pub bindings: Vec<Option<usize>>,
    /// Directory that texture and library paths are relative to.
    pub base_dir: PathBuf,
}

/// Reads and parses an OBJ file plus every `mtllib` it names.
///
/// A library that is missing or broken is logged and skipped; its materials
/// simply resolve to the default material.
pub async fn read_obj(path: &Path, options: &ModelLoadOptions) -> anyhow::Result<ObjScene> {
    let obj_text = load_string(path).await?;
    let data = obj::parse_obj(Cursor::new(obj_text), &options.obj)
        .with_context(|| format!("could not parse {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut materials = Vec::new();
    for lib in &data.material_libs {
        let lib_path = base_dir.join(lib);
        let parsed = match load_string(&lib_path).await {
            Ok(text) => mtl::parse_mtl(Cursor::new(text)).map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(mut found) => {
                log::debug!("{} defines {} materials", lib_path.display(), found.len());
                materials.append(&mut found);
            }
            Err(e) => log::warn!("ignoring material library {}: {e:#}", lib_path.display()),
        }
    }
    mtl::apply_overrides(&mut materials, &options.texture_overrides);
    let bindings = mtl::bind_materials(&data.meshes, &materials);

    let stats = &data.stats;
    log::info!(
        "parsed {}: {} meshes, {} triangles, {} materials ({} faces skipped, {} triangles clipped)",
        path.display(),
        data.meshes.len(),
        stats.triangles,
        materials.len(),
        stats.skipped_faces,
        stats.clipped_triangles,
    );

    Ok(ObjScene {
        data,
        materials,
        bindings,
        base_dir,
    })
}

pub async fn load_model_obj(
    path: &Path,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    options: &ModelLoadOptions,
) -> anyhow::Result<model::Model> {
    let scene = read_obj(path, options).await?;
    let layout = texture::material_layout(device);
    let placeholders = Placeholders::new(device, queue);

    let mut materials = Vec::with_capacity(scene.materials.len());
    for desc in &scene.materials {
        let textures = MaterialTextures {
            diffuse: load_slot(&scene.base_dir, desc.diffuse_texture.as_deref(), false, device, queue).await,
            specular: load_slot(&scene.base_dir, desc.specular_texture.as_deref(), false, device, queue).await,
            normal: load_slot(&scene.base_dir, desc.normal_texture.as_deref(), true, device, queue).await,
        };
        materials.push(model::Material::new(
            device,
            &desc.name,
            desc.phong,
            textures,
            &placeholders,
            &layout,
        ));
    }
    let fallback = model::Material::new(
        device,
        "default material",
        Phong::FALLBACK,
        MaterialTextures::default(),
        &placeholders,
        &layout,
    );

    let file_name = path.to_string_lossy();
    let meshes = scene
        .data
        .meshes
        .iter()
        .zip(scene.bindings.iter().copied())
        .map(|(data, slot)| mesh::upload_mesh(device, data, slot, &file_name))
        .collect();

    Ok(model::Model {
        meshes,
        materials,
        fallback,
    })
}

/// A texture that fails to load leaves its slot to the placeholder.
async fn load_slot(
    base_dir: &Path,
    file: Option<&str>,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Option<gpu_texture::Texture> {
    let path = base_dir.join(file?);
    match texture::load_texture(&path, is_normal_map, device, queue).await {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("texture {} unavailable, using default: {e:#}", path.display());
            None
        }
    }
}
