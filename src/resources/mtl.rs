//! MTL material libraries.
//!
//! Statement parsing is delegated to `tobj`; this module applies the renderer's
//! defaults, per-material texture overrides and resolves the names meshes refer
//! to into material table slots.

use std::{collections::HashMap, io::BufRead};

use serde::Deserialize;

use crate::{
    data_structures::model::Phong,
    resources::obj::{MeshData, ObjError},
};

/// A material as described by its library, before any texture is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub phong: Phong,
    pub diffuse_texture: Option<String>,
    pub specular_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl MaterialDesc {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            phong: Phong::default(),
            diffuse_texture: None,
            specular_texture: None,
            normal_texture: None,
        }
    }
}

impl From<tobj::Material> for MaterialDesc {
    fn from(m: tobj::Material) -> Self {
        let defaults = Phong::default();
        let non_empty = |path: Option<String>| path.filter(|p| !p.trim().is_empty());
        Self {
            phong: Phong {
                ambient: m.ambient.unwrap_or(defaults.ambient),
                diffuse: m.diffuse.unwrap_or(defaults.diffuse),
                specular: m.specular.unwrap_or(defaults.specular),
                shininess: m.shininess.unwrap_or(defaults.shininess),
            },
            diffuse_texture: non_empty(m.diffuse_texture),
            specular_texture: non_empty(m.specular_texture),
            normal_texture: non_empty(m.normal_texture),
            name: m.name,
        }
    }
}

/// Texture files that replace (or add to) what a material's library declares.
///
/// Some exported assets ship their textures without referencing them from the
/// MTL file; an override table keyed by material name fixes that up.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextureOverride {
    pub diffuse: Option<String>,
    pub specular: Option<String>,
    pub normal: Option<String>,
}

pub fn parse_mtl<R: BufRead>(mut reader: R) -> Result<Vec<MaterialDesc>, ObjError> {
    let (materials, _) = tobj::load_mtl_buf(&mut reader)?;
    Ok(materials.into_iter().map(MaterialDesc::from).collect())
}

pub fn apply_overrides(materials: &mut [MaterialDesc], overrides: &HashMap<String, TextureOverride>) {
    for material in materials.iter_mut() {
        let Some(o) = overrides.get(&material.name) else {
            continue;
        };
        log::debug!("applying texture override to material {}", material.name);
        if let Some(diffuse) = &o.diffuse {
            material.diffuse_texture = Some(diffuse.clone());
        }
        if let Some(specular) = &o.specular {
            material.specular_texture = Some(specular.clone());
        }
        if let Some(normal) = &o.normal {
            material.normal_texture = Some(normal.clone());
        }
    }
}

/// Material table slot for every mesh, in mesh order.
pub fn bind_materials(meshes: &[MeshData], materials: &[MaterialDesc]) -> Vec<Option<usize>> {
    let by_name: HashMap<&str, usize> = materials
        .iter()
        .enumerate()
        // first definition wins when a name repeats
        .rev()
        .map(|(idx, m)| (m.name.as_str(), idx))
        .collect();

    meshes
        .iter()
        .map(|mesh| {
            let name = mesh.material.as_deref()?;
            let slot = by_name.get(name).copied();
            if slot.is_none() {
                log::warn!(
                    "mesh {} uses unknown material {name}, drawing it with the default material",
                    mesh.name
                );
            }
            slot
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const LIBRARY: &str = "\
newmtl wing
Ka 0.2 0.2 0.2
Kd 0.9 0.5 0.1
Ks 1 1 1
Ns 64
map_Kd wing.jpg
map_Bump wing_normal.png

newmtl body
Kd 0.3 0.3 0.3
";

    #[test]
    fn statements_and_defaults() {
        let materials = parse_mtl(Cursor::new(LIBRARY)).unwrap();
        assert_eq!(materials.len(), 2);

        let wing = &materials[0];
        assert_eq!(wing.name, "wing");
        assert_eq!(wing.phong.ambient, [0.2, 0.2, 0.2]);
        assert_eq!(wing.phong.diffuse, [0.9, 0.5, 0.1]);
        assert_eq!(wing.phong.shininess, 64.0);
        assert_eq!(wing.diffuse_texture.as_deref(), Some("wing.jpg"));
        assert_eq!(wing.normal_texture.as_deref(), Some("wing_normal.png"));
        assert_eq!(wing.specular_texture, None);

        let body = &materials[1];
        assert_eq!(body.phong.ambient, Phong::default().ambient);
        assert_eq!(body.phong.specular, Phong::default().specular);
        assert_eq!(body.phong.shininess, 32.0);
        assert_eq!(body.phong.diffuse, [0.3, 0.3, 0.3]);
    }

    #[test]
    fn overrides_replace_only_given_slots() {
        let mut materials = parse_mtl(Cursor::new(LIBRARY)).unwrap();
        let overrides = HashMap::from([
            (
                "body".to_string(),
                TextureOverride {
                    diffuse: Some("body.jpg".to_string()),
                    specular: Some("body_reflect.jpg".to_string()),
                    normal: None,
                },
            ),
            (
                "missing".to_string(),
                TextureOverride {
                    diffuse: Some("never.jpg".to_string()),
                    ..Default::default()
                },
            ),
        ]);
        apply_overrides(&mut materials, &overrides);

        assert_eq!(materials[0].diffuse_texture.as_deref(), Some("wing.jpg"));
        assert_eq!(materials[1].diffuse_texture.as_deref(), Some("body.jpg"));
        assert_eq!(materials[1].specular_texture.as_deref(), Some("body_reflect.jpg"));
        assert_eq!(materials[1].normal_texture, None);
    }

    #[test]
    fn meshes_bind_by_name() {
        let materials = vec![MaterialDesc::named("wing"), MaterialDesc::named("body")];
        let mesh = |material: Option<&str>| MeshData {
            name: "part".to_string(),
            material: material.map(str::to_string),
            ..Default::default()
        };
        let meshes = vec![mesh(Some("body")), mesh(None), mesh(Some("ghost")), mesh(Some("wing"))];
        assert_eq!(
            bind_materials(&meshes, &materials),
            vec![Some(1), None, None, Some(0)]
        );
    }

    #[test]
    fn unbound_meshes_get_their_own_terms() {
        let unnamed = parse_mtl(Cursor::new("newmtl plain\n")).unwrap();
        assert_eq!(unnamed[0].phong.ambient, [0.1, 0.1, 0.1]);
        assert_eq!(unnamed[0].phong.diffuse, [0.7, 0.7, 0.7]);

        assert_eq!(Phong::FALLBACK.ambient, [0.2, 0.2, 0.2]);
        assert_eq!(Phong::FALLBACK.diffuse, [0.8, 0.8, 0.8]);
        assert_eq!(Phong::FALLBACK.specular, unnamed[0].phong.specular);
        assert_eq!(Phong::FALLBACK.shininess, unnamed[0].phong.shininess);
    }

    #[test]
    fn repeated_names_bind_to_first_definition() {
        let materials = vec![MaterialDesc::named("a"), MaterialDesc::named("a")];
        let meshes = vec![MeshData {
            material: Some("a".to_string()),
            ..Default::default()
        }];
        assert_eq!(bind_materials(&meshes, &materials), vec![Some(0)]);
    }
}
