use std::{collections::HashMap, fs, path::Path};

use luminous_field::resources::{
    self, ModelLoadOptions, mtl::TextureOverride, obj::ObjLoadOptions,
};

const LIBRARY: &str = "\
newmtl wing
Kd 0.5 0.5 0.5
Ns 16
map_Kd wing.png

newmtl body
Kd 1 0 0
";

// A quad using `wing`, then a triangle hanging below the ground that names a
// material no library defines.
const MODEL: &str = "\
mtllib wings.mtl missing.mtl
v -1 0 0
v 1 0 0
v 1 1 0
v -1 1 0
v 0 -1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
o butterfly
usemtl wing
f 1/1 2/2 3/3 4/4
usemtl nothing_here
f -5 -4 -1
";

fn write_model(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("wings.mtl"), LIBRARY).unwrap();
    let path = dir.join("butterfly.obj");
    fs::write(&path, MODEL).unwrap();
    path
}

#[tokio::test]
async fn resolves_libraries_and_binds_materials() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path());

    let scene = resources::read_obj(&path, &ModelLoadOptions::default())
        .await
        .unwrap();

    assert_eq!(scene.base_dir, dir.path());
    assert_eq!(scene.data.material_libs, ["wings.mtl", "missing.mtl"]);

    // the missing library is skipped, the other one still loads
    let names: Vec<_> = scene.materials.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["wing", "body"]);
    assert_eq!(scene.materials[0].diffuse_texture.as_deref(), Some("wing.png"));
    assert_eq!(scene.materials[0].phong.shininess, 16.0);

    assert_eq!(scene.data.meshes.len(), 2);
    assert_eq!(scene.bindings, [Some(0), None]);

    let quad = &scene.data.meshes[0];
    assert_eq!(quad.name, "butterfly");
    assert_eq!(quad.vertices.len(), 4);
    assert_eq!(quad.indices.len(), 6);
    assert_eq!(scene.data.stats.triangles, 3);
}

#[tokio::test]
async fn overrides_fill_in_textures() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path());

    let options = ModelLoadOptions {
        texture_overrides: HashMap::from([
            (
                "wing".to_string(),
                TextureOverride {
                    specular: Some("wing_reflect.jpg".to_string()),
                    ..Default::default()
                },
            ),
            (
                "body".to_string(),
                TextureOverride {
                    diffuse: Some("body.jpg".to_string()),
                    ..Default::default()
                },
            ),
        ]),
        ..Default::default()
    };
    let scene = resources::read_obj(&path, &options).await.unwrap();

    let wing = &scene.materials[0];
    assert_eq!(wing.diffuse_texture.as_deref(), Some("wing.png"));
    assert_eq!(wing.specular_texture.as_deref(), Some("wing_reflect.jpg"));
    assert_eq!(wing.normal_texture, None);
    assert_eq!(scene.materials[1].diffuse_texture.as_deref(), Some("body.jpg"));
}

#[tokio::test]
async fn clipping_drops_geometry_below_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(dir.path());

    let options = ModelLoadOptions {
        obj: ObjLoadOptions {
            clip_below: Some(-0.1),
            ..Default::default()
        },
        ..Default::default()
    };
    let scene = resources::read_obj(&path, &options).await.unwrap();

    assert_eq!(scene.data.meshes.len(), 1);
    assert_eq!(scene.data.stats.clipped_triangles, 1);
    assert_eq!(scene.bindings, [Some(0)]);
    assert!(
        scene.data.meshes[0]
            .vertices
            .iter()
            .all(|v| v.position[1] >= -0.1)
    );
}

#[tokio::test]
async fn missing_and_broken_models_are_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = resources::read_obj(&dir.path().join("nope.obj"), &ModelLoadOptions::default()).await;
    assert!(missing.is_err());

    let broken = dir.path().join("broken.obj");
    fs::write(&broken, "v 0 0 0\nv 1 zero 0\n").unwrap();
    let err = resources::read_obj(&broken, &ModelLoadOptions::default())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("line 2"));

    let empty = dir.path().join("empty.obj");
    fs::write(&empty, "# nothing to draw\nv 0 0 0\n").unwrap();
    assert!(resources::read_obj(&empty, &ModelLoadOptions::default()).await.is_err());
}

#[tokio::test]
async fn latin1_bytes_in_comments_and_names_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("alas.mtl"),
        b"# Materiales del a\xf1o 2019\nnewmtl ala\nKd 0.5 0.5 0.5\n",
    )
    .unwrap();
    let path = dir.path().join("mariposa.obj");
    fs::write(
        &path,
        b"# Exportado por Mariposa a\xf1o 2019\nmtllib alas.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\no Cuerpo_peque\xf1o\nusemtl ala\nf 1 2 3\n",
    )
    .unwrap();

    let scene = resources::read_obj(&path, &ModelLoadOptions::default())
        .await
        .unwrap();

    assert_eq!(scene.data.stats.triangles, 1);
    assert_eq!(scene.materials.len(), 1);
    assert_eq!(scene.materials[0].name, "ala");
    assert_eq!(scene.bindings, [Some(0)]);
    assert!(scene.data.meshes[0].name.starts_with("Cuerpo_peque"));
}
