//! Wavefront OBJ parsing.
//!
//! [`parse_obj`] turns OBJ text into CPU-side meshes ready for upload: faces are
//! triangulated, indices resolved and every unique position/texcoord/normal
//! combination becomes exactly one vertex per mesh. Nothing here touches the
//! GPU, which keeps the loader testable without a device.

use std::{collections::HashMap, io::BufRead, str::SplitWhitespace};

use thiserror::Error;

use crate::data_structures::model::ModelVertex;

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to read model data: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("model contains no drawable triangles")]
    Empty,
    #[error("invalid material library: {0}")]
    Material(#[from] tobj::LoadError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjLoadOptions {
    /// Store `1 - v` instead of `v`. wgpu samples with a top-left origin.
    pub flip_v: bool,
    /// Drop every triangle with a vertex below this height.
    pub clip_below: Option<f32>,
}

impl Default for ObjLoadOptions {
    fn default() -> Self {
        Self {
            flip_v: true,
            clip_below: None,
        }
    }
}

/// One drawable part of a model before upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Material name from the last `usemtl`, resolved against the MTL table later.
    pub material: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjStats {
    pub positions: usize,
    pub tex_coords: usize,
    pub normals: usize,
    pub faces: usize,
    pub skipped_faces: usize,
    pub clipped_triangles: usize,
    pub triangles: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjData {
    pub meshes: Vec<MeshData>,
    pub material_libs: Vec<String>,
    pub stats: ObjStats,
}

pub fn parse_obj<R: BufRead>(reader: R, options: &ObjLoadOptions) -> Result<ObjData, ObjError> {
    let mut parser = Parser::new(options);
    for (idx, line) in reader.lines().enumerate() {
        parser.parse_line(idx + 1, &line?)?;
    }
    parser.finish()
}

/// Cuts a line at a `#` that opens a token. A `#` inside a name such as
/// `usemtl wire#2` is kept.
fn strip_comment(text: &str) -> &str {
    let mut prev_is_space = true;
    for (i, c) in text.char_indices() {
        if c == '#' && prev_is_space {
            return &text[..i];
        }
        prev_is_space = c.is_whitespace();
    }
    text
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum NormalKey {
    Index(usize),
    /// Bit pattern of a generated face normal.
    Face([u32; 3]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    tex_coord: Option<usize>,
    normal: NormalKey,
}

/// A face corner with all indices already zero-based and range checked.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: usize,
    tex_coord: Option<usize>,
    normal: Option<usize>,
}

#[derive(Default)]
struct MeshBuilder {
    name: String,
    material: Option<String>,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
    lookup: HashMap<VertexKey, u32>,
}

impl MeshBuilder {
    fn new(name: String, material: Option<String>) -> Self {
        Self {
            name,
            material,
            ..Default::default()
        }
    }

    fn index_of(&mut self, key: VertexKey, vertex: impl FnOnce() -> ModelVertex) -> u32 {
        let vertices = &mut self.vertices;
        *self.lookup.entry(key).or_insert_with(|| {
            vertices.push(vertex());
            (vertices.len() - 1) as u32
        })
    }

    fn build(self) -> MeshData {
        MeshData {
            name: self.name,
            vertices: self.vertices,
            indices: self.indices,
            material: self.material,
        }
    }
}

struct Parser<'o> {
    options: &'o ObjLoadOptions,
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    current: MeshBuilder,
    meshes: Vec<MeshData>,
    material_libs: Vec<String>,
    stats: ObjStats,
}

impl<'o> Parser<'o> {
    fn new(options: &'o ObjLoadOptions) -> Self {
        Self {
            options,
            positions: Vec::new(),
            tex_coords: Vec::new(),
            normals: Vec::new(),
            current: MeshBuilder::new("default".to_string(), None),
            meshes: Vec::new(),
            material_libs: Vec::new(),
            stats: ObjStats::default(),
        }
    }

    fn parse_line(&mut self, line: usize, text: &str) -> Result<(), ObjError> {
        let content = strip_comment(text);
        let mut tokens = content.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(());
        };

        match keyword {
            "v" => {
                let v = parse_numbers(line, keyword, tokens, 3)?;
                self.positions.push([v[0], v[1], v[2]]);
            }
            "vt" => {
                let v = parse_numbers(line, keyword, tokens, 1)?;
                let u = v[0];
                let v = v.get(1).copied().unwrap_or(0.0);
                let v = if self.options.flip_v { 1.0 - v } else { v };
                self.tex_coords.push([u, v]);
            }
            "vn" => {
                let v = parse_numbers(line, keyword, tokens, 3)?;
                self.normals.push([v[0], v[1], v[2]]);
            }
            "f" => self.parse_face(line, tokens),
            "usemtl" => {
                let name = rest_of(tokens);
                if name.is_empty() {
                    log::warn!("line {line}: `usemtl` without a material name, ignoring");
                } else {
                    let mesh_name = self.current.name.clone();
                    self.start_mesh(mesh_name, Some(name));
                }
            }
            "o" | "g" => {
                let name = rest_of(tokens);
                let material = self.current.material.clone();
                self.start_mesh(name, material);
            }
            "mtllib" => self.material_libs.extend(tokens.map(str::to_string)),
            other => log::debug!("line {line}: ignoring unsupported statement `{other}`"),
        }
        Ok(())
    }

    fn start_mesh(&mut self, name: String, material: Option<String>) {
        let next = MeshBuilder::new(name, material);
        let finished = std::mem::replace(&mut self.current, next);
        if !finished.indices.is_empty() {
            self.meshes.push(finished.build());
        }
    }

    fn parse_face(&mut self, line: usize, tokens: SplitWhitespace) {
        self.stats.faces += 1;

        let mut corners = Vec::with_capacity(4);
        for token in tokens {
            match self.resolve_corner(line, token) {
                Some(corner) => corners.push(corner),
                None => {
                    self.stats.skipped_faces += 1;
                    return;
                }
            }
        }
        if corners.len() < 3 {
            log::warn!(
                "line {line}: face with {} vertices cannot be drawn, skipping",
                corners.len()
            );
            self.stats.skipped_faces += 1;
            return;
        }

        let positions: Vec<[f32; 3]> = corners.iter().map(|c| self.positions[c.position]).collect();
        let face_normal = newell_normal(&positions);

        // Fan triangulation around the first corner
        for i in 1..corners.len() - 1 {
            let triangle = [0, i, i + 1];
            if let Some(limit) = self.options.clip_below {
                if triangle.iter().any(|&c| positions[c][1] < limit) {
                    self.stats.clipped_triangles += 1;
                    continue;
                }
            }
            for c in triangle {
                let index = self.vertex_index(&corners[c], face_normal);
                self.current.indices.push(index);
            }
            self.stats.triangles += 1;
        }
    }

    fn resolve_corner(&self, line: usize, token: &str) -> Option<Corner> {
        let mut parts = token.split('/');
        let raw_position = parts.next().unwrap_or_default();
        let raw_tex_coord = parts.next().unwrap_or_default();
        let raw_normal = parts.next().unwrap_or_default();

        let Some(position) = resolve_index(raw_position, self.positions.len()) else {
            log::warn!(
                "line {line}: invalid position index `{raw_position}` (have {}), skipping face",
                self.positions.len()
            );
            return None;
        };

        let tex_coord = match raw_tex_coord {
            "" => None,
            raw => {
                let resolved = resolve_index(raw, self.tex_coords.len());
                if resolved.is_none() {
                    log::warn!("line {line}: invalid texture coordinate index `{raw}`, using (0, 0)");
                }
                resolved
            }
        };

        let normal = match raw_normal {
            "" => None,
            raw => {
                let resolved = resolve_index(raw, self.normals.len());
                if resolved.is_none() {
                    log::warn!("line {line}: invalid normal index `{raw}`, using the face normal");
                }
                resolved
            }
        };

        Some(Corner {
            position,
            tex_coord,
            normal,
        })
    }

    fn vertex_index(&mut self, corner: &Corner, face_normal: [f32; 3]) -> u32 {
        let key = VertexKey {
            position: corner.position,
            tex_coord: corner.tex_coord,
            normal: match corner.normal {
                Some(idx) => NormalKey::Index(idx),
                None => NormalKey::Face(face_normal.map(f32::to_bits)),
            },
        };
        let position = self.positions[corner.position];
        let tex_coords = corner.tex_coord.map_or([0.0, 0.0], |idx| self.tex_coords[idx]);
        let normal = corner.normal.map_or(face_normal, |idx| self.normals[idx]);

        self.current.index_of(key, || ModelVertex {
            position,
            tex_coords,
            normal,
            ..Default::default()
        })
    }

    fn finish(mut self) -> Result<ObjData, ObjError> {
        self.start_mesh(String::new(), None);
        self.stats.positions = self.positions.len();
        self.stats.tex_coords = self.tex_coords.len();
        self.stats.normals = self.normals.len();

        if self.meshes.is_empty() {
            return Err(ObjError::Empty);
        }
        Ok(ObjData {
            meshes: self.meshes,
            material_libs: self.material_libs,
            stats: self.stats,
        })
    }
}

fn parse_numbers(
    line: usize,
    keyword: &str,
    tokens: SplitWhitespace,
    required: usize,
) -> Result<Vec<f32>, ObjError> {
    let values = tokens
        .map(|token| {
            token.parse::<f32>().map_err(|_| ObjError::Parse {
                line,
                message: format!("malformed number `{token}` in `{keyword}` statement"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() < required {
        return Err(ObjError::Parse {
            line,
            message: format!(
                "`{keyword}` needs at least {required} components, found {}",
                values.len()
            ),
        });
    }
    Ok(values)
}

fn rest_of(tokens: SplitWhitespace) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}

/// Resolves a one-based or negative (relative to the end) OBJ index.
fn resolve_index(raw: &str, len: usize) -> Option<usize> {
    let idx: i64 = raw.parse().ok()?;
    let magnitude = usize::try_from(idx.unsigned_abs()).ok()?;
    match idx {
        0 => None,
        i if i > 0 && magnitude <= len => Some(magnitude - 1),
        i if i < 0 && magnitude <= len => Some(len - magnitude),
        _ => None,
    }
}

/// Newell's method; stable for non-planar and concave polygons.
fn newell_normal(positions: &[[f32; 3]]) -> [f32; 3] {
    let mut normal = [0.0f32; 3];
    for (i, current) in positions.iter().enumerate() {
        let next = positions[(i + 1) % positions.len()];
        normal[0] += (current[1] - next[1]) * (current[2] + next[2]);
        normal[1] += (current[2] - next[2]) * (current[0] + next[0]);
        normal[2] += (current[0] - next[0]) * (current[1] + next[1]);
    }
    let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
    if length <= f32::EPSILON {
        return [0.0, 1.0, 0.0];
    }
    normal.map(|c| c / length)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn parse(src: &str) -> Result<ObjData, ObjError> {
        parse_obj(Cursor::new(src), &ObjLoadOptions::default())
    }

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_is_fan_triangulated_with_shared_corners() {
        let data = parse(QUAD).unwrap();
        assert_eq!(data.meshes.len(), 1);
        let mesh = &data.meshes[0];
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(data.stats.triangles, 2);
    }

    #[test]
    fn v_coordinate_is_flipped_by_default() {
        let data = parse(QUAD).unwrap();
        assert_eq!(data.meshes[0].vertices[0].tex_coords, [0.0, 1.0]);

        let options = ObjLoadOptions {
            flip_v: false,
            ..Default::default()
        };
        let data = parse_obj(Cursor::new(QUAD), &options).unwrap();
        assert_eq!(data.meshes[0].vertices[0].tex_coords, [0.0, 0.0]);
    }

    #[test]
    fn negative_indices_are_relative_to_the_end() {
        let data = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        let positions: Vec<_> = data.meshes[0].vertices.iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn relative_indices_use_the_list_length_at_the_face() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 5 5 5\nf 1 2 -1\n";
        let data = parse(src).unwrap();
        let mesh = &data.meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.vertices[mesh.indices[5] as usize].position, [5.0, 5.0, 5.0]);
    }

    #[test]
    fn identical_corners_are_deduplicated() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\nf 2//1 4//1 3//1\n";
        let data = parse(src).unwrap();
        assert_eq!(data.meshes[0].vertices.len(), 4);
        assert_eq!(data.meshes[0].indices, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn same_position_with_other_tex_coord_is_a_new_vertex() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 1\nf 1/1 2/1 3/1\nf 1/2 2/1 3/1\n";
        let data = parse(src).unwrap();
        assert_eq!(data.meshes[0].vertices.len(), 4);
    }

    #[test]
    fn missing_normals_are_generated_per_face() {
        let data = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        for vertex in &data.meshes[0].vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn degenerate_face_gets_up_normal() {
        let data = parse("v 0 0 0\nv 1 0 0\nv 2 0 0\nf 1 2 3\n").unwrap();
        assert_eq!(data.meshes[0].vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn invalid_position_index_skips_the_face() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\nf 0 1 2\nf 1 2 3\n";
        let data = parse(src).unwrap();
        assert_eq!(data.stats.faces, 3);
        assert_eq!(data.stats.skipped_faces, 2);
        assert_eq!(data.meshes[0].indices.len(), 3);
    }

    #[test]
    fn invalid_tex_coord_and_normal_fall_back() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nf 1/7/4 2/1 3/1\n";
        let data = parse(src).unwrap();
        let first = data.meshes[0].vertices[0];
        assert_eq!(first.tex_coords, [0.0, 0.0]);
        assert_eq!(first.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn faces_with_two_vertices_are_skipped() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\nf 1 2 3\n";
        let data = parse(src).unwrap();
        assert_eq!(data.stats.skipped_faces, 1);
        assert_eq!(data.stats.triangles, 1);
    }

    #[test]
    fn usemtl_and_groups_split_meshes() {
        let src = "\
mtllib wings.mtl body.mtl
v 0 0 0
v 1 0 0
v 0 1 0
o butterfly
usemtl wing
f 1 2 3
g body
f 1 2 3
usemtl body
f 3 2 1
usemtl unused
";
        let data = parse(src).unwrap();
        assert_eq!(data.material_libs, vec!["wings.mtl", "body.mtl"]);
        let summary: Vec<_> = data
            .meshes
            .iter()
            .map(|m| (m.name.as_str(), m.material.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("butterfly", Some("wing")),
                ("body", Some("wing")),
                ("body", Some("body")),
            ]
        );
    }

    #[test]
    fn clip_below_drops_low_triangles() {
        let src = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 -1 0
v 1 -1 0
f 1 2 3
f 4 5 1
";
        let options = ObjLoadOptions {
            clip_below: Some(-0.1),
            ..Default::default()
        };
        let data = parse_obj(Cursor::new(src), &options).unwrap();
        assert_eq!(data.stats.triangles, 1);
        assert_eq!(data.stats.clipped_triangles, 1);
        assert!(data.meshes[0].vertices.iter().all(|v| v.position[1] >= -0.1));
    }

    #[test]
    fn malformed_vertex_is_an_error_with_line_number() {
        let err = parse("v 0 0 0\nv 1 x 0\n").unwrap_err();
        match err {
            ObjError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(parse("vn 1 0\n"), Err(ObjError::Parse { line: 1, .. })));
    }

    #[test]
    fn comments_and_unknown_statements_are_ignored() {
        let src = "# exported\n\ns 1\nv 0 0 0 # origin\nv 1 0 0\nv 0 1 0\nl 1 2\nf 1 2 3\n";
        let data = parse(src).unwrap();
        assert_eq!(data.stats.positions, 3);
        assert_eq!(data.stats.triangles, 1);
    }

    #[test]
    fn hash_inside_a_name_is_not_a_comment() {
        let src = "\
mtllib parts#1.mtl # library
v 0 0 0
v 1 0 0
v 0 1 0
o wing#left
usemtl wire#2 #trailing note
f 1 2 3
";
        let data = parse(src).unwrap();
        assert_eq!(data.material_libs, vec!["parts#1.mtl"]);
        assert_eq!(data.meshes[0].name, "wing#left");
        assert_eq!(data.meshes[0].material.as_deref(), Some("wire#2"));
        assert_eq!(strip_comment("#only a comment"), "");
        assert_eq!(strip_comment("v 1 2 3\t#x"), "v 1 2 3\t");
    }

    #[test]
    fn file_without_faces_is_empty() {
        assert!(matches!(parse("v 0 0 0\n"), Err(ObjError::Empty)));
        assert!(matches!(parse(""), Err(ObjError::Empty)));
    }

    #[test]
    fn resolve_index_bounds() {
        assert_eq!(resolve_index("1", 3), Some(0));
        assert_eq!(resolve_index("3", 3), Some(2));
        assert_eq!(resolve_index("4", 3), None);
        assert_eq!(resolve_index("-1", 3), Some(2));
        assert_eq!(resolve_index("-4", 3), None);
        assert_eq!(resolve_index("0", 3), None);
        assert_eq!(resolve_index("x", 3), None);
    }
}
