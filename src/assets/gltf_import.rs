use super::material::{
    migrate_specular_glossiness, LegacyExtension, MaterialOrigin, SpecularGlossiness,
    StandardMaterial, TextureRef,
};
use super::mesh::MeshGeometry;
use super::AssetError;
use crate::render::ray::Aabb;
use glam::{Mat4, Vec3};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// One triangle primitive of the source asset, before recentering.
#[derive(Debug, Clone)]
pub struct ParsedMesh {
    /// `{node name or node<index>}/{primitive}`, unique within the asset.
    pub key: String,
    pub geometry: Arc<MeshGeometry>,
    /// Mesh-local to asset space (accumulated node transforms).
    pub node_transform: Mat4,
    pub material: StandardMaterial,
}

/// Immutable parse result, cached by source path and shared between instantiations.
#[derive(Debug, Clone)]
pub struct ParsedGarment {
    pub source: String,
    pub meshes: Vec<ParsedMesh>,
    /// Bounds in asset space, before recentering.
    pub bounds: Aabb,
}

pub fn parse_garment(bytes: &[u8], source: &str, base: Option<&Path>) -> Result<ParsedGarment, AssetError> {
    let parse_error = |err: gltf::Error| AssetError::Parse {
        path: source.to_string(),
        message: err.to_string(),
    };
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(parse_error)?;
    let buffers = gltf::import_buffers(&document, base, blob).map_err(parse_error)?;

    for tag in document.extensions_used() {
        match LegacyExtension::from_tag(tag) {
            Some(ext) => log::debug!("{}: translating {}", source, ext.tag()),
            None => log::debug!("{}: ignoring extension {}", source, tag),
        }
    }

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::Empty {
            path: source.to_string(),
        })?;

    let mut meshes = Vec::new();
    let mut keys = HashSet::new();
    for node in scene.nodes() {
        collect_node(&node, Mat4::IDENTITY, &buffers, &mut keys, &mut meshes);
    }

    let bounds = meshes
        .iter()
        .map(|mesh| mesh.geometry.bounds().transformed(&mesh.node_transform))
        .fold(Aabb::EMPTY, |acc, b| acc.union(&b));
    if meshes.is_empty() || bounds.is_empty() {
        return Err(AssetError::Empty {
            path: source.to_string(),
        });
    }

    log::debug!(
        "Parsed {}: {} meshes, {} triangles",
        source,
        meshes.len(),
        meshes.iter().map(|m| m.geometry.triangle_count()).sum::<usize>()
    );
    Ok(ParsedGarment {
        source: source.to_string(),
        meshes,
        bounds,
    })
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    keys: &mut HashSet<String>,
    out: &mut Vec<ParsedMesh>,
) {
    let global = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let node_name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("Skipping non-triangle primitive on {}", node_name);
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
            let geometry = match reader.read_indices() {
                Some(indices) => MeshGeometry::new(positions, indices.into_u32().collect()),
                None => MeshGeometry::unindexed(positions),
            };
            if geometry.triangle_count() == 0 {
                continue;
            }
            out.push(ParsedMesh {
                key: unique_key(keys, format!("{}/{}", node_name, primitive.index())),
                geometry: Arc::new(geometry),
                node_transform: global,
                material: normalize_material(&primitive.material()),
            });
        }
    }
    for child in node.children() {
        collect_node(&child, global, buffers, keys, out);
    }
}

fn unique_key(keys: &mut HashSet<String>, key: String) -> String {
    let mut candidate = key.clone();
    let mut n = 2;
    while !keys.insert(candidate.clone()) {
        candidate = format!("{key}#{n}");
        n += 1;
    }
    candidate
}

fn texture_ref(info: Option<gltf::texture::Info>) -> Option<TextureRef> {
    info.map(|info| TextureRef {
        index: info.texture().index(),
        tex_coord: info.tex_coord(),
    })
}

/// Metal/roughness materials pass through; specular/glossiness materials are migrated.
fn normalize_material(material: &gltf::Material) -> StandardMaterial {
    let name = material.name().map(str::to_string);
    if let Some(legacy) = material.pbr_specular_glossiness() {
        let legacy = SpecularGlossiness {
            diffuse_factor: legacy.diffuse_factor(),
            specular_factor: legacy.specular_factor(),
            glossiness_factor: legacy.glossiness_factor(),
            diffuse_texture: texture_ref(legacy.diffuse_texture()),
            specular_glossiness_texture: texture_ref(legacy.specular_glossiness_texture()),
        };
        return migrate_specular_glossiness(name, &legacy, material.double_sided());
    }
    let pbr = material.pbr_metallic_roughness();
    StandardMaterial {
        name,
        base_color: pbr.base_color_factor(),
        base_color_texture: texture_ref(pbr.base_color_texture()),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        metallic_roughness_texture: texture_ref(pbr.metallic_roughness_texture()),
        double_sided: material.double_sided(),
        origin: MaterialOrigin::MetallicRoughness,
    }
}
