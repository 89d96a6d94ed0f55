//! In-memory glTF documents for loader tests.

use super::loader::AssetFetcher;
use super::AssetError;
use base64::Engine as _;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

pub struct FixtureMesh {
    name: String,
    translation: [f32; 3],
    positions: Vec<[f32; 3]>,
    indices: Vec<u32>,
    spec_gloss: Option<([f32; 4], f32)>,
}

impl FixtureMesh {
    /// Box of `size` whose node is translated to `center`. An empty name leaves the node unnamed.
    pub fn cuboid(name: &str, center: [f32; 3], size: [f32; 3]) -> Self {
        let [hx, hy, hz] = size.map(|s| s * 0.5);
        let positions = vec![
            [-hx, -hy, -hz],
            [hx, -hy, -hz],
            [hx, hy, -hz],
            [-hx, hy, -hz],
            [-hx, -hy, hz],
            [hx, -hy, hz],
            [hx, hy, hz],
            [-hx, hy, hz],
        ];
        #[rustfmt::skip]
        let indices = vec![
            4, 5, 6, 4, 6, 7,
            1, 0, 3, 1, 3, 2,
            5, 1, 2, 5, 2, 6,
            0, 4, 7, 0, 7, 3,
            7, 6, 2, 7, 2, 3,
            0, 1, 5, 0, 5, 4,
        ];
        Self {
            name: name.to_string(),
            translation: center,
            positions,
            indices,
            spec_gloss: None,
        }
    }

    pub fn spec_gloss(mut self, diffuse: [f32; 4], glossiness: f32) -> Self {
        self.spec_gloss = Some((diffuse, glossiness));
        self
    }
}

#[derive(Default)]
pub struct GltfFixture {
    meshes: Vec<FixtureMesh>,
}

impl GltfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(mut self, mesh: FixtureMesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// `.gltf` JSON with one embedded base64 buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut views = Vec::new();
        let mut accessors = Vec::new();
        let mut meshes = Vec::new();
        let mut nodes = Vec::new();
        let mut materials = Vec::new();
        let mut uses_spec_gloss = false;

        for (i, mesh) in self.meshes.iter().enumerate() {
            let position_offset = buffer.len();
            for p in &mesh.positions {
                for c in p {
                    buffer.extend_from_slice(&c.to_le_bytes());
                }
            }
            let index_offset = buffer.len();
            for index in &mesh.indices {
                buffer.extend_from_slice(&index.to_le_bytes());
            }

            let (min, max) = mesh.positions.iter().fold(
                ([f32::MAX; 3], [f32::MIN; 3]),
                |(mut lo, mut hi), p| {
                    for axis in 0..3 {
                        lo[axis] = lo[axis].min(p[axis]);
                        hi[axis] = hi[axis].max(p[axis]);
                    }
                    (lo, hi)
                },
            );

            views.push(json!({
                "buffer": 0,
                "byteOffset": position_offset,
                "byteLength": index_offset - position_offset,
            }));
            views.push(json!({
                "buffer": 0,
                "byteOffset": index_offset,
                "byteLength": buffer.len() - index_offset,
            }));
            accessors.push(json!({
                "bufferView": i * 2,
                "componentType": 5126,
                "count": mesh.positions.len(),
                "type": "VEC3",
                "min": min,
                "max": max,
            }));
            accessors.push(json!({
                "bufferView": i * 2 + 1,
                "componentType": 5125,
                "count": mesh.indices.len(),
                "type": "SCALAR",
            }));

            let material = match mesh.spec_gloss {
                Some((diffuse, glossiness)) => {
                    uses_spec_gloss = true;
                    json!({
                        "extensions": {
                            "KHR_materials_pbrSpecularGlossiness": {
                                "diffuseFactor": diffuse,
                                "glossinessFactor": glossiness,
                            }
                        }
                    })
                }
                None => json!({
                    "pbrMetallicRoughness": {
                        "baseColorFactor": [1.0, 1.0, 1.0, 1.0],
                        "metallicFactor": 0.0,
                        "roughnessFactor": 0.8,
                    }
                }),
            };
            materials.push(material);
            meshes.push(json!({
                "primitives": [{
                    "attributes": { "POSITION": i * 2 },
                    "indices": i * 2 + 1,
                    "material": i,
                }]
            }));
            let mut node = json!({ "mesh": i, "translation": mesh.translation });
            if !mesh.name.is_empty() {
                node["name"] = Value::from(mesh.name.clone());
            }
            nodes.push(node);
        }

        let mut document = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": (0..nodes.len()).collect::<Vec<_>>() }],
            "nodes": nodes,
            "meshes": meshes,
            "materials": materials,
            "accessors": accessors,
            "bufferViews": views,
        });
        if !buffer.is_empty() {
            document["buffers"] = json!([{
                "byteLength": buffer.len(),
                "uri": format!(
                    "data:application/octet-stream;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(&buffer)
                ),
            }]);
        }
        if uses_spec_gloss {
            document["extensionsUsed"] = json!(["KHR_materials_pbrSpecularGlossiness"]);
        }
        serde_json::to_vec(&document).unwrap()
    }
}

/// In-memory fetcher whose individual paths can be held back to order completions.
#[derive(Default)]
pub struct MemoryFetcher {
    assets: HashMap<String, Vec<u8>>,
    held: Mutex<HashSet<String>>,
    released: Condvar,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.assets.insert(path.to_string(), bytes);
        self
    }

    pub fn hold(&self, path: &str) {
        self.held.lock().unwrap().insert(path.to_string());
    }

    pub fn release(&self, path: &str) {
        self.held.lock().unwrap().remove(path);
        self.released.notify_all();
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let mut held = self.held.lock().unwrap();
        while held.contains(path) {
            held = self.released.wait(held).unwrap();
        }
        drop(held);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.assets.get(path).cloned().ok_or_else(|| AssetError::Fetch {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such fixture"),
        })
    }
}
