//! Minimal glTF 2.0 writer for [`MemoryScene`] exports.
//!
//! Writes node/mesh/material structure only (no vertex buffers). `.gltf`
//! is the JSON document as-is; `.glb` wraps it in the binary container
//! (12-byte header + one JSON chunk padded to 4 bytes).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde_json::{Value, json};

use super::memory::MemoryScene;
use super::{ExportFormat, ExportOptions, TYPE_CAMERA, TYPE_LIGHT, TYPE_MESH};

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"

/// Build the glTF document for `targets` (object names).
pub fn document(scene: &MemoryScene, targets: &[String], options: &ExportOptions) -> Value {
    let mut nodes = Vec::new();
    let mut meshes: IndexMap<String, Value> = IndexMap::new();
    let mut materials: IndexMap<String, Value> = IndexMap::new();

    for record in targets.iter().filter_map(|name| scene.object_record(name)) {
        let skip = match record.type_tag.as_str() {
            TYPE_CAMERA => !options.cameras,
            TYPE_LIGHT => !options.lights,
            _ => false,
        };
        if skip {
            continue;
        }

        let mut node = json!({ "name": record.name });
        if record.type_tag == TYPE_MESH {
            let mesh_name = record.data.clone().unwrap_or_else(|| record.name.clone());
            let slot_materials: Vec<usize> = if options.materials {
                record
                    .materials
                    .iter()
                    .flatten()
                    .filter_map(|name| scene.material_record(name))
                    .map(|m| {
                        let entry = materials.entry(m.name.clone());
                        let index = entry.index();
                        entry.or_insert_with(|| {
                            json!({
                                "name": m.name,
                                "pbrMetallicRoughness": {
                                    "baseColorFactor": base_color(&m.diffuse_color),
                                    "metallicFactor": m.metallic,
                                    "roughnessFactor": m.roughness,
                                }
                            })
                        });
                        index
                    })
                    .collect()
            } else {
                Vec::new()
            };
            let entry = meshes.entry(mesh_name.clone());
            let mesh_index = entry.index();
            entry.or_insert_with(|| {
                let primitives: Vec<Value> = slot_materials
                    .iter()
                    .map(|m| json!({ "attributes": {}, "material": m }))
                    .collect();
                json!({ "name": mesh_name, "primitives": primitives })
            });
            node["mesh"] = json!(mesh_index);
        }
        nodes.push(node);
    }

    let roots: Vec<usize> = (0..nodes.len()).collect();
    json!({
        "asset": { "version": "2.0", "generator": concat!("scenery ", env!("CARGO_PKG_VERSION")) },
        "scene": 0,
        "scenes": [{ "name": "Scene", "nodes": roots }],
        "nodes": nodes,
        "meshes": meshes.into_values().collect::<Vec<_>>(),
        "materials": materials.into_values().collect::<Vec<_>>(),
        "extras": {
            "apply_transforms": options.apply_transforms,
            "tangents": options.tangents,
            "colors": options.colors,
            "animations": options.animations,
            "single_frame": options.single_frame,
        }
    })
}

/// glTF wants RGBA; pad RGB with opaque alpha.
fn base_color(diffuse: &[f32]) -> [f32; 4] {
    let mut rgba = [0.8, 0.8, 0.8, 1.0];
    for (dst, src) in rgba.iter_mut().zip(diffuse) {
        *dst = *src;
    }
    rgba
}

/// Wrap a JSON document in a GLB container.
pub fn to_glb(json: &[u8]) -> Vec<u8> {
    let padding = (4 - json.len() % 4) % 4;
    let chunk_len = json.len() + padding;
    let total_len = 12 + 8 + chunk_len;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_len as u32).to_le_bytes());
    out.extend_from_slice(&(chunk_len as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    out.resize(total_len, b' ');
    out
}

/// Export `targets` to `path` in the container given by `options.format`.
pub fn write(scene: &MemoryScene, targets: &[String], path: &Path, options: &ExportOptions) -> Result<()> {
    if targets.is_empty() {
        bail!("nothing to export: no objects selected");
    }
    let doc = document(scene, targets, options);
    let json = serde_json::to_vec(&doc).context("Failed to serialize glTF document")?;
    let bytes = match options.format {
        ExportFormat::Gltf => json,
        ExportFormat::Glb => to_glb(&json),
    };
    fs::write(path, bytes).with_context(|| format!("Failed to write export: {}", path.display()))?;
    Ok(())
}
