//! In-memory host: a complete scene graph owned by the process itself.
//!
//! Used by the `scenery` binary (loaded from a JSON scene description) and by
//! tests. Storage is `IndexMap` keyed by name, so enumeration order is
//! insertion order, like a host's native data-block order.
//!
//! # Scene file
//!
//! ```json
//! {
//!   "project_folder": "/projects/demo",
//!   "objects": [{"name": "Cube", "type": "MESH", "materials": ["Red"], "data": "Cube"}],
//!   "meshes": ["Cube"],
//!   "materials": [{"name": "Red", "diffuse_color": [1, 0, 0, 1], "nodes": [{"label": "Albedo", "type": "TEX_IMAGE"}]}],
//!   "collections": [{"name": "Collection", "objects": ["Cube"]}],
//!   "texts": [{"name": "hello.py", "body": "log hello from {self}"}]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::script::{self, Command};
use super::{
    CollectionInfo, ExportOptions, MaterialInfo, NODE_TEX_IMAGE, NodeInfo, NodeKind, ObjectInfo, SceneHost,
    SceneQuery, ScriptContext, ShaderNode, TYPE_CAMERA, TYPE_LIGHT, TYPE_MESH, TextInfo, gltf,
};

fn default_version() -> String {
    concat!("scenery-memory ", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_type() -> String {
    TYPE_MESH.to_string()
}

fn default_diffuse() -> Vec<f32> {
    vec![0.8, 0.8, 0.8, 1.0]
}

fn default_roughness() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub type_tag: String,
    /// Material slots; `null` marks an empty slot.
    #[serde(default)]
    pub materials: Vec<Option<String>>,
    /// Data block name (mesh name for MESH objects)
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderNodeRecord {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    #[serde(default = "default_diffuse")]
    pub diffuse_color: Vec<f32>,
    #[serde(default)]
    pub metallic: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    /// Shader node graph; absent for materials without one.
    #[serde(default)]
    pub nodes: Option<Vec<ShaderNodeRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub name: String,
    #[serde(default)]
    pub body: String,
}

/// On-disk scene description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub version: Option<String>,
    pub project_folder: Option<PathBuf>,
    pub objects: Vec<ObjectRecord>,
    pub meshes: Vec<String>,
    pub materials: Vec<MaterialRecord>,
    pub collections: Vec<CollectionRecord>,
    pub texts: Vec<TextRecord>,
    /// Objects linked into the active scene. Defaults to every object.
    pub scene: Option<Vec<String>>,
    /// Text shown in the editor.
    pub active_text: Option<String>,
}

/// In-memory scene graph implementing [`SceneHost`].
#[derive(Debug, Clone)]
pub struct MemoryScene {
    version: String,
    project_folder: Option<PathBuf>,
    objects: IndexMap<String, ObjectRecord>,
    meshes: IndexSet<String>,
    materials: IndexMap<String, MaterialRecord>,
    collections: IndexMap<String, CollectionRecord>,
    texts: IndexMap<String, TextRecord>,
    scene: Vec<String>,
    selection: Vec<String>,
    active_object: Option<String>,
    active_text: Option<String>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self {
            version: default_version(),
            project_folder: None,
            objects: IndexMap::new(),
            meshes: IndexSet::new(),
            materials: IndexMap::new(),
            collections: IndexMap::new(),
            texts: IndexMap::new(),
            scene: Vec::new(),
            selection: Vec::new(),
            active_object: None,
            active_text: None,
        }
    }
}

impl MemoryScene {
    pub fn from_file(file: SceneFile) -> Self {
        let scene = file
            .scene
            .unwrap_or_else(|| file.objects.iter().map(|o| o.name.clone()).collect());
        Self {
            version: file.version.unwrap_or_else(default_version),
            project_folder: file.project_folder,
            objects: file.objects.into_iter().map(|o| (o.name.clone(), o)).collect(),
            meshes: file.meshes.into_iter().collect(),
            materials: file.materials.into_iter().map(|m| (m.name.clone(), m)).collect(),
            collections: file.collections.into_iter().map(|c| (c.name.clone(), c)).collect(),
            texts: file.texts.into_iter().map(|t| (t.name.clone(), t)).collect(),
            scene,
            selection: Vec::new(),
            active_object: None,
            active_text: file.active_text,
        }
    }

    /// Load a scene description from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("Failed to read scene file: {}", path.display()))?;
        let file: SceneFile =
            serde_json::from_str(&json).with_context(|| format!("Failed to parse scene file: {}", path.display()))?;
        info!(
            "Loaded scene {}: {} objects, {} materials, {} texts",
            path.display(),
            file.objects.len(),
            file.materials.len(),
            file.texts.len()
        );
        Ok(Self::from_file(file))
    }

    /// Small built-in scene: a cube with a red material, a camera and a light.
    pub fn demo() -> Self {
        let object = |name: &str, type_tag: &str, materials: Vec<Option<String>>, data: Option<&str>| ObjectRecord {
            name: name.to_string(),
            type_tag: type_tag.to_string(),
            materials,
            data: data.map(str::to_string),
        };
        Self::from_file(SceneFile {
            objects: vec![
                object("Cube", TYPE_MESH, vec![Some("Red".into())], Some("Cube")),
                object("Camera", TYPE_CAMERA, Vec::new(), Some("Camera")),
                object("Light", TYPE_LIGHT, Vec::new(), Some("Light")),
            ],
            meshes: vec!["Cube".into()],
            materials: vec![MaterialRecord {
                name: "Red".into(),
                diffuse_color: vec![0.8, 0.0, 0.0, 1.0],
                metallic: 0.0,
                roughness: 0.4,
                nodes: Some(vec![
                    ShaderNodeRecord { label: None, node_type: "BSDF_PRINCIPLED".into() },
                    ShaderNodeRecord { label: Some("Albedo".into()), node_type: NODE_TEX_IMAGE.into() },
                    ShaderNodeRecord { label: None, node_type: "OUTPUT_MATERIAL".into() },
                ]),
            }],
            collections: vec![CollectionRecord {
                name: "Collection".into(),
                objects: vec!["Cube".into(), "Camera".into(), "Light".into()],
            }],
            texts: vec![TextRecord { name: "hello.py".into(), body: "log hello from {self}\n".into() }],
            active_text: Some("hello.py".into()),
            ..Default::default()
        })
    }

    pub fn set_project_folder(&mut self, folder: impl Into<PathBuf>) {
        self.project_folder = Some(folder.into());
    }

    /// Text shown in the editor (unaffected by script override contexts).
    pub fn active_text(&self) -> Option<&str> {
        self.active_text.as_deref()
    }

    pub fn active_object(&self) -> Option<&str> {
        self.active_object.as_deref()
    }

    pub fn insert_object(&mut self, record: ObjectRecord, link_to_scene: bool) {
        if link_to_scene && !self.scene.contains(&record.name) {
            self.scene.push(record.name.clone());
        }
        self.objects.insert(record.name.clone(), record);
    }

    pub fn insert_material(&mut self, record: MaterialRecord) {
        self.materials.insert(record.name.clone(), record);
    }

    pub fn insert_text(&mut self, name: &str, body: &str) {
        self.texts.insert(name.to_string(), TextRecord { name: name.to_string(), body: body.to_string() });
    }

    pub fn insert_collection(&mut self, record: CollectionRecord) {
        self.collections.insert(record.name.clone(), record);
    }

    pub(crate) fn object_record(&self, name: &str) -> Option<&ObjectRecord> {
        self.objects.get(name)
    }

    pub(crate) fn material_record(&self, name: &str) -> Option<&MaterialRecord> {
        self.materials.get(name)
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::AddObject { name, type_tag } => {
                if self.objects.contains_key(&name) {
                    bail!("object '{}' already exists", name);
                }
                let data = (type_tag == TYPE_MESH).then(|| {
                    self.meshes.insert(name.clone());
                    name.clone()
                });
                self.insert_object(ObjectRecord { name, type_tag, materials: Vec::new(), data }, true);
            }
            Command::DeleteObject(name) => {
                if self.objects.shift_remove(&name).is_none() {
                    bail!("no object named '{}'", name);
                }
                self.scene.retain(|n| *n != name);
                self.selection.retain(|n| *n != name);
                for collection in self.collections.values_mut() {
                    collection.objects.retain(|n| *n != name);
                }
                if self.active_object.as_deref() == Some(name.as_str()) {
                    self.active_object = None;
                }
            }
            Command::RenameObject { from, to } => {
                if self.objects.contains_key(&to) {
                    bail!("object '{}' already exists", to);
                }
                let Some(index) = self.objects.get_index_of(&from) else {
                    bail!("no object named '{}'", from);
                };
                let Some((_, mut record)) = self.objects.shift_remove_index(index) else {
                    bail!("no object named '{}'", from);
                };
                record.name = to.clone();
                self.objects.shift_insert(index, to.clone(), record);

                let rename = |n: &mut String| {
                    if *n == from {
                        *n = to.clone();
                    }
                };
                self.scene.iter_mut().for_each(rename);
                self.selection.iter_mut().for_each(rename);
                self.collections.values_mut().flat_map(|c| c.objects.iter_mut()).for_each(rename);
                self.active_object.iter_mut().for_each(rename);
            }
            Command::Link { object, collection } => {
                if !self.objects.contains_key(&object) {
                    bail!("no object named '{}'", object);
                }
                let Some(target) = self.collections.get_mut(&collection) else {
                    bail!("no collection named '{}'", collection);
                };
                if !target.objects.contains(&object) {
                    target.objects.push(object);
                }
            }
            Command::SetMetallic { material, value } => self.material_mut(&material)?.metallic = value,
            Command::SetRoughness { material, value } => self.material_mut(&material)?.roughness = value,
            Command::Log(message) => info!("[script] {}", message),
            Command::Fail(message) => bail!("{}", message),
        }
        Ok(())
    }

    fn material_mut(&mut self, name: &str) -> Result<&mut MaterialRecord> {
        match self.materials.get_mut(name) {
            Some(material) => Ok(material),
            None => bail!("no material named '{}'", name),
        }
    }
}

impl SceneQuery for MemoryScene {
    fn version(&self) -> String {
        self.version.clone()
    }

    fn list(&self, kind: NodeKind) -> Vec<NodeInfo> {
        let plain = |name: &String| NodeInfo { name: name.clone(), type_tag: None };
        match kind {
            NodeKind::Object => self
                .objects
                .values()
                .map(|o| NodeInfo { name: o.name.clone(), type_tag: Some(o.type_tag.clone()) })
                .collect(),
            NodeKind::Collection => self.collections.keys().map(plain).collect(),
            NodeKind::Material => self.materials.keys().map(plain).collect(),
            NodeKind::Mesh => self.meshes.iter().map(plain).collect(),
            NodeKind::Text => self.texts.keys().map(plain).collect(),
        }
    }

    fn object(&self, name: &str) -> Option<ObjectInfo> {
        self.objects.get(name).map(|o| ObjectInfo {
            name: o.name.clone(),
            type_tag: o.type_tag.clone(),
            material_slots: o.materials.clone(),
            data: o.data.clone(),
        })
    }

    fn collection(&self, name: &str) -> Option<CollectionInfo> {
        self.collections.get(name).map(|c| CollectionInfo {
            name: c.name.clone(),
            objects: c
                .objects
                .iter()
                .filter_map(|member| self.objects.get(member))
                .map(|o| NodeInfo { name: o.name.clone(), type_tag: Some(o.type_tag.clone()) })
                .collect(),
        })
    }

    fn material(&self, name: &str) -> Option<MaterialInfo> {
        self.materials.get(name).map(|m| MaterialInfo {
            name: m.name.clone(),
            diffuse_color: m.diffuse_color.clone(),
            metallic: m.metallic,
            roughness: m.roughness,
            node_tree: m.nodes.as_ref().map(|nodes| {
                nodes
                    .iter()
                    .map(|n| ShaderNode { label: n.label.clone(), node_type: n.node_type.clone() })
                    .collect()
            }),
        })
    }

    fn text(&self, name: &str) -> Option<TextInfo> {
        self.texts.get(name).map(|t| TextInfo { name: t.name.clone(), body: t.body.clone() })
    }

    fn scene_objects(&self) -> Vec<String> {
        self.scene.clone()
    }

    fn selection(&self) -> Vec<String> {
        self.selection.clone()
    }

    fn project_folder(&self) -> Option<PathBuf> {
        self.project_folder.clone()
    }
}

impl SceneHost for MemoryScene {
    fn run_script(&mut self, ctx: &ScriptContext<'_>) -> Result<()> {
        let Some(text) = self.texts.get(ctx.text) else {
            bail!("no text named '{}'", ctx.text);
        };
        let commands = script::parse(&text.body, ctx.text)?;
        debug!("Running text '{}' ({} commands)", ctx.text, commands.len());
        for command in commands {
            self.apply(command).with_context(|| format!("in text '{}'", ctx.text))?;
        }
        Ok(())
    }

    fn set_active_object(&mut self, name: Option<&str>) {
        self.active_object = name.filter(|n| self.objects.contains_key(*n)).map(str::to_string);
    }

    fn select(&mut self, names: &[String]) {
        for name in names {
            if self.objects.contains_key(name) && !self.selection.contains(name) {
                self.selection.push(name.clone());
            }
        }
    }

    fn deselect_all(&mut self) {
        self.selection.clear();
    }

    fn export(&mut self, path: &Path, options: &ExportOptions) -> Result<()> {
        let targets = if options.use_selection { self.selection.clone() } else { self.scene.clone() };
        gltf::write(self, &targets, path, options)
    }
}
