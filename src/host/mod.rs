//! Host collaborator interfaces.
//!
//! The scene graph belongs to the host application. The server only sees it
//! through the traits in this module:
//!
//! - [`SceneQuery`] - read-only enumeration and lookup by name
//! - [`SceneHost`] - the narrow mutation surface (script run, selection, export)
//! - [`FrameScheduler`] / [`TickHandler`] - the host's recurring-timer hook
//!
//! All of these are called on the host thread only. Nothing here is `Sync`
//! on purpose: the scene graph is not safe for concurrent access.
//!
//! [`memory::MemoryScene`] and [`timers::Timers`] are a complete in-process
//! host used by the `scenery` binary and the tests.

pub mod gltf;
pub mod memory;
pub mod script;
pub mod timers;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Object type tag for mesh objects.
pub const TYPE_MESH: &str = "MESH";
/// Object type tag for cameras.
pub const TYPE_CAMERA: &str = "CAMERA";
/// Object type tag for lights.
pub const TYPE_LIGHT: &str = "LIGHT";
/// Shader node type tag for image textures.
pub const NODE_TEX_IMAGE: &str = "TEX_IMAGE";

/// Kind of addressable scene-graph item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Object,
    Collection,
    Material,
    Mesh,
    Text,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Object => "Object",
            NodeKind::Collection => "Collection",
            NodeKind::Material => "Material",
            NodeKind::Mesh => "Mesh",
            NodeKind::Text => "Text",
        };
        f.write_str(label)
    }
}

/// One entry of a listing. `type_tag` is only set for objects.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub name: String,
    pub type_tag: Option<String>,
}

/// Object view with its outgoing references.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub name: String,
    pub type_tag: String,
    /// One entry per material slot; `None` for an empty slot.
    pub material_slots: Vec<Option<String>>,
    /// Name of the object's data block (mesh data for MESH objects).
    pub data: Option<String>,
}

/// Direct members of a collection (not recursive).
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub objects: Vec<NodeInfo>,
}

/// Node inside a material's shader graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub label: Option<String>,
    pub node_type: String,
}

/// Material view. `node_tree` is `None` when the material has no node graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInfo {
    pub name: String,
    pub diffuse_color: Vec<f32>,
    pub metallic: f32,
    pub roughness: f32,
    pub node_tree: Option<Vec<ShaderNode>>,
}

/// Embedded script asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInfo {
    pub name: String,
    pub body: String,
}

/// Read-only query interface over the host's scene graph.
///
/// Enumeration order is always the host's native order.
pub trait SceneQuery {
    /// Host version string.
    fn version(&self) -> String;

    /// Enumerate every item of `kind`.
    fn list(&self, kind: NodeKind) -> Vec<NodeInfo>;

    fn object(&self, name: &str) -> Option<ObjectInfo>;
    fn collection(&self, name: &str) -> Option<CollectionInfo>;
    fn material(&self, name: &str) -> Option<MaterialInfo>;
    fn text(&self, name: &str) -> Option<TextInfo>;

    /// Objects linked into the active scene, in scene order.
    fn scene_objects(&self) -> Vec<String>;

    /// Currently selected object names.
    fn selection(&self) -> Vec<String>;

    /// Folder the open project lives in, if it has been saved.
    fn project_folder(&self) -> Option<PathBuf>;
}

/// Override context for running a script.
///
/// Replaces the "active text" seen by the script without touching the
/// editor state the user sees.
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    pub text: &'a str,
}

/// Transmission file container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Single binary file
    #[default]
    Glb,
    /// JSON text file
    Gltf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Gltf => "gltf",
        }
    }
}

/// Fixed export parameters. Not configurable per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub use_selection: bool,
    pub apply_transforms: bool,
    pub tangents: bool,
    pub colors: bool,
    pub materials: bool,
    pub cameras: bool,
    pub lights: bool,
    pub animations: bool,
    pub single_frame: bool,
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            use_selection: true,
            apply_transforms: true,
            tangents: true,
            colors: true,
            materials: true,
            cameras: false,
            lights: false,
            animations: false,
            single_frame: true,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new(ExportFormat::default())
    }
}

/// Mutation interface. Every call here may change what [`SceneQuery`] returns.
pub trait SceneHost: SceneQuery {
    /// Execute a text asset's source with `ctx` as the override context.
    ///
    /// This runs arbitrary host-scripting code. It is a privileged capability
    /// with no sandboxing: anyone who can reach the server can run code in
    /// the host process.
    fn run_script(&mut self, ctx: &ScriptContext<'_>) -> anyhow::Result<()>;

    fn set_active_object(&mut self, name: Option<&str>);

    /// Add `names` to the selection.
    fn select(&mut self, names: &[String]);

    fn deselect_all(&mut self);

    /// Write a transmission file to `path`.
    fn export(&mut self, path: &Path, options: &ExportOptions) -> anyhow::Result<()>;
}

/// Recurring callback driven by the host's frame scheduler.
pub trait TickHandler {
    /// Run one bounded pass and return the delay until the next call.
    fn on_tick(&mut self, host: &mut dyn SceneHost) -> Duration;
}

/// Registration token returned by [`FrameScheduler::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// The host's recurring-timer facility.
pub trait FrameScheduler {
    fn register(&mut self, handler: Box<dyn TickHandler>) -> TimerId;

    /// Returns false if `id` was not registered.
    fn unregister(&mut self, id: TimerId) -> bool;
}
