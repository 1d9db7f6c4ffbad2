//! Response assembler: JSON projections of resolved nodes.
//!
//! Optional keys are omitted, never null: `materials` appears only when the
//! object has material slots, `mesh` only for MESH objects.

use serde::Serialize;

use super::ids::IdTable;
use crate::host::{
    CollectionInfo, MaterialInfo, NODE_TEX_IMAGE, NodeInfo, NodeKind, ObjectInfo, SceneQuery, TYPE_MESH,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRef {
    pub name: String,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedNodeRef {
    pub name: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub type_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectResponse {
    pub object: TypedNodeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<Vec<NodeRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureRef {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialBody {
    pub name: String,
    pub id: u64,
    pub diffuse_color: Vec<f32>,
    pub metallic: f32,
    pub roughness: f32,
    pub textures: Vec<TextureRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialResponse {
    pub material: MaterialBody,
}

/// `/collection/{name}` and `/objects` share this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectList {
    pub objects: Vec<TypedNodeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionList {
    pub collections: Vec<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialList {
    pub materials: Vec<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextList {
    pub texts: Vec<NodeRef>,
}

fn node_ref(ids: &mut IdTable, kind: NodeKind, name: &str) -> NodeRef {
    NodeRef { name: name.to_string(), id: ids.id(kind, name) }
}

fn typed_ref(ids: &mut IdTable, info: &NodeInfo) -> TypedNodeRef {
    TypedNodeRef {
        name: info.name.clone(),
        id: ids.id(NodeKind::Object, &info.name),
        type_tag: info.type_tag.clone().unwrap_or_default(),
    }
}

fn plain_list<H: SceneQuery + ?Sized>(host: &H, ids: &mut IdTable, kind: NodeKind) -> Vec<NodeRef> {
    host.list(kind).iter().map(|n| node_ref(ids, kind, &n.name)).collect()
}

pub fn object(ids: &mut IdTable, obj: &ObjectInfo) -> ObjectResponse {
    // Empty slots are skipped, but the key stays because slots exist
    let materials = (!obj.material_slots.is_empty()).then(|| {
        obj.material_slots
            .iter()
            .flatten()
            .map(|name| node_ref(ids, NodeKind::Material, name))
            .collect()
    });
    let mesh = (obj.type_tag == TYPE_MESH).then(|| {
        let data = obj.data.as_deref().unwrap_or(&obj.name);
        node_ref(ids, NodeKind::Mesh, data)
    });

    ObjectResponse {
        object: TypedNodeRef {
            name: obj.name.clone(),
            id: ids.id(NodeKind::Object, &obj.name),
            type_tag: obj.type_tag.clone(),
        },
        materials,
        mesh,
    }
}

pub fn collection(ids: &mut IdTable, col: &CollectionInfo) -> ObjectList {
    ObjectList { objects: col.objects.iter().map(|o| typed_ref(ids, o)).collect() }
}

/// A material without a node graph has no textures.
pub fn material(ids: &mut IdTable, mat: &MaterialInfo) -> MaterialResponse {
    let textures = mat
        .node_tree
        .iter()
        .flatten()
        .filter(|node| node.node_type == NODE_TEX_IMAGE)
        .map(|node| TextureRef { name: node.label.clone(), node_type: node.node_type.clone() })
        .collect();

    MaterialResponse {
        material: MaterialBody {
            name: mat.name.clone(),
            id: ids.id(NodeKind::Material, &mat.name),
            diffuse_color: mat.diffuse_color.clone(),
            metallic: mat.metallic,
            roughness: mat.roughness,
            textures,
        },
    }
}

pub fn objects<H: SceneQuery + ?Sized>(host: &H, ids: &mut IdTable) -> ObjectList {
    ObjectList { objects: host.list(NodeKind::Object).iter().map(|o| typed_ref(ids, o)).collect() }
}

pub fn collections<H: SceneQuery + ?Sized>(host: &H, ids: &mut IdTable) -> CollectionList {
    CollectionList { collections: plain_list(host, ids, NodeKind::Collection) }
}

pub fn materials<H: SceneQuery + ?Sized>(host: &H, ids: &mut IdTable) -> MaterialList {
    MaterialList { materials: plain_list(host, ids, NodeKind::Material) }
}

pub fn texts<H: SceneQuery + ?Sized>(host: &H, ids: &mut IdTable) -> TextList {
    TextList { texts: plain_list(host, ids, NodeKind::Text) }
}
