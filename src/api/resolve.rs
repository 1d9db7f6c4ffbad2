//! Identity resolver: path segment -> scene node.
//!
//! Names are case-sensitive and used verbatim. Lookups always go to the live
//! host; nothing is cached between requests.

use super::ApiError;
use crate::host::{CollectionInfo, MaterialInfo, NodeKind, ObjectInfo, SceneQuery, TextInfo};

/// A node found by [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Object(ObjectInfo),
    Collection(CollectionInfo),
    Material(MaterialInfo),
    Text(TextInfo),
}

/// Look `name` up among the nodes of `kind`.
///
/// The typed helpers below all go through here. Only objects, collections, materials and texts are addressable; any other
/// kind resolves to `NotFound`.
pub fn resolve<H: SceneQuery + ?Sized>(host: &H, kind: NodeKind, name: &str) -> Result<Resolved, ApiError> {
    let found = match kind {
        NodeKind::Object => host.object(name).map(Resolved::Object),
        NodeKind::Collection => host.collection(name).map(Resolved::Collection),
        NodeKind::Material => host.material(name).map(Resolved::Material),
        NodeKind::Text => host.text(name).map(Resolved::Text),
        NodeKind::Mesh => None,
    };
    found.ok_or_else(|| ApiError::not_found(kind, name))
}

pub fn object<H: SceneQuery + ?Sized>(host: &H, name: &str) -> Result<ObjectInfo, ApiError> {
    match resolve(host, NodeKind::Object, name)? {
        Resolved::Object(obj) => Ok(obj),
        _ => Err(ApiError::not_found(NodeKind::Object, name)),
    }
}

pub fn collection<H: SceneQuery + ?Sized>(host: &H, name: &str) -> Result<CollectionInfo, ApiError> {
    match resolve(host, NodeKind::Collection, name)? {
        Resolved::Collection(col) => Ok(col),
        _ => Err(ApiError::not_found(NodeKind::Collection, name)),
    }
}

pub fn material<H: SceneQuery + ?Sized>(host: &H, name: &str) -> Result<MaterialInfo, ApiError> {
    match resolve(host, NodeKind::Material, name)? {
        Resolved::Material(mat) => Ok(mat),
        _ => Err(ApiError::not_found(NodeKind::Material, name)),
    }
}

pub fn text<H: SceneQuery + ?Sized>(host: &H, name: &str) -> Result<TextInfo, ApiError> {
    match resolve(host, NodeKind::Text, name)? {
        Resolved::Text(text) => Ok(text),
        _ => Err(ApiError::not_found(NodeKind::Text, name)),
    }
}
