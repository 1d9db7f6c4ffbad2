//! Action executor: the two side-effecting operations.
//!
//! Both run on the host thread inside a tick and block it until done.
//! Failures are contained: the caller gets a fixed message, the root cause
//! goes to the log only.

use std::any::Any;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use log::{error, info};
use serde::Serialize;
use uuid::Uuid;

use super::{ApiError, resolve};
use crate::host::{ExportOptions, SceneHost, ScriptContext};

/// Fixed export configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    /// Folder under the project folder that receives exports
    pub models_dir: String,
    pub options: ExportOptions,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { models_dir: "models".to_string(), options: ExportOptions::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptResult {
    pub script: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    pub file_name: String,
}

/// One export invocation. Not kept after the response is sent.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub token: Uuid,
    pub folder: PathBuf,
    pub extension: &'static str,
}

impl ExportJob {
    pub fn new(folder: PathBuf, extension: &'static str) -> Self {
        Self { token: Uuid::new_v4(), folder, extension }
    }

    /// File name without extension, as reported to the caller.
    pub fn file_name(&self) -> String {
        format!("model-{}", self.token)
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(format!("{}.{}", self.file_name(), self.extension))
    }
}

/// Selection scope: clears the host selection when dropped, whatever happened inside.
struct SelectionScope<'a, H: SceneHost + ?Sized> {
    host: &'a mut H,
}

impl<'a, H: SceneHost + ?Sized> SelectionScope<'a, H> {
    fn new(host: &'a mut H) -> Self {
        Self { host }
    }
}

impl<H: SceneHost + ?Sized> Deref for SelectionScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: SceneHost + ?Sized> DerefMut for SelectionScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: SceneHost + ?Sized> Drop for SelectionScope<'_, H> {
    fn drop(&mut self) {
        self.host.deselect_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Run the text `name` with itself as the active-text override.
pub fn run_script<H: SceneHost + ?Sized>(host: &mut H, name: &str) -> Result<ScriptResult, ApiError> {
    let text = resolve::text(&*host, name)?;
    let ctx = ScriptContext { text: &text.name };

    match panic::catch_unwind(AssertUnwindSafe(|| host.run_script(&ctx))) {
        Ok(Ok(())) => {
            info!("Text '{}' finished", name);
            Ok(ScriptResult { script: name.to_string(), status: "Success" })
        }
        Ok(Err(err)) => {
            error!("Error while running Text '{}': {:#}", name, err);
            Err(ApiError::ScriptFailed { name: name.to_string() })
        }
        Err(payload) => {
            error!("Text '{}' panicked: {}", name, panic_message(payload.as_ref()));
            Err(ApiError::ScriptFailed { name: name.to_string() })
        }
    }
}

/// Export every object in the active scene to `<project>/<models_dir>/model-<uuid>.<ext>`.
pub fn export_scene<H: SceneHost + ?Sized>(host: &mut H, settings: &ExportSettings) -> Result<ExportResult, ApiError> {
    let objects = host.scene_objects();
    let Some(first) = objects.first().cloned() else {
        return Err(ApiError::Precondition("scene is empty".to_string()));
    };
    let project = host
        .project_folder()
        .ok_or_else(|| ApiError::Precondition("project folder is not set".to_string()))?;

    let folder = project.join(&settings.models_dir);
    fs::create_dir_all(&folder).map_err(|err| {
        error!("Failed to create export folder {}: {}", folder.display(), err);
        ApiError::ExportFailed
    })?;

    let job = ExportJob::new(folder, settings.options.format.extension());
    let path = job.path();
    {
        let mut scope = SelectionScope::new(host);
        scope.set_active_object(Some(first.as_str()));
        scope.select(&objects);
        match panic::catch_unwind(AssertUnwindSafe(|| scope.export(&path, &settings.options))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!("Error while exporting scene to {}: {:#}", path.display(), err);
                return Err(ApiError::ExportFailed);
            }
            Err(payload) => {
                error!("Export to {} panicked: {}", path.display(), panic_message(payload.as_ref()));
                return Err(ApiError::ExportFailed);
            }
        }
    }

    info!("Exported {} object(s) to {}", objects.len(), path.display());
    Ok(ExportResult { file_name: job.file_name() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryScene;
    use crate::host::{ExportFormat, SceneQuery};
    use std::path::Path;

    fn temp_project(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scenery_{}_{}", tag, Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_run_script_success() {
        let mut scene = MemoryScene::demo();
        let result = run_script(&mut scene, "hello.py").unwrap();
        assert_eq!(result, ScriptResult { script: "hello.py".into(), status: "Success" });
    }

    #[test]
    fn test_run_script_missing() {
        let mut scene = MemoryScene::demo();
        let err = run_script(&mut scene, "nope.py").unwrap_err();
        assert_eq!(err.to_string(), "Text 'nope.py' not found");
    }

    #[test]
    fn test_run_script_error_is_redacted() {
        let mut scene = MemoryScene::demo();
        scene.insert_text("bad.py", "fail secret host path /etc/passwd");
        let err = run_script(&mut scene, "bad.py").unwrap_err();
        let msg = err.to_string();
        assert_eq!(msg, "Error while running Text 'bad.py'. Check the system console for error output");
        assert!(!msg.contains("secret"));
        assert_eq!(err.status(), 500);
    }

    /// Script runs panic; exports fail with an error, or panic when the flag is set.
    struct PanickingHost(MemoryScene, bool);

    impl SceneQuery for PanickingHost {
        fn version(&self) -> String { self.0.version() }
        fn list(&self, kind: crate::host::NodeKind) -> Vec<crate::host::NodeInfo> { self.0.list(kind) }
        fn object(&self, name: &str) -> Option<crate::host::ObjectInfo> { self.0.object(name) }
        fn collection(&self, name: &str) -> Option<crate::host::CollectionInfo> { self.0.collection(name) }
        fn material(&self, name: &str) -> Option<crate::host::MaterialInfo> { self.0.material(name) }
        fn text(&self, name: &str) -> Option<crate::host::TextInfo> { self.0.text(name) }
        fn scene_objects(&self) -> Vec<String> { self.0.scene_objects() }
        fn selection(&self) -> Vec<String> { self.0.selection() }
        fn project_folder(&self) -> Option<PathBuf> { self.0.project_folder() }
    }

    impl SceneHost for PanickingHost {
        fn run_script(&mut self, _ctx: &ScriptContext<'_>) -> anyhow::Result<()> {
            panic!("interpreter crashed");
        }
        fn set_active_object(&mut self, name: Option<&str>) { self.0.set_active_object(name) }
        fn select(&mut self, names: &[String]) { self.0.select(names) }
        fn deselect_all(&mut self) { self.0.deselect_all() }
        fn export(&mut self, _path: &Path, _options: &ExportOptions) -> anyhow::Result<()> {
            if self.1 {
                panic!("exporter crashed");
            }
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_run_script_panic_is_contained() {
        let mut host = PanickingHost(MemoryScene::demo(), false);
        let err = run_script(&mut host, "hello.py").unwrap_err();
        assert_eq!(err, ApiError::ScriptFailed { name: "hello.py".into() });
    }

    #[test]
    fn test_export_scene_writes_file_and_clears_selection() {
        let project = temp_project("export");
        let mut scene = MemoryScene::demo();
        scene.set_project_folder(&project);

        let settings = ExportSettings::default();
        let first = export_scene(&mut scene, &settings).unwrap();
        let second = export_scene(&mut scene, &settings).unwrap();

        assert_ne!(first.file_name, second.file_name);
        assert!(first.file_name.starts_with("model-"));
        assert!(project.join("models").join(format!("{}.glb", first.file_name)).is_file());
        assert!(scene.selection().is_empty());
        assert_eq!(scene.active_object(), Some("Cube"));

        let _ = fs::remove_dir_all(&project);
    }

    #[test]
    fn test_export_gltf_extension() {
        let project = temp_project("gltf");
        let mut scene = MemoryScene::demo();
        scene.set_project_folder(&project);

        let settings = ExportSettings { options: ExportOptions::new(ExportFormat::Gltf), ..Default::default() };
        let result = export_scene(&mut scene, &settings).unwrap();
        let path = project.join("models").join(format!("{}.gltf", result.file_name));
        let doc: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        assert_eq!(doc["asset"]["version"], "2.0");

        let _ = fs::remove_dir_all(&project);
    }

    #[test]
    fn test_export_empty_scene() {
        let mut scene = MemoryScene::default();
        scene.set_project_folder(std::env::temp_dir());
        let err = export_scene(&mut scene, &ExportSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "scene is empty");
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_export_without_project_folder() {
        let mut scene = MemoryScene::demo();
        let err = export_scene(&mut scene, &ExportSettings::default()).unwrap_err();
        assert_eq!(err, ApiError::Precondition("project folder is not set".into()));
    }

    #[test]
    fn test_export_failure_still_clears_selection() {
        let project = temp_project("fail");
        let mut scene = MemoryScene::demo();
        scene.set_project_folder(&project);
        let mut host = PanickingHost(scene, false);

        let err = export_scene(&mut host, &ExportSettings::default()).unwrap_err();
        assert_eq!(err, ApiError::ExportFailed);
        assert!(!err.to_string().contains("disk full"));
        assert!(host.selection().is_empty());

        let _ = fs::remove_dir_all(&project);
    }

    #[test]
    fn test_export_panic_is_contained() {
        let project = temp_project("panic");
        let mut scene = MemoryScene::demo();
        scene.set_project_folder(&project);
        let mut host = PanickingHost(scene, true);

        let err = export_scene(&mut host, &ExportSettings::default()).unwrap_err();
        assert_eq!(err, ApiError::ExportFailed);
        assert_eq!(err.status(), 500);
        assert!(host.selection().is_empty());

        let _ = fs::remove_dir_all(&project);
    }
}
