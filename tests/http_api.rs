//! End-to-end: real HTTP server, test thread plays the host frame loop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use scenery::host::SceneQuery;
use scenery::host::memory::ObjectRecord;
use scenery::{MemoryScene, SceneServer, ServerSettings, Timers};
use serde_json::{Value, json};

struct Harness {
    scene: MemoryScene,
    timers: Timers,
    server: SceneServer,
    addr: SocketAddr,
    project: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let project = std::env::temp_dir().join(format!("scenery_http_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&project).unwrap();

        let mut scene = MemoryScene::demo();
        scene.set_project_folder(&project);
        scene.insert_text("bad.py", "fail token=hunter2 at /srv/internal");
        scene.insert_text("cleanup.py", "delete_object Light");

        let settings = ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
            tick_interval_ms: 1,
            ..Default::default()
        };
        let mut timers = Timers::new();
        let mut server = SceneServer::new(settings);
        let addr = server.start(&mut timers).unwrap();
        Self { scene, timers, server, addr, project }
    }

    /// Send one request from a client thread while ticking the host here.
    fn send(&mut self, method: &str, path: &str) -> (u16, String) {
        let url = format!("http://{}{}", self.addr, path);
        let method = method.to_string();
        let client = thread::spawn(move || match ureq::request(&method, &url).call() {
            Ok(resp) => (resp.status(), resp.into_string().unwrap()),
            Err(ureq::Error::Status(code, resp)) => (code, resp.into_string().unwrap()),
            Err(e) => panic!("transport error: {}", e),
        });

        let deadline = Instant::now() + Duration::from_secs(10);
        while !client.is_finished() {
            assert!(Instant::now() < deadline, "request {} timed out", path);
            self.timers.run_due(&mut self.scene, Instant::now());
            thread::sleep(Duration::from_millis(1));
        }
        client.join().unwrap()
    }

    fn json(&mut self, method: &str, path: &str) -> (u16, Value) {
        let (status, body) = self.send(method, path);
        (status, serde_json::from_str(&body).unwrap())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.stop(&mut self.timers);
        let _ = std::fs::remove_dir_all(&self.project);
    }
}

#[test]
fn test_version_plain_text() {
    let mut h = Harness::new();
    let (status, body) = h.send("GET", "/version");
    assert_eq!(status, 200);
    assert_eq!(body, h.scene.version());
}

#[test]
fn test_cube_object() {
    let mut h = Harness::new();
    let (status, body) = h.json("GET", "/object/Cube");
    assert_eq!(status, 200);
    assert_eq!(body["object"]["name"], "Cube");
    assert_eq!(body["object"]["type"], "MESH");
    assert_eq!(body["materials"][0]["name"], "Red");
    assert_eq!(body["mesh"]["name"], "Cube");
    assert!(body["mesh"]["id"].is_u64());
}

#[test]
fn test_mesh_name_follows_data_block() {
    let mut h = Harness::new();
    h.scene.insert_object(
        ObjectRecord { name: "Rock".into(), type_tag: "MESH".into(), materials: vec![], data: Some("RockMesh".into()) },
        true,
    );
    let (status, body) = h.json("GET", "/object/Rock");
    assert_eq!(status, 200);
    assert_eq!(body["mesh"]["name"], "RockMesh");
    assert!(body.get("materials").is_none());
}

#[test]
fn test_object_without_slots_has_no_materials_key() {
    let mut h = Harness::new();
    let (_, body) = h.json("GET", "/object/Camera");
    assert!(body.get("materials").is_none());
    assert!(body.get("mesh").is_none());
}

#[test]
fn test_not_found_responses() {
    let mut h = Harness::new();
    let (status, body) = h.send("GET", "/material/NoSuchMat");
    assert_eq!(status, 404);
    assert_eq!(body, r#"{"error":"Material 'NoSuchMat' not found"}"#);

    let (status, body) = h.json("GET", "/object/Ghost");
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("Ghost"));

    let (status, _) = h.json("GET", "/no/such/route");
    assert_eq!(status, 404);
}

#[test]
fn test_listings_idempotent() {
    let mut h = Harness::new();
    for path in ["/objects", "/collections", "/materials", "/texts"] {
        let first = h.json("GET", path);
        let second = h.json("GET", path);
        assert_eq!(first.0, 200);
        assert_eq!(first, second, "{} changed between calls", path);
    }
    let (_, objects) = h.json("GET", "/objects");
    let names: Vec<&str> = objects["objects"].as_array().unwrap().iter().map(|o| o["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Cube", "Camera", "Light"]);
}

#[test]
fn test_collection_and_material() {
    let mut h = Harness::new();
    let (status, body) = h.json("GET", "/collection/Collection");
    assert_eq!(status, 200);
    assert_eq!(body["objects"].as_array().unwrap().len(), 3);

    let (status, body) = h.json("GET", "/material/Red");
    assert_eq!(status, 200);
    assert_eq!(body["material"]["textures"], json!([{ "name": "Albedo", "type": "TEX_IMAGE" }]));
    assert_eq!(body["material"]["metallic"], json!(0.0));
}

#[test]
fn test_run_script() {
    let mut h = Harness::new();
    let (status, body) = h.json("POST", "/run_script/cleanup.py");
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "script": "cleanup.py", "status": "Success" }));
    let (status, _) = h.json("GET", "/object/Light");
    assert_eq!(status, 404);

    let (status, body) = h.send("POST", "/run_script/bad.py");
    assert_eq!(status, 500);
    assert_eq!(
        body,
        r#"{"error":"Error while running Text 'bad.py'. Check the system console for error output"}"#
    );
    assert!(!body.contains("hunter2"));

    let (status, body) = h.json("POST", "/run_script/missing.py");
    assert_eq!(status, 404);
    assert_eq!(body, json!({ "error": "Text 'missing.py' not found" }));
}

#[test]
fn test_export_scene_twice() {
    let mut h = Harness::new();
    let (status, first) = h.json("POST", "/export_scene");
    assert_eq!(status, 200);
    let (_, second) = h.json("POST", "/export_scene");
    assert_ne!(first["file_name"], second["file_name"]);

    let name = first["file_name"].as_str().unwrap();
    assert!(h.project.join("models").join(format!("{}.glb", name)).is_file());
    assert!(h.scene.selection().is_empty());
}

#[test]
fn test_greeting_and_cors() {
    let mut h = Harness::new();
    let (status, body) = h.json("GET", "/Ada");
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "message": "Hello, Ada" }));

    let url = format!("http://{}/objects", h.addr);
    let client = thread::spawn(move || {
        let resp = ureq::get(&url).set("Origin", "http://example.test").call().unwrap();
        (
            resp.header("Access-Control-Allow-Origin").map(str::to_owned),
            resp.header("Access-Control-Allow-Credentials").map(str::to_owned),
        )
    });
    while !client.is_finished() {
        h.timers.run_due(&mut h.scene, Instant::now());
        thread::sleep(Duration::from_millis(1));
    }
    let (origin, credentials) = client.join().unwrap();
    assert_eq!(origin.as_deref(), Some("http://example.test"));
    assert_eq!(credentials.as_deref(), Some("true"));
}

#[test]
fn test_stop_answers_pending_requests() {
    let mut h = Harness::new();
    let url = format!("http://{}/objects", h.addr);
    let client = thread::spawn(move || match ureq::get(&url).call() {
        Ok(resp) => resp.status(),
        Err(ureq::Error::Status(code, _)) => code,
        Err(_) => 0,
    });

    // No ticks: the request waits in the queue until the bridge goes away
    thread::sleep(Duration::from_millis(100));
    h.server.stop(&mut h.timers);
    assert_eq!(client.join().unwrap(), 503);
}
