use scenery::cli::Args;
use scenery::config::{self, ServerSettings};
use scenery::host::memory::MemoryScene;
use scenery::host::timers::Timers;
use scenery::server::SceneServer;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, unbounded};
use log::{debug, info};
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

/// Host frame length when no timer is due sooner
const FRAME: Duration = Duration::from_millis(16);

/// Watch stdin for a `stop` line (stand-in for the host's stop button).
fn spawn_stop_listener() -> Receiver<()> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim() == "stop" {
                let _ = tx.send(());
                break;
            }
        }
    });
    rx
}

fn init_logging(args: &Args, path_config: &config::PathConfig) -> anyhow::Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| path_config.data_file(config::LOG_FILE));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("tiny_http", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("tiny_http", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = path_config.ensure_dirs() {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;
    debug!("Command-line args: {:?}", args);

    let settings_path = path_config.config_file(config::SETTINGS_FILE);
    info!("Config path: {}", settings_path.display());
    let mut settings = ServerSettings::load(&settings_path)?;
    args.apply(&mut settings);

    let mut scene = match &args.scene {
        Some(path) => MemoryScene::load(path)?,
        None => {
            info!("No scene file provided, serving the built-in demo scene");
            MemoryScene::demo()
        }
    };
    if let Some(dir) = &args.project_dir {
        scene.set_project_folder(dir);
    }

    let mut timers = Timers::new();
    let mut server = SceneServer::new(settings);
    let addr = server.start(&mut timers)?;
    println!("Serving scene on http://{} (type 'stop' to quit)", addr);

    let stop_rx = spawn_stop_listener();
    loop {
        timers.run_due(&mut scene, Instant::now());
        if stop_rx.try_recv().is_ok() {
            break;
        }
        thread::sleep(timers.time_to_next(Instant::now(), FRAME));
    }

    server.stop(&mut timers);
    Ok(())
}
