use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerSettings;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "HTTP:   rouille 3.6\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Serve a live scene graph over HTTP
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Scene description (JSON) to serve - optional, a built-in demo scene is used otherwise
    #[arg(value_name = "SCENE")]
    pub scene: Option<PathBuf>,

    /// Bind host (default: localhost)
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Bind port (default: 8080)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Project folder; exports land in <DIR>/models
    #[arg(short = 'd', long = "project-dir", value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Disable CORS headers
    #[arg(long = "no-cors")]
    pub no_cors: bool,

    /// Tick interval in milliseconds (default: 100)
    #[arg(long = "tick-ms", value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Enable debug logging to file (default: scenery.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// CLI flags override values from the settings file.
    pub fn apply(&self, settings: &mut ServerSettings) {
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if self.no_cors {
            settings.cors = false;
        }
        if let Some(ms) = self.tick_ms {
            settings.tick_interval_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_settings() {
        let args = Args::parse_from(["scenery", "scene.json", "-p", "9000", "--no-cors", "--tick-ms", "5", "-vv"]);
        let mut settings = ServerSettings::default();
        args.apply(&mut settings);

        assert_eq!(args.scene, Some(PathBuf::from("scene.json")));
        assert_eq!(args.verbosity, 2);
        assert_eq!(settings.port, 9000);
        assert!(!settings.cors);
        assert_eq!(settings.tick_interval_ms, 5);
        assert_eq!(settings.host, "localhost");
    }

    #[test]
    fn test_log_flag_optional_value() {
        let args = Args::parse_from(["scenery", "--log"]);
        assert_eq!(args.log_file, Some(None));
    }
}
