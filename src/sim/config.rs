use super::error::SimError;
use super::scene::Role;
use super::tween::CameraView;
use bevy::prelude::{KeyCode, Resource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub(super) const CONFIG_PATH_DEFAULT: &str = "config/loto.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct RoleBinding {
    pub(super) node: String,
    pub(super) role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct NodeNames {
    pub(super) roles: Vec<RoleBinding>,
    pub(super) lock_device: String,
    pub(super) drill_bit: String,
}

impl Default for NodeNames {
    fn default() -> Self {
        let bind = |node: &str, role| RoleBinding {
            node: node.to_string(),
            role,
        };
        Self {
            roles: vec![
                bind("DrillPress_Button", Role::Button),
                bind("Breaker_Box", Role::BreakerBox),
                bind("Breaker_Box_Door", Role::Door),
                bind("Breaker_Box_Switch", Role::Switch),
            ],
            lock_device: "Lock_Tag_Device".to_string(),
            drill_bit: "drill_bit".to_string(),
        }
    }
}

impl NodeNames {
    pub(super) fn role_for(&self, node: &str) -> Option<Role> {
        self.roles
            .iter()
            .find(|binding| binding.node == node)
            .map(|binding| binding.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct CameraNames {
    pub(super) main: String,
    pub(super) off_switch: String,
    pub(super) breaker_box: String,
    pub(super) breaker_switch: String,
}

impl Default for CameraNames {
    fn default() -> Self {
        Self {
            main: "Camera_Main".to_string(),
            off_switch: "Off_Switch_Camera".to_string(),
            breaker_box: "Breaker_Box_Camera".to_string(),
            breaker_switch: "Breaker_Switch_Camera".to_string(),
        }
    }
}

impl CameraNames {
    pub(super) fn name_for(&self, view: CameraView) -> &str {
        match view {
            CameraView::Main => &self.main,
            CameraView::OffSwitch => &self.off_switch,
            CameraView::BreakerBox => &self.breaker_box,
            CameraView::BreakerSwitch => &self.breaker_switch,
        }
    }
}

/// Millisecond timings of camera moves and delayed procedure phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct SimTimings {
    pub(super) off_view_ms: u64,
    pub(super) return_pause_ms: u64,
    pub(super) main_view_ms: u64,
    pub(super) breaker_view_ms: u64,
    pub(super) switch_view_ms: u64,
    pub(super) lock_phase_ms: u64,
    pub(super) verify_phase_ms: u64,
    pub(super) advisory_ms: u64,
}

impl Default for SimTimings {
    fn default() -> Self {
        Self {
            off_view_ms: 700,
            return_pause_ms: 500,
            main_view_ms: 800,
            breaker_view_ms: 700,
            switch_view_ms: 700,
            lock_phase_ms: 3000,
            verify_phase_ms: 3000,
            advisory_ms: 4000,
        }
    }
}

impl SimTimings {
    pub(super) fn off_view(&self) -> Duration {
        Duration::from_millis(self.off_view_ms)
    }

    pub(super) fn return_pause(&self) -> Duration {
        Duration::from_millis(self.return_pause_ms)
    }

    pub(super) fn main_view(&self) -> Duration {
        Duration::from_millis(self.main_view_ms)
    }

    pub(super) fn breaker_view(&self) -> Duration {
        Duration::from_millis(self.breaker_view_ms)
    }

    pub(super) fn switch_view(&self) -> Duration {
        Duration::from_millis(self.switch_view_ms)
    }

    pub(super) fn lock_phase(&self) -> Duration {
        Duration::from_millis(self.lock_phase_ms)
    }

    pub(super) fn verify_phase(&self) -> Duration {
        Duration::from_millis(self.verify_phase_ms)
    }

    pub(super) fn advisory(&self) -> Duration {
        Duration::from_millis(self.advisory_ms)
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct SimConfig {
    pub(super) window_title: String,
    pub(super) window_width: u32,
    pub(super) window_height: u32,
    pub(super) restart_key: KeyCode,
    pub(super) drill_spin_speed: f32,
    pub(super) nodes: NodeNames,
    pub(super) cameras: CameraNames,
    pub(super) timings: SimTimings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            window_title: "Lockout-Tagout: Drill Press".to_string(),
            window_width: 1600,
            window_height: 900,
            restart_key: KeyCode::KeyR,
            drill_spin_speed: 3.0,
            nodes: NodeNames::default(),
            cameras: CameraNames::default(),
            timings: SimTimings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CliOptions {
    pub(super) config_path: PathBuf,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_PATH_DEFAULT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CliCommand {
    Run(CliOptions),
    Help,
}

pub(super) fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<CliCommand, SimError> {
    let mut options = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let Some(value) = args.next() else {
                    return Err(SimError::MissingCliValue { flag: arg });
                };
                options.config_path = PathBuf::from(value);
            }
            "--help" | "-h" => return Ok(CliCommand::Help),
            _ => return Err(SimError::UnknownCliOption(arg)),
        }
    }

    Ok(CliCommand::Run(options))
}

pub(super) fn cli_help() -> &'static str {
    "Usage:\n  lockout-sim [options]\n\nOptions:\n  -c, --config <path>   Simulation config file (RON), created with defaults when missing\n  -h, --help            Show this help"
}

pub(super) fn read_sim_config(path: &Path) -> Result<SimConfig, SimError> {
    let content = fs::read_to_string(path).map_err(|source| SimError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str::<SimConfig>(&content).map_err(|source| SimError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn write_sim_config(path: &Path, config: &SimConfig) -> Result<(), SimError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SimError::WriteConfig {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let serialized = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())?;
    fs::write(path, serialized).map_err(|source| SimError::WriteConfig {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn load_sim_config(path: &Path) -> SimConfig {
    if !path.exists() {
        let config = SimConfig::default();
        match write_sim_config(path, &config) {
            Ok(()) => info!(path = %path.display(), "wrote default simulation config"),
            Err(err) => warn!("{err}"),
        }
        return config;
    }

    read_sim_config(path).unwrap_or_else(|err| {
        warn!("{err}; using built-in defaults");
        SimConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn no_arguments_run_with_default_config_path() {
        let command = parse_cli_args(Vec::new()).unwrap();
        assert_eq!(command, CliCommand::Run(CliOptions::default()));
    }

    #[rstest]
    #[case(&["--config", "custom.ron"])]
    #[case(&["-c", "custom.ron"])]
    fn config_flag_overrides_path(#[case] raw: &[&str]) {
        let command = parse_cli_args(args(raw)).unwrap();
        assert_eq!(
            command,
            CliCommand::Run(CliOptions {
                config_path: PathBuf::from("custom.ron"),
            })
        );
    }

    #[test]
    fn help_flag_short_circuits() {
        let command = parse_cli_args(args(&["--help", "--bogus"])).unwrap();
        assert_eq!(command, CliCommand::Help);
    }

    #[test]
    fn missing_flag_value_is_an_error() {
        let err = parse_cli_args(args(&["--config"])).unwrap_err();
        assert!(matches!(err, SimError::MissingCliValue { ref flag } if flag == "--config"));
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let err = parse_cli_args(args(&["--fullscreen"])).unwrap_err();
        assert_eq!(err.to_string(), "unknown option: --fullscreen");
    }

    #[test]
    fn default_role_table_covers_every_role() {
        let nodes = NodeNames::default();
        assert_eq!(nodes.role_for("DrillPress_Button"), Some(Role::Button));
        assert_eq!(nodes.role_for("Breaker_Box"), Some(Role::BreakerBox));
        assert_eq!(nodes.role_for("Breaker_Box_Door"), Some(Role::Door));
        assert_eq!(nodes.role_for("Breaker_Box_Switch"), Some(Role::Switch));
        assert_eq!(nodes.role_for("drill_bit"), None);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: SimConfig = ron::from_str("(restart_key: F5, timings: (lock_phase_ms: 10))")
            .expect("partial config parses");
        assert_eq!(config.restart_key, KeyCode::F5);
        assert_eq!(config.timings.lock_phase(), Duration::from_millis(10));
        assert_eq!(config.timings.verify_phase(), Duration::from_secs(3));
        assert_eq!(config.cameras, CameraNames::default());
    }

    #[test]
    fn unknown_restart_key_is_a_parse_error() {
        let err = ron::from_str::<SimConfig>("(restart_key: NotAKey)").unwrap_err();
        assert!(err.to_string().contains("NotAKey"));
    }

    #[test]
    fn unparsable_config_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("lockout-sim-badkey-{}", std::process::id()));
        let path = dir.join("loto.ron");
        fs::create_dir_all(&dir).expect("temp dir");
        fs::write(&path, "(restart_key: NotAKey)").expect("config writes");

        let loaded = load_sim_config(&path);
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(loaded.restart_key, KeyCode::KeyR);
    }

    #[test]
    fn config_survives_a_write_and_read() {
        let dir = std::env::temp_dir().join(format!("lockout-sim-config-{}", std::process::id()));
        let path = dir.join("loto.ron");
        let mut config = SimConfig::default();
        config.timings.return_pause_ms = 250;
        config.nodes.drill_bit = "Spindle".to_string();

        write_sim_config(&path, &config).expect("config writes");
        let loaded = read_sim_config(&path).expect("config reads");
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(loaded, config);
    }

    #[test]
    fn unreadable_config_reports_its_path() {
        let path = Path::new("definitely/not/here/loto.ron");
        let err = read_sim_config(path).unwrap_err();
        assert!(err.to_string().contains("definitely/not/here/loto.ron"));
    }
}
