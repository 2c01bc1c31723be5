//! Optional TOML configuration file.
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use serde_derive::Deserialize;

use crate::error::{Result, ScanError};
use crate::options::{BandwidthUnit, ScanOption};

const CONFIG_FILE_NAME: &str = ".zmapctl.toml";

/// Scanner settings read from a TOML file. Every key is optional and maps
/// onto one [`ScanOption`] of the same name, except `binary_path` and
/// `timeout_secs` which configure the scanner itself.
///
/// # Format
///
/// ```toml
/// binary_path = "/usr/local/sbin/zmap"
/// timeout_secs = 600
/// targets = ["10.0.0.0/8"]
/// target_port = 443
/// rate = 10000
/// bandwidth = 10
/// bandwidth_unit = "M"
/// output_fields = ["saddr", "sport"]
/// log_directory = "/var/log/zmap"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    pub binary_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,

    pub targets: Option<Vec<String>>,
    pub target_port: Option<u16>,
    pub output_file: Option<PathBuf>,
    pub blacklist_file: Option<PathBuf>,
    pub whitelist_file: Option<PathBuf>,

    pub rate: Option<i64>,
    pub bandwidth: Option<i64>,
    pub bandwidth_unit: Option<BandwidthUnit>,
    pub max_targets: Option<i64>,
    #[serde(default)]
    pub max_targets_percentage: bool,
    pub max_runtime: Option<i64>,
    pub max_results: Option<i64>,
    pub probes: Option<i64>,
    pub cooldown_time: Option<i64>,
    pub seed: Option<i64>,
    pub retries: Option<i64>,
    #[serde(default)]
    pub dryrun: bool,
    pub shards: Option<i64>,
    pub shard: Option<i64>,

    pub source_port: Option<String>,
    pub source_ip: Option<String>,
    pub gateway_mac: Option<String>,
    pub source_mac: Option<String>,
    pub interface: Option<String>,
    #[serde(default)]
    pub vpn: bool,

    pub probe_module: Option<String>,
    pub probe_args: Option<String>,
    pub output_fields: Option<Vec<String>>,
    pub output_module: Option<String>,
    pub output_args: Option<String>,
    pub output_filter: Option<String>,

    pub verbosity: Option<u8>,
    pub log_file: Option<PathBuf>,
    pub log_directory: Option<PathBuf>,
    pub metadata_file: Option<PathBuf>,
    pub status_updates_file: Option<PathBuf>,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub disable_syslog: bool,
    pub notes: Option<String>,
    pub user_metadata: Option<String>,

    pub config: Option<PathBuf>,
    pub max_sendto_failures: Option<i64>,
    pub min_hitrate: Option<f64>,
    pub sender_threads: Option<i64>,
    pub cores: Option<Vec<usize>>,
    #[serde(default)]
    pub ignore_invalid_hosts: bool,

    pub custom_arguments: Option<Vec<String>>,
}

impl ScanConfig {
    /// Reads `path`, or [`default_config_path`] when `None`. A missing file
    /// gives the empty configuration.
    pub fn read(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path.or_else(default_config_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!("No configuration file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ScanError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ScanError::Config {
            path,
            message: e.to_string(),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The configured options, in a fixed order: targets first, custom
    /// arguments last.
    pub fn options(&self) -> Vec<ScanOption> {
        let mut options = Vec::new();

        if let Some(targets) = &self.targets {
            options.push(ScanOption::targets(targets.iter().cloned()));
        }
        if let Some(port) = self.target_port {
            options.push(ScanOption::target_port(port));
        }
        push_path(&mut options, self.output_file.as_ref(), ScanOption::OutputFile);
        push_path(&mut options, self.blacklist_file.as_ref(), ScanOption::BlacklistFile);
        push_path(&mut options, self.whitelist_file.as_ref(), ScanOption::WhitelistFile);

        push_number(&mut options, self.rate, ScanOption::Rate);
        if let Some(bandwidth) = self.bandwidth {
            options.push(ScanOption::bandwidth(
                bandwidth,
                self.bandwidth_unit.unwrap_or_default(),
            ));
        }
        if let Some(max_targets) = self.max_targets {
            options.push(ScanOption::max_targets(
                max_targets,
                self.max_targets_percentage,
            ));
        }
        push_number(&mut options, self.max_runtime, ScanOption::MaxRuntime);
        push_number(&mut options, self.max_results, ScanOption::MaxResults);
        push_number(&mut options, self.probes, ScanOption::ProbesPerTarget);
        push_number(&mut options, self.cooldown_time, ScanOption::CooldownTime);
        push_number(&mut options, self.seed, ScanOption::Seed);
        push_number(&mut options, self.retries, ScanOption::Retries);
        push_toggle(&mut options, self.dryrun, ScanOption::Dryrun);
        push_number(&mut options, self.shards, ScanOption::TotalShards);
        push_number(&mut options, self.shard, ScanOption::ShardId);

        push_text(&mut options, self.source_port.as_ref(), ScanOption::SourcePort);
        push_text(&mut options, self.source_ip.as_ref(), ScanOption::SourceIp);
        push_text(&mut options, self.gateway_mac.as_ref(), ScanOption::GatewayMac);
        push_text(&mut options, self.source_mac.as_ref(), ScanOption::SourceMac);
        push_text(&mut options, self.interface.as_ref(), ScanOption::Interface);
        push_toggle(&mut options, self.vpn, ScanOption::Vpn);

        push_text(&mut options, self.probe_module.as_ref(), ScanOption::ProbeModule);
        push_text(&mut options, self.probe_args.as_ref(), ScanOption::ProbeArgs);
        if let Some(fields) = &self.output_fields {
            options.push(ScanOption::output_fields(fields.iter().cloned()));
        }
        push_text(&mut options, self.output_module.as_ref(), ScanOption::OutputModule);
        push_text(&mut options, self.output_args.as_ref(), ScanOption::OutputArgs);
        push_text(&mut options, self.output_filter.as_ref(), ScanOption::OutputFilter);

        if let Some(level) = self.verbosity {
            options.push(ScanOption::Verbosity(level));
        }
        push_path(&mut options, self.log_file.as_ref(), ScanOption::LogFile);
        push_path(&mut options, self.log_directory.as_ref(), ScanOption::LogDirectory);
        push_path(&mut options, self.metadata_file.as_ref(), ScanOption::MetadataFile);
        push_path(
            &mut options,
            self.status_updates_file.as_ref(),
            ScanOption::StatusUpdatesFile,
        );
        push_toggle(&mut options, self.quiet, ScanOption::Quiet);
        push_toggle(&mut options, self.disable_syslog, ScanOption::DisableSyslog);
        push_text(&mut options, self.notes.as_ref(), ScanOption::Notes);
        push_text(&mut options, self.user_metadata.as_ref(), ScanOption::UserMetadata);

        push_path(&mut options, self.config.as_ref(), ScanOption::ConfigFile);
        push_number(
            &mut options,
            self.max_sendto_failures,
            ScanOption::MaxSendtoFailures,
        );
        if let Some(hitrate) = self.min_hitrate {
            options.push(ScanOption::min_hitrate(hitrate));
        }
        push_number(&mut options, self.sender_threads, ScanOption::SenderThreads);
        if let Some(cores) = &self.cores {
            options.push(ScanOption::cores(cores));
        }
        push_toggle(
            &mut options,
            self.ignore_invalid_hosts,
            ScanOption::IgnoreInvalidHosts,
        );

        if let Some(arguments) = &self.custom_arguments {
            options.push(ScanOption::custom(arguments.iter().cloned()));
        }

        options
    }
}

fn push_number(options: &mut Vec<ScanOption>, value: Option<i64>, make: fn(String) -> ScanOption) {
    if let Some(value) = value {
        options.push(make(value.to_string()));
    }
}

fn push_text(options: &mut Vec<ScanOption>, value: Option<&String>, make: fn(String) -> ScanOption) {
    if let Some(value) = value {
        options.push(make(value.clone()));
    }
}

fn push_path(
    options: &mut Vec<ScanOption>,
    value: Option<&PathBuf>,
    make: fn(PathBuf) -> ScanOption,
) {
    if let Some(value) = value {
        options.push(make(value.clone()));
    }
}

fn push_toggle(options: &mut Vec<ScanOption>, enabled: bool, option: ScanOption) {
    if enabled {
        options.push(option);
    }
}

/// `~/.zmapctl.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_config_has_no_options() {
        let config: ScanConfig = toml::from_str("").unwrap();
        assert_eq!(config, ScanConfig::default());
        assert!(config.options().is_empty());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn keys_map_onto_options_in_order() {
        let config: ScanConfig = toml::from_str(
            r#"
            timeout_secs = 30
            targets = ["10.0.0.0/8", "1.1.1.1"]
            target_port = 443
            rate = 10000
            bandwidth = 10
            bandwidth_unit = "M"
            max_targets = 5
            max_targets_percentage = true
            dryrun = true
            output_fields = ["saddr", "sport"]
            verbosity = 3
            min_hitrate = 0.5
            cores = [0]
            custom_arguments = ["--some-flag"]
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.options(),
            vec![
                ScanOption::targets(["10.0.0.0/8", "1.1.1.1"]),
                ScanOption::target_port(443),
                ScanOption::rate(10000),
                ScanOption::bandwidth(10, BandwidthUnit::Mega),
                ScanOption::max_targets(5, true),
                ScanOption::Dryrun,
                ScanOption::output_fields(["saddr", "sport"]),
                ScanOption::Verbosity(3),
                ScanOption::min_hitrate(0.5),
                ScanOption::cores([0]),
                ScanOption::custom(["--some-flag"]),
            ]
        );
    }

    #[test]
    fn bandwidth_defaults_to_bytes() {
        let config: ScanConfig = toml::from_str("bandwidth = 100").unwrap();
        assert_eq!(
            config.options(),
            vec![ScanOption::bandwidth(100, BandwidthUnit::Bytes)]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ScanConfig>("batch_size = 10").is_err());
    }

    #[test]
    fn read_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let config = ScanConfig::read(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn read_reports_bad_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zmapctl.toml");
        fs::write(&path, "rate = \"fast\"").unwrap();

        let err = ScanConfig::read(Some(path)).unwrap_err();
        assert!(matches!(err, ScanError::Config { .. }));
    }

    #[test]
    fn read_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zmapctl.toml");
        fs::write(&path, "binary_path = \"/usr/sbin/zmap\"\nquiet = true\n").unwrap();

        let config = ScanConfig::read(Some(path)).unwrap();
        assert_eq!(config.binary_path, Some(PathBuf::from("/usr/sbin/zmap")));
        assert_eq!(config.options(), vec![ScanOption::Quiet]);
    }

    #[test]
    fn default_path_is_in_home() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with(".zmapctl.toml"));
        }
    }
}
