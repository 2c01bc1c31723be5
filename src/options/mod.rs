//! Validated zmap command-line options.
//!
//! Every [`ScanOption`] owns the semantics of one engine flag. Applying it
//! either appends the flag (and its value) to an [`Arguments`] list or fails
//! without touching the list.
pub mod filesystem;
pub mod network;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use itertools::Itertools;
use serde_derive::Deserialize;

use crate::arguments::Arguments;
use crate::engine::Engine;
use crate::error::{OptionError, Result};

/// Flag names shared by the options and the orchestrator.
pub mod flag {
    pub const TARGET_PORT: &str = "--target-port";
    pub const OUTPUT_FILE: &str = "--output-file";
    pub const BLACKLIST_FILE: &str = "--blacklist-file";
    pub const WHITELIST_FILE: &str = "--whitelist-file";
    pub const RATE: &str = "--rate";
    pub const BANDWIDTH: &str = "--bandwidth";
    pub const MAX_TARGETS: &str = "--max-targets";
    pub const MAX_RUNTIME: &str = "--max-runtime";
    pub const MAX_RESULTS: &str = "--max-results";
    pub const PROBES: &str = "--probes";
    pub const COOLDOWN_TIME: &str = "--cooldown-time";
    pub const SEED: &str = "--seed";
    pub const RETRIES: &str = "--retries";
    pub const DRYRUN: &str = "--dryrun";
    pub const SHARDS: &str = "--shards";
    pub const SHARD: &str = "--shard";
    pub const SOURCE_PORT: &str = "--source-port";
    pub const SOURCE_IP: &str = "--source-ip";
    pub const GATEWAY_MAC: &str = "--gateway-mac";
    pub const SOURCE_MAC: &str = "--source-mac";
    pub const INTERFACE: &str = "--interface";
    pub const VPN: &str = "--vpn";
    pub const PROBE_MODULE: &str = "--probe-module";
    pub const PROBE_ARGS: &str = "--probe-args";
    pub const OUTPUT_FIELDS: &str = "--output-fields";
    pub const OUTPUT_MODULE: &str = "--output-module";
    pub const OUTPUT_ARGS: &str = "--output-args";
    pub const OUTPUT_FILTER: &str = "--output-filter";
    pub const VERBOSITY: &str = "--verbosity";
    pub const LOG_FILE: &str = "--log-file";
    pub const LOG_DIRECTORY: &str = "--log-directory";
    pub const METADATA_FILE: &str = "--metadata-file";
    pub const STATUS_UPDATES_FILE: &str = "--status-updates-file";
    pub const QUIET: &str = "--quiet";
    pub const DISABLE_SYSLOG: &str = "--disable-syslog";
    pub const NOTES: &str = "--notes";
    pub const USER_METADATA: &str = "--user-metadata";
    pub const CONFIG: &str = "--config";
    pub const MAX_SENDTO_FAILURES: &str = "--max-sendto-failures";
    pub const MIN_HITRATE: &str = "--min-hitrate";
    pub const SENDER_THREADS: &str = "--sender-threads";
    pub const CORES: &str = "--cores";
    pub const IGNORE_INVALID_HOSTS: &str = "--ignore-invalid-hosts";
}

/// Output file value that keeps results on standard output.
pub const STDOUT: &str = "-";

/// Highest `--verbosity` zmap understands.
pub const MAX_VERBOSITY: u8 = 5;

/// Unit suffix for `--bandwidth`. Bytes per second is zmap's default and is
/// emitted without a suffix.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandwidthUnit {
    #[default]
    #[serde(rename = "B")]
    Bytes,
    #[serde(rename = "K")]
    Kilo,
    #[serde(rename = "M")]
    Mega,
    #[serde(rename = "G")]
    Giga,
}

impl BandwidthUnit {
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Bytes => "",
            Self::Kilo => "K",
            Self::Mega => "M",
            Self::Giga => "G",
        }
    }
}

impl FromStr for BandwidthUnit {
    type Err = String;

    fn from_str(unit: &str) -> std::result::Result<Self, Self::Err> {
        match unit {
            "B" => Ok(Self::Bytes),
            "K" => Ok(Self::Kilo),
            "M" => Ok(Self::Mega),
            "G" => Ok(Self::Giga),
            other => Err(format!(
                "unsupported bandwidth unit {other:?}, supported units: B, K, M, G"
            )),
        }
    }
}

/// One zmap option.
///
/// Numeric values are carried as text and checked on [`apply`](Self::apply),
/// exactly as they will be handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOption {
    /// Appended verbatim, without duplicate or semantic checks. For engine
    /// flags this crate does not know about.
    CustomArguments(Vec<String>),
    /// IPv4 addresses or CIDR blocks; may be applied any number of times.
    Targets(Vec<String>),
    TargetPort(String),
    /// Where results are written; [`STDOUT`] keeps them on standard output.
    OutputFile(PathBuf),
    BlacklistFile(PathBuf),
    WhitelistFile(PathBuf),

    /// Send rate in packets per second.
    Rate(String),
    Bandwidth(String, BandwidthUnit),
    /// Cap on targets probed, as a count or as a percentage of the address space.
    MaxTargets { value: String, percentage: bool },
    MaxRuntime(String),
    MaxResults(String),
    ProbesPerTarget(String),
    /// Seconds to keep receiving after the last probe was sent.
    CooldownTime(String),
    Seed(String),
    Retries(String),
    Dryrun,
    TotalShards(String),
    ShardId(String),

    SourcePort(String),
    SourceIp(String),
    GatewayMac(String),
    SourceMac(String),
    Interface(String),
    Vpn,

    ProbeModule(String),
    ProbeArgs(String),
    OutputFields(Vec<String>),
    OutputModule(String),
    OutputArgs(String),
    OutputFilter(String),

    /// Level of log detail, `0..=5`.
    Verbosity(u8),
    LogFile(PathBuf),
    LogDirectory(PathBuf),
    MetadataFile(PathBuf),
    StatusUpdatesFile(PathBuf),
    Quiet,
    DisableSyslog,
    Notes(String),
    UserMetadata(String),

    ConfigFile(PathBuf),
    MaxSendtoFailures(String),
    MinHitrate(String),
    SenderThreads(String),
    Cores(Vec<String>),
    IgnoreInvalidHosts,
}

macro_rules! text_constructors {
    ($($name: ident => $variant: ident),+ $(,)?) => {
        $(
            #[doc = concat!("Shorthand for [`ScanOption::", stringify!($variant), "`].")]
            pub fn $name(value: impl ToString) -> Self {
                Self::$variant(value.to_string())
            }
        )+
    }
}

impl ScanOption {
    text_constructors!(
        target_port => TargetPort,
        rate => Rate,
        max_runtime => MaxRuntime,
        max_results => MaxResults,
        probes_per_target => ProbesPerTarget,
        cooldown_time => CooldownTime,
        seed => Seed,
        retries => Retries,
        total_shards => TotalShards,
        shard_id => ShardId,
        source_port => SourcePort,
        source_ip => SourceIp,
        max_sendto_failures => MaxSendtoFailures,
        min_hitrate => MinHitrate,
        sender_threads => SenderThreads,
    );

    pub fn targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Targets(targets.into_iter().map(Into::into).collect())
    }

    pub fn output_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OutputFields(fields.into_iter().map(Into::into).collect())
    }

    pub fn cores<I, S>(cores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::Cores(cores.into_iter().map(|core| core.to_string()).collect())
    }

    pub fn custom<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CustomArguments(arguments.into_iter().map(Into::into).collect())
    }

    pub fn bandwidth(value: impl ToString, unit: BandwidthUnit) -> Self {
        Self::Bandwidth(value.to_string(), unit)
    }

    pub fn max_targets(value: impl ToString, percentage: bool) -> Self {
        Self::MaxTargets {
            value: value.to_string(),
            percentage,
        }
    }

    /// The flag this option controls, `None` for positional targets and
    /// custom arguments.
    pub const fn flag(&self) -> Option<&'static str> {
        let name = match self {
            Self::CustomArguments(_) | Self::Targets(_) => return None,
            Self::TargetPort(_) => flag::TARGET_PORT,
            Self::OutputFile(_) => flag::OUTPUT_FILE,
            Self::BlacklistFile(_) => flag::BLACKLIST_FILE,
            Self::WhitelistFile(_) => flag::WHITELIST_FILE,
            Self::Rate(_) => flag::RATE,
            Self::Bandwidth(..) => flag::BANDWIDTH,
            Self::MaxTargets { .. } => flag::MAX_TARGETS,
            Self::MaxRuntime(_) => flag::MAX_RUNTIME,
            Self::MaxResults(_) => flag::MAX_RESULTS,
            Self::ProbesPerTarget(_) => flag::PROBES,
            Self::CooldownTime(_) => flag::COOLDOWN_TIME,
            Self::Seed(_) => flag::SEED,
            Self::Retries(_) => flag::RETRIES,
            Self::Dryrun => flag::DRYRUN,
            Self::TotalShards(_) => flag::SHARDS,
            Self::ShardId(_) => flag::SHARD,
            Self::SourcePort(_) => flag::SOURCE_PORT,
            Self::SourceIp(_) => flag::SOURCE_IP,
            Self::GatewayMac(_) => flag::GATEWAY_MAC,
            Self::SourceMac(_) => flag::SOURCE_MAC,
            Self::Interface(_) => flag::INTERFACE,
            Self::Vpn => flag::VPN,
            Self::ProbeModule(_) => flag::PROBE_MODULE,
            Self::ProbeArgs(_) => flag::PROBE_ARGS,
            Self::OutputFields(_) => flag::OUTPUT_FIELDS,
            Self::OutputModule(_) => flag::OUTPUT_MODULE,
            Self::OutputArgs(_) => flag::OUTPUT_ARGS,
            Self::OutputFilter(_) => flag::OUTPUT_FILTER,
            Self::Verbosity(_) => flag::VERBOSITY,
            Self::LogFile(_) => flag::LOG_FILE,
            Self::LogDirectory(_) => flag::LOG_DIRECTORY,
            Self::MetadataFile(_) => flag::METADATA_FILE,
            Self::StatusUpdatesFile(_) => flag::STATUS_UPDATES_FILE,
            Self::Quiet => flag::QUIET,
            Self::DisableSyslog => flag::DISABLE_SYSLOG,
            Self::Notes(_) => flag::NOTES,
            Self::UserMetadata(_) => flag::USER_METADATA,
            Self::ConfigFile(_) => flag::CONFIG,
            Self::MaxSendtoFailures(_) => flag::MAX_SENDTO_FAILURES,
            Self::MinHitrate(_) => flag::MIN_HITRATE,
            Self::SenderThreads(_) => flag::SENDER_THREADS,
            Self::Cores(_) => flag::CORES,
            Self::IgnoreInvalidHosts => flag::IGNORE_INVALID_HOSTS,
        };
        Some(name)
    }

    /// Validates the option against `args` (and, for modules and output
    /// fields, against what `engine` reports) and appends it.
    pub async fn apply(&self, args: &mut Arguments, engine: &Engine) -> Result<()> {
        match self {
            Self::CustomArguments(values) => {
                args.extend(values.iter().cloned());
                return Ok(());
            }
            Self::Targets(targets) => {
                let targets = targets
                    .iter()
                    .map(|target| network::normalize_target(target))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                args.extend(targets);
                return Ok(());
            }
            _ => {}
        }
        let Some(flag) = self.flag() else {
            return Ok(());
        };

        args.ensure_absent(flag)?;

        match self.validated_value(flag, args, engine).await? {
            Some(value) => args.push_pair(flag, value),
            None => args.push_flag(flag),
        }
        Ok(())
    }

    /// The value to emit after `flag`, `None` for toggles.
    async fn validated_value(
        &self,
        flag: &'static str,
        args: &Arguments,
        engine: &Engine,
    ) -> Result<Option<String>> {
        let value = match self {
            // positional, appended by `apply` without a flag
            Self::CustomArguments(_) | Self::Targets(_) => return Ok(None),

            Self::Dryrun
            | Self::Vpn
            | Self::Quiet
            | Self::DisableSyslog
            | Self::IgnoreInvalidHosts => return Ok(None),

            Self::ProbeArgs(value)
            | Self::OutputArgs(value)
            | Self::OutputFilter(value)
            | Self::Notes(value)
            | Self::UserMetadata(value) => value.clone(),

            Self::Rate(value)
            | Self::MaxRuntime(value)
            | Self::MaxResults(value)
            | Self::ProbesPerTarget(value)
            | Self::CooldownTime(value)
            | Self::Seed(value)
            | Self::Retries(value)
            | Self::TotalShards(value)
            | Self::ShardId(value)
            | Self::MaxSendtoFailures(value)
            | Self::SenderThreads(value) => integer(flag, value)?,

            Self::TargetPort(value) => network::parse_port(flag, value)?.to_string(),
            Self::Bandwidth(value, unit) => format!("{}{}", integer(flag, value)?, unit.suffix()),
            Self::MaxTargets { value, percentage } => {
                let value = integer(flag, value)?;
                if *percentage {
                    format!("{value}%")
                } else {
                    value
                }
            }
            Self::MinHitrate(value) => decimal(flag, value)?,

            Self::SourcePort(value) => network::parse_port_spec(flag, value)?,
            Self::SourceIp(value) => network::parse_source_ip(flag, value)?,
            Self::GatewayMac(value) | Self::SourceMac(value) => {
                network::check_mac(flag, value)?;
                value.clone()
            }
            Self::Interface(name) => {
                if !network::interface_exists(name)? {
                    return Err(OptionError::UnknownInterface(name.clone()).into());
                }
                name.clone()
            }
            Self::Cores(cores) => check_cores(flag, cores)?,

            Self::OutputFile(path) => {
                if path.as_os_str() != STDOUT {
                    filesystem::require_creatable(flag, path)?;
                }
                path_value(path)
            }
            Self::BlacklistFile(path) | Self::WhitelistFile(path) => {
                filesystem::require_existing(flag, path)?;
                path_value(path)
            }
            Self::ConfigFile(path) => {
                filesystem::require_file(flag, path)?;
                path_value(path)
            }
            Self::MetadataFile(path) | Self::StatusUpdatesFile(path) => {
                filesystem::require_creatable(flag, path)?;
                path_value(path)
            }
            Self::LogFile(path) => {
                exclusive_with(args, flag, flag::LOG_DIRECTORY)?;
                filesystem::require_creatable(flag, path)?;
                path_value(path)
            }
            Self::LogDirectory(path) => {
                exclusive_with(args, flag, flag::LOG_FILE)?;
                filesystem::require_directory(flag, path)?;
                path_value(path)
            }
            Self::Verbosity(level) => {
                if *level > MAX_VERBOSITY {
                    return Err(OptionError::OutOfRange {
                        flag,
                        value: level.to_string(),
                        min: 0,
                        max: i64::from(MAX_VERBOSITY),
                    }
                    .into());
                }
                level.to_string()
            }

            Self::ProbeModule(module) => {
                if !engine.list_probe_modules().await?.contains(module) {
                    return Err(OptionError::UnknownProbeModule(module.clone()).into());
                }
                module.clone()
            }
            Self::OutputModule(module) => {
                if !engine.list_output_modules().await?.contains(module) {
                    return Err(OptionError::UnknownOutputModule(module.clone()).into());
                }
                module.clone()
            }
            Self::OutputFields(fields) => {
                if fields.is_empty() {
                    return Err(OptionError::Empty(flag).into());
                }
                let available = engine.list_output_fields().await?;
                if let Some(unknown) = fields
                    .iter()
                    .find(|field| !available.iter().any(|a| &a.name == *field))
                {
                    return Err(OptionError::UnknownOutputField(unknown.clone()).into());
                }
                fields.join(",")
            }
        };
        Ok(Some(value))
    }
}

impl fmt::Display for ScanOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.flag() {
            Some(flag) => f.write_str(flag),
            None => f.write_str("<positional>"),
        }
    }
}

fn integer(flag: &'static str, value: &str) -> std::result::Result<String, OptionError> {
    value
        .parse::<i64>()
        .map(|_| value.to_owned())
        .map_err(|_| OptionError::NotNumeric {
            flag,
            value: value.to_owned(),
        })
}

fn decimal(flag: &'static str, value: &str) -> std::result::Result<String, OptionError> {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(value.to_owned()),
        _ => Err(OptionError::NotDecimal {
            flag,
            value: value.to_owned(),
        }),
    }
}

fn exclusive_with(
    args: &Arguments,
    flag: &'static str,
    other: &'static str,
) -> std::result::Result<(), OptionError> {
    if args.contains(other) {
        return Err(OptionError::Conflict { flag, other });
    }
    Ok(())
}

fn check_cores(flag: &'static str, cores: &[String]) -> std::result::Result<String, OptionError> {
    if cores.is_empty() {
        return Err(OptionError::Empty(flag));
    }

    let available = num_cpus::get();
    if let Some(core) = cores
        .iter()
        .find(|core| !(0..available).any(|index| index.to_string() == **core))
    {
        return Err(OptionError::UnknownCore(core.clone()));
    }

    Ok(cores.iter().join(","))
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
