use std::{net::SocketAddr, time::Duration};

use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use clap::{Parser, Subcommand};
use hsplug_core::{DEFAULT_PORT, Mode};

pub fn parse_duration(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(Duration::from_secs(seconds))
}

pub fn parse_mode(arg: &str) -> Result<Mode, String> {
    match arg {
        "tcp" => Ok(Mode::Tcp),
        "tcp-headerless" => Ok(Mode::TcpHeaderless),
        "udp" => Ok(Mode::Udp),
        other => Err(format!(
            "unknown mode '{}': expected tcp, tcp-headerless or udp",
            other
        )),
    }
}

/// Accepts offsets such as `+01:00`, `-05:30` or `Z`.
pub fn parse_offset(arg: &str) -> Result<FixedOffset, String> {
    if arg.eq_ignore_ascii_case("z") || arg.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    arg.parse::<FixedOffset>()
        .map_err(|e| format!("invalid UTC offset '{}': {}", arg, e))
}

pub fn parse_local_time(arg: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(arg, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(arg, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| format!("invalid time '{}' (expected YYYY-MM-DDTHH:MM:SS): {}", arg, e))
}

/// TP-Link HS100/HS105/HS110 smart plug client
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover plugs on the local network
    Discover {
        /// Discovery timeout in seconds
        #[arg(long, value_parser = parse_duration, default_value = "3")]
        timeout: Duration,

        /// Local address to listen on
        #[arg(long, default_value = "0.0.0.0:8755")]
        listen: SocketAddr,

        /// Where to send the probe (e.g. a subnet broadcast address)
        #[arg(long, default_value = "255.255.255.255:9999")]
        broadcast: SocketAddr,
    },

    /// Show version information for CLI and core library
    Version,

    /// Send a command to a specific plug
    Device {
        /// Target hostname or IP address
        target: String,

        /// Target port
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Timeout in seconds for the whole exchange
        #[arg(long, value_parser = parse_duration, default_value = "10", env = "HSPLUG_TIMEOUT")]
        timeout: Duration,

        /// Framing: tcp, tcp-headerless or udp
        #[arg(long, value_parser = parse_mode, default_value = "tcp")]
        mode: Mode,

        /// UTC offset of the plug's clock, e.g. +01:00 (default: this machine's)
        #[arg(long, value_parser = parse_offset, env = "HSPLUG_UTC_OFFSET")]
        utc_offset: Option<FixedOffset>,

        #[command(subcommand)]
        command: DeviceCommand,
    },
}

/// Commands available for single plug operations
#[derive(Subcommand)]
pub enum DeviceCommand {
    /// Get system info
    Info,
    /// Turn relay on
    On,
    /// Turn relay off
    Off,
    /// Turn LED on
    Ledon,
    /// Turn LED off
    Ledoff,
    /// Rename the plug
    Alias {
        /// New alias
        name: String,
    },
    /// Reboot the plug
    Reboot,
    /// Reset the plug to factory defaults
    Reset,
    /// Get the plug's time
    Time,
    /// Get the plug's timezone index
    Timezone,
    /// Set the plug's clock and timezone
    SetTime {
        /// Firmware timezone index
        #[arg(long)]
        index: u16,

        /// Local time to set, YYYY-MM-DDTHH:MM:SS (default: now at --utc-offset)
        #[arg(long, value_parser = parse_local_time)]
        at: Option<NaiveDateTime>,
    },
    /// Scan for wireless networks
    Wlanscan,
    /// Connect the plug to a Wi-Fi network
    WifiJoin {
        /// Network name (SSID)
        ssid: String,

        /// Security type: 0=none, 1=WEP, 2=WPA, 3=WPA2
        #[arg(long, default_value = "3")]
        keytype: u8,

        /// Read password from stdin instead of prompting
        #[arg(long, conflicts_with = "password")]
        password_stdin: bool,

        /// Password (not recommended - use --password-stdin or interactive prompt instead)
        #[arg(long, hide = true)]
        password: Option<String>,
    },
    /// Get cloud info
    Cloudinfo,
    /// Bind the plug to a cloud account
    CloudBind {
        /// Account email address
        #[arg(long, short)]
        username: String,

        /// Read password from stdin instead of prompting
        #[arg(long, conflicts_with = "password")]
        password_stdin: bool,

        /// Password (not recommended - use --password-stdin or interactive prompt instead)
        #[arg(long, hide = true)]
        password: Option<String>,
    },
    /// Unbind the plug from its cloud account
    CloudUnbind,
    /// Point the plug at another cloud server
    CloudServer {
        /// Server hostname
        server: String,
    },
    /// Get schedule rules
    Schedule,
    /// Add a weekly schedule rule
    AddRule {
        /// Rule name
        name: String,

        /// Time of day, HH:MM
        at: String,

        /// Switch off instead of on
        #[arg(long)]
        off: bool,

        /// Days as seven 0/1 flags starting on Sunday
        #[arg(long, default_value = "1111111")]
        days: String,
    },
    /// Get the next scheduled action
    NextAction,
    /// Get real-time energy readings (HS110)
    Energy,
    /// Get daily energy statistics for a month (HS110)
    DailyStats {
        /// Month, 1-12
        #[arg(long)]
        month: u32,
        /// Year
        #[arg(long)]
        year: i32,
    },
    /// Get monthly energy statistics for a year (HS110)
    MonthlyStats {
        /// Year
        #[arg(long)]
        year: i32,
    },
    /// Erase energy meter statistics (HS110)
    EnergyReset,
    /// Send raw JSON command
    Raw {
        /// JSON command string
        json: String,
    },
}
