//! Device handles for HS100, HS105 and HS110 plugs.
//!
//! Every plug speaks the same base command set, exposed through the [`Plug`]
//! trait. Energy metering exists only on the HS110 and is reached through
//! [`Hs110::meter`], so calling it on a plug without a meter does not
//! compile.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use hsplug_core::device::{Hs110, Plug};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hsplug_core::Error> {
//!     let plug = Hs110::new("192.168.1.100", Duration::from_secs(5));
//!     plug.turn_on().await?;
//!     let reading = plug.meter().realtime().await?;
//!     println!("{} W", reading.power_w);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::{
    commands::{self, Command},
    emeter::Meter,
    error::Result,
    response::{self, CloudInfo, DeviceTime, KeyType, ScanInfo, SysInfo, TimezoneInfo},
    schedule::{NewRule, NextAction, ScheduleRules},
    transport::{LegacyTransport, Target, Transport},
};

#[derive(Deserialize)]
struct AddedRule {
    id: String,
}

/// Commands shared by every HS1xx plug.
///
/// Implementors only supply [`Plug::transport`]. Reads return typed
/// values; writes succeed only when the device acknowledges them with
/// `err_code` 0.
#[async_trait]
pub trait Plug: Send + Sync {
    /// The transport commands go through.
    fn transport(&self) -> &dyn Transport;

    /// Sends `command` and returns the raw JSON reply.
    async fn query(&self, command: &Command) -> Result<String> {
        debug!(host = self.transport().host(), bytes = command.as_str().len(), "query");
        self.transport().send(command).await
    }

    /// Reads system information.
    async fn sysinfo(&self) -> Result<SysInfo> {
        let raw = self.query(&commands::INFO).await?;
        response::extract(&raw, "system", "get_sysinfo")
    }

    /// Switches the relay.
    async fn set_relay(&self, on: bool) -> Result<()> {
        let raw = self.query(&commands::relay(on)).await?;
        response::expect_ack(&raw, "system", "set_relay_state")
    }

    /// Switches the relay on.
    async fn turn_on(&self) -> Result<()> {
        self.set_relay(true).await
    }

    /// Switches the relay off.
    async fn turn_off(&self) -> Result<()> {
        self.set_relay(false).await
    }

    /// Lights or darkens the indicator LED.
    async fn set_led(&self, on: bool) -> Result<()> {
        let raw = self.query(&commands::led(on)).await?;
        response::expect_ack(&raw, "system", "set_led_off")
    }

    async fn set_alias(&self, alias: &str) -> Result<()> {
        let raw = self.query(&commands::set_alias(alias)).await?;
        response::expect_ack(&raw, "system", "set_dev_alias")
    }

    async fn reboot(&self) -> Result<()> {
        let raw = self.query(&commands::REBOOT).await?;
        response::expect_ack(&raw, "system", "reboot")
    }

    /// Restores factory settings.
    async fn reset(&self) -> Result<()> {
        let raw = self.query(&commands::RESET).await?;
        response::expect_ack(&raw, "system", "reset")
    }

    /// Reads the device clock as reported, without a zone.
    async fn device_time(&self) -> Result<DeviceTime> {
        let raw = self.query(&commands::TIME).await?;
        response::extract(&raw, "time", "get_time")
    }

    /// Reads the device clock, interpreting it at `offset`.
    ///
    /// The device does not report its UTC offset in a usable form, so the
    /// caller has to know it.
    async fn time(&self, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
        self.device_time().await?.with_offset(offset)
    }

    async fn timezone(&self) -> Result<TimezoneInfo> {
        let raw = self.query(&commands::TIMEZONE).await?;
        response::extract(&raw, "time", "get_timezone")
    }

    /// Sets the clock to `local` in the firmware timezone `index`.
    async fn set_timezone(&self, local: NaiveDateTime, index: u16) -> Result<()> {
        let raw = self.query(&commands::set_timezone(local, index)).await?;
        response::expect_ack(&raw, "time", "set_timezone")
    }

    /// Lists the access points the plug can see.
    async fn scan_wifi(&self) -> Result<ScanInfo> {
        let raw = self.query(&commands::WLANSCAN).await?;
        response::extract(&raw, "netif", "get_scaninfo")
    }

    /// Joins a Wi-Fi network. The plug drops off its current network.
    async fn join_wifi(&self, ssid: &str, password: &str, key_type: KeyType) -> Result<()> {
        let raw = self
            .query(&commands::wifi_join(ssid, password, key_type))
            .await?;
        response::expect_ack(&raw, "netif", "set_stainfo")
    }

    async fn cloud_info(&self) -> Result<CloudInfo> {
        let raw = self.query(&commands::CLOUDINFO).await?;
        response::extract(&raw, "cnCloud", "get_info")
    }

    async fn cloud_bind(&self, username: &str, password: &str) -> Result<()> {
        let raw = self
            .query(&commands::cloud_bind(username, password))
            .await?;
        response::expect_ack(&raw, "cnCloud", "bind")
    }

    async fn cloud_unbind(&self) -> Result<()> {
        let raw = self.query(&commands::CLOUD_UNBIND).await?;
        response::expect_ack(&raw, "cnCloud", "unbind")
    }

    async fn cloud_set_server(&self, server: &str) -> Result<()> {
        let raw = self.query(&commands::cloud_set_server(server)).await?;
        response::expect_ack(&raw, "cnCloud", "set_server_url")
    }

    async fn schedule_rules(&self) -> Result<ScheduleRules> {
        let raw = self.query(&commands::SCHEDULE).await?;
        response::extract(&raw, "schedule", "get_rules")
    }

    /// Adds a schedule rule and returns the id the device assigned.
    async fn add_rule(&self, rule: &NewRule) -> Result<String> {
        let raw = self.query(&commands::add_rule(rule)?).await?;
        response::expect_ack(&raw, "schedule", "add_rule")?;
        let added: AddedRule = response::extract(&raw, "schedule", "add_rule")?;
        Ok(added.id)
    }

    async fn next_action(&self) -> Result<NextAction> {
        let raw = self.query(&commands::NEXT_ACTION).await?;
        response::extract(&raw, "schedule", "get_next_action")
    }
}

/// HS100 smart plug.
#[derive(Debug, Clone)]
pub struct Hs100 {
    transport: LegacyTransport,
}

/// The HS105 speaks exactly the HS100 command set.
pub type Hs105 = Hs100;

impl Hs100 {
    /// A plug at `host` on the default port over length-prefixed TCP.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self::with_target(Target::new(host).with_timeout(timeout))
    }

    /// A plug at a fully specified target.
    pub fn with_target(target: Target) -> Self {
        Self {
            transport: LegacyTransport::new(target),
        }
    }

    pub fn target(&self) -> &Target {
        self.transport.target()
    }
}

impl Plug for Hs100 {
    fn transport(&self) -> &dyn Transport {
        &self.transport
    }
}

/// HS110 smart plug with energy metering.
#[derive(Debug, Clone)]
pub struct Hs110 {
    transport: LegacyTransport,
}

impl Hs110 {
    /// A plug at `host` on the default port over length-prefixed TCP.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self::with_target(Target::new(host).with_timeout(timeout))
    }

    /// A plug at a fully specified target.
    pub fn with_target(target: Target) -> Self {
        Self {
            transport: LegacyTransport::new(target),
        }
    }

    pub fn target(&self) -> &Target {
        self.transport.target()
    }

    /// The energy meter.
    pub fn meter(&self) -> Meter<'_> {
        Meter::new(&self.transport)
    }
}

impl Plug for Hs110 {
    fn transport(&self) -> &dyn Transport {
        &self.transport
    }
}
