use std::{net::SocketAddr, time::Duration};

use chrono::{FixedOffset, Utc};
use hsplug_core::{
    Command, DiscoveryConfig, Error, Hs110, Mode, Plug, Result, Target, discover,
    response::KeyType, schedule::NewRule,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::cli::DeviceCommand;
use crate::utils::{
    local_offset, parse_days, parse_minute_of_day, print_json_response, print_wifi_join_success,
    read_password,
};

/// Handle the discover command.
pub async fn handle_discover(timeout: Duration, listen: SocketAddr, broadcast: SocketAddr) {
    let config = DiscoveryConfig::default()
        .with_listen(listen)
        .with_target(broadcast)
        .with_timeout(timeout);

    match discover(&config).await {
        Ok(found) => {
            debug!(device_count = found.devices.len(), "discovered devices");
            for (addr, e) in &found.rejected {
                warn!(addr = %addr, error = %e, "unusable discovery reply");
            }
            match to_json(&found.devices) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!(error = %e, "could not serialize discovery result");
                    eprintln!("Error: Discovery failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "discovery failed");
            eprintln!("Error: Discovery failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle the device command.
pub async fn handle_device(
    host: String,
    port: u16,
    timeout: Duration,
    mode: Mode,
    utc_offset: Option<FixedOffset>,
    command: DeviceCommand,
) {
    let target = Target::new(host)
        .with_port(port)
        .with_mode(mode)
        .with_timeout(timeout);
    debug!(addr = %target.addr(), mode = %mode, "using target");

    let plug = Hs110::with_target(target);
    let offset = utc_offset.unwrap_or_else(local_offset);

    match run_device(&plug, offset, command).await {
        Ok(output) => print_json_response(&output),
        Err(e) => {
            error!(addr = %plug.target().addr(), error = %e, "command failed");
            eprintln!("Error: {}: {}", plug.target().addr(), e);
            std::process::exit(1);
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn acknowledged() -> Result<String> {
    Ok(json!({ "ok": true }).to_string())
}

/// Runs one device command and returns the JSON to print.
async fn run_device(plug: &Hs110, offset: FixedOffset, command: DeviceCommand) -> Result<String> {
    match command {
        DeviceCommand::Info => to_json(&plug.sysinfo().await?),
        DeviceCommand::On => {
            plug.turn_on().await?;
            acknowledged()
        }
        DeviceCommand::Off => {
            plug.turn_off().await?;
            acknowledged()
        }
        DeviceCommand::Ledon => {
            plug.set_led(true).await?;
            acknowledged()
        }
        DeviceCommand::Ledoff => {
            plug.set_led(false).await?;
            acknowledged()
        }
        DeviceCommand::Alias { name } => {
            plug.set_alias(&name).await?;
            acknowledged()
        }
        DeviceCommand::Reboot => {
            plug.reboot().await?;
            acknowledged()
        }
        DeviceCommand::Reset => {
            plug.reset().await?;
            acknowledged()
        }
        DeviceCommand::Time => {
            let at = plug.time(offset).await?;
            Ok(json!({ "time": at.to_rfc3339() }).to_string())
        }
        DeviceCommand::Timezone => to_json(&plug.timezone().await?),
        DeviceCommand::SetTime { index, at } => {
            let local = at.unwrap_or_else(|| Utc::now().with_timezone(&offset).naive_local());
            debug!(local = %local, index, "setting time");
            plug.set_timezone(local, index).await?;
            acknowledged()
        }
        DeviceCommand::Wlanscan => to_json(&plug.scan_wifi().await?),
        DeviceCommand::WifiJoin {
            ssid,
            keytype,
            password_stdin,
            password,
        } => {
            let key_type = KeyType::try_from(keytype).map_err(Error::InvalidArgument)?;
            let password = if key_type == KeyType::None {
                password.unwrap_or_default()
            } else {
                read_password(password_stdin, password, &format!("Password for {}", ssid))
                    .map_err(Error::InvalidArgument)?
            };
            plug.join_wifi(&ssid, &password, key_type).await?;
            print_wifi_join_success(&ssid);
            acknowledged()
        }
        DeviceCommand::Cloudinfo => to_json(&plug.cloud_info().await?),
        DeviceCommand::CloudBind {
            username,
            password_stdin,
            password,
        } => {
            let password = read_password(
                password_stdin,
                password,
                &format!("Password for {}", username),
            )
            .map_err(Error::InvalidArgument)?;
            plug.cloud_bind(&username, &password).await?;
            acknowledged()
        }
        DeviceCommand::CloudUnbind => {
            plug.cloud_unbind().await?;
            acknowledged()
        }
        DeviceCommand::CloudServer { server } => {
            plug.cloud_set_server(&server).await?;
            acknowledged()
        }
        DeviceCommand::Schedule => to_json(&plug.schedule_rules().await?),
        DeviceCommand::AddRule {
            name,
            at,
            off,
            days,
        } => {
            let minute = parse_minute_of_day(&at).map_err(Error::InvalidArgument)?;
            let days = parse_days(&days).map_err(Error::InvalidArgument)?;
            let rule = if off {
                NewRule::turn_off_at(&name, minute, days)
            } else {
                NewRule::turn_on_at(&name, minute, days)
            };
            let id = plug.add_rule(&rule).await?;
            Ok(json!({ "id": id }).to_string())
        }
        DeviceCommand::NextAction => to_json(&plug.next_action().await?),
        DeviceCommand::Energy => to_json(&plug.meter().realtime().await?),
        DeviceCommand::DailyStats { month, year } => {
            to_json(&plug.meter().daily_stats(month, year).await?)
        }
        DeviceCommand::MonthlyStats { year } => to_json(&plug.meter().monthly_stats(year).await?),
        DeviceCommand::EnergyReset => {
            plug.meter().erase_stats().await?;
            acknowledged()
        }
        DeviceCommand::Raw { json } => {
            let command = Command::raw(json)?;
            plug.query(&command).await
        }
    }
}
