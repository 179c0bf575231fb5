//! JSON command catalog for HS1xx plugs.
//!
//! Fixed commands are `const` [`Command`]s. Commands that carry caller data
//! are built by functions that JSON-escape every string they interpolate, so
//! an alias such as `Desk "lamp"` can never break the document.
//!
//! # Example
//!
//! ```
//! use hsplug_core::commands;
//!
//! let cmd = commands::set_alias(r#"Desk "lamp""#);
//! assert_eq!(
//!     cmd.as_str(),
//!     r#"{"system":{"set_dev_alias":{"alias":"Desk \"lamp\""}}}"#
//! );
//! ```

use std::{borrow::Cow, fmt};

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::{
    error::{Error, Result},
    response::KeyType,
    schedule::NewRule,
};

/// One well-formed JSON command document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Cow<'static, str>);

impl Command {
    const fn fixed(json: &'static str) -> Self {
        Command(Cow::Borrowed(json))
    }

    /// Wraps caller-supplied JSON after checking that it parses as an object.
    pub fn raw(json: impl Into<String>) -> Result<Self> {
        let json = json.into();
        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|e| Error::InvalidArgument(format!("command is not valid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(Error::InvalidArgument(
                "command must be a JSON object".into(),
            ));
        }
        Ok(Command(Cow::Owned(json)))
    }

    /// The JSON text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The JSON text as bytes, ready for the cipher.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Renders `s` as a quoted, escaped JSON string literal.
fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Get system information.
///
/// Returns model, alias, MAC address, firmware version, relay state, and more.
pub const INFO: Command = Command::fixed(r#"{"system":{"get_sysinfo":{}}}"#);

/// Reboot the device with a 1-second delay.
pub const REBOOT: Command = Command::fixed(r#"{"system":{"reboot":{"delay":1}}}"#);

/// Factory reset the device with a 1-second delay.
///
/// **Warning:** This will erase all settings and require re-setup.
pub const RESET: Command = Command::fixed(r#"{"system":{"reset":{"delay":1}}}"#);

/// Turn on the relay (power on the connected load).
pub const RELAY_ON: Command = Command::fixed(r#"{"system":{"set_relay_state":{"state":1}}}"#);

/// Turn off the relay.
pub const RELAY_OFF: Command = Command::fixed(r#"{"system":{"set_relay_state":{"state":0}}}"#);

/// Turn on the LED indicator light.
pub const LED_ON: Command = Command::fixed(r#"{"system":{"set_led_off":{"off":0}}}"#);

/// Turn off the LED indicator light.
pub const LED_OFF: Command = Command::fixed(r#"{"system":{"set_led_off":{"off":1}}}"#);

/// Get the device's wall-clock time.
pub const TIME: Command = Command::fixed(r#"{"time":{"get_time":{}}}"#);

/// Get the device's timezone index.
pub const TIMEZONE: Command = Command::fixed(r#"{"time":{"get_timezone":{}}}"#);

/// Scan for wireless networks (forces a fresh scan).
pub const WLANSCAN: Command = Command::fixed(r#"{"netif":{"get_scaninfo":{"refresh":1}}}"#);

/// Get cloud connection information.
pub const CLOUDINFO: Command = Command::fixed(r#"{"cnCloud":{"get_info":{}}}"#);

/// Unbind the device from its cloud account. Local control keeps working.
pub const CLOUD_UNBIND: Command = Command::fixed(r#"{"cnCloud":{"unbind":{}}}"#);

/// Get schedule rules.
pub const SCHEDULE: Command = Command::fixed(r#"{"schedule":{"get_rules":null}}"#);

/// Get the next scheduled action.
pub const NEXT_ACTION: Command = Command::fixed(r#"{"schedule":{"get_next_action":null}}"#);

/// Get real-time energy meter readings (HS110 only).
pub const ENERGY: Command = Command::fixed(r#"{"emeter":{"get_realtime":{}}}"#);

/// Erase all energy meter statistics.
///
/// **Warning:** This permanently deletes energy usage history.
pub const ENERGY_RESET: Command = Command::fixed(r#"{"emeter":{"erase_emeter_stat":null}}"#);

/// Relay command for the requested state.
pub fn relay(on: bool) -> Command {
    if on { RELAY_ON } else { RELAY_OFF }
}

/// LED command; `on` lights the indicator.
pub fn led(on: bool) -> Command {
    if on { LED_ON } else { LED_OFF }
}

/// Rename the device.
pub fn set_alias(alias: &str) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"system":{{"set_dev_alias":{{"alias":{}}}}}}}"#,
        quote(alias)
    )))
}

/// Set the device clock and timezone in one call.
///
/// `local` is the wall-clock time in the zone identified by `index`, the
/// firmware's own timezone table index. The firmware has no separate
/// "set time" command.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use hsplug_core::commands;
///
/// let at = NaiveDate::from_ymd_opt(2016, 1, 1)
///     .unwrap()
///     .and_hms_opt(10, 10, 10)
///     .unwrap();
/// let cmd = commands::set_timezone(at, 42);
/// assert!(cmd.as_str().contains(r#""index":42"#));
/// ```
pub fn set_timezone(local: NaiveDateTime, index: u16) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"time":{{"set_timezone":{{"year":{},"month":{},"mday":{},"hour":{},"min":{},"sec":{},"index":{}}}}}}}"#,
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second(),
        index
    )))
}

/// Join a Wi-Fi network.
///
/// Used while the plug runs its own access point during provisioning.
///
/// # Security Note
///
/// The password travels inside the JSON, scrambled only by the XOR cipher.
pub fn wifi_join(ssid: &str, password: &str, key_type: KeyType) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"netif":{{"set_stainfo":{{"ssid":{},"password":{},"key_type":{}}}}}}}"#,
        quote(ssid),
        quote(password),
        u8::from(key_type)
    )))
}

/// Bind the device to a cloud account.
///
/// # Security Note
///
/// The password travels inside the JSON, scrambled only by the XOR cipher.
pub fn cloud_bind(username: &str, password: &str) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"cnCloud":{{"bind":{{"username":{},"password":{}}}}}}}"#,
        quote(username),
        quote(password)
    )))
}

/// Point the device at another cloud server.
pub fn cloud_set_server(server: &str) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"cnCloud":{{"set_server_url":{{"server":{}}}}}}}"#,
        quote(server)
    )))
}

/// Add a schedule rule.
pub fn add_rule(rule: &NewRule) -> Result<Command> {
    let body = serde_json::to_string(rule)?;
    Ok(Command(Cow::Owned(format!(
        r#"{{"schedule":{{"add_rule":{}}}}}"#,
        body
    ))))
}

/// Daily energy statistics for one month.
pub fn daily_stats(month: u32, year: i32) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"emeter":{{"get_daystat":{{"month":{},"year":{}}}}}}}"#,
        month, year
    )))
}

/// Monthly energy statistics for one year.
pub fn monthly_stats(year: i32) -> Command {
    Command(Cow::Owned(format!(
        r#"{{"emeter":{{"get_monthstat":{{"year":{}}}}}}}"#,
        year
    )))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    use super::*;
    use crate::schedule::Weekdays;

    fn parse(cmd: &Command) -> Value {
        serde_json::from_str(cmd.as_str()).unwrap()
    }

    #[test]
    fn test_fixed_commands_are_valid_json() {
        for cmd in [
            INFO,
            REBOOT,
            RESET,
            RELAY_ON,
            RELAY_OFF,
            LED_ON,
            LED_OFF,
            TIME,
            TIMEZONE,
            WLANSCAN,
            CLOUDINFO,
            CLOUD_UNBIND,
            SCHEDULE,
            NEXT_ACTION,
            ENERGY,
            ENERGY_RESET,
        ] {
            assert!(parse(&cmd).is_object(), "{}", cmd);
        }
    }

    #[test]
    fn test_alias_is_escaped() {
        let cmd = set_alias("a\"},\"x\":{\"y\\");
        let value = parse(&cmd);
        assert_eq!(
            value["system"]["set_dev_alias"]["alias"],
            "a\"},\"x\":{\"y\\"
        );
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_wifi_join_escapes_ssid_and_password() {
        let cmd = wifi_join("My \"Net\"", "p\\ss\nword", KeyType::Wpa2);
        assert_eq!(
            parse(&cmd),
            json!({"netif": {"set_stainfo": {
                "ssid": "My \"Net\"",
                "password": "p\\ss\nword",
                "key_type": 3
            }}})
        );
    }

    #[test]
    fn test_cloud_commands() {
        assert_eq!(
            parse(&cloud_bind("user@example.com", "se\"cret")),
            json!({"cnCloud": {"bind": {"username": "user@example.com", "password": "se\"cret"}}})
        );
        assert_eq!(
            parse(&cloud_set_server("devs.tplinkcloud.com")),
            json!({"cnCloud": {"set_server_url": {"server": "devs.tplinkcloud.com"}}})
        );
    }

    #[test]
    fn test_set_timezone_fields() {
        let at = NaiveDate::from_ymd_opt(2016, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            parse(&set_timezone(at, 42)),
            json!({"time": {"set_timezone": {
                "year": 2016, "month": 1, "mday": 2,
                "hour": 3, "min": 4, "sec": 5, "index": 42
            }}})
        );
    }

    #[test]
    fn test_stats_commands() {
        assert_eq!(
            daily_stats(5, 2017).as_str(),
            r#"{"emeter":{"get_daystat":{"month":5,"year":2017}}}"#
        );
        assert_eq!(
            monthly_stats(2017).as_str(),
            r#"{"emeter":{"get_monthstat":{"year":2017}}}"#
        );
    }

    #[test]
    fn test_add_rule_embeds_weekdays() {
        let rule = NewRule::turn_on_at("lights \"on\"", 1014, Weekdays::from_bits(0b0011001));
        let cmd = add_rule(&rule).unwrap();
        let value = parse(&cmd);
        let add = &value["schedule"]["add_rule"];
        assert_eq!(add["name"], "lights \"on\"");
        assert_eq!(add["wday"], json!([1, 0, 0, 1, 1, 0, 0]));
        assert_eq!(add["smin"], 1014);
        assert_eq!(add["sact"], 1);
    }

    #[test]
    fn test_raw_validates() {
        assert!(Command::raw(r#"{"system":{"get_sysinfo":{}}}"#).is_ok());
        assert!(matches!(
            Command::raw(r#"{"system":"#),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(Command::raw("[1,2]"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_relay_and_led_helpers() {
        assert_eq!(relay(true), RELAY_ON);
        assert_eq!(relay(false), RELAY_OFF);
        assert_eq!(led(true), LED_ON);
        assert_eq!(led(false), LED_OFF);
    }
}
