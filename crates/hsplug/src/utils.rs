use std::io::IsTerminal;

use chrono::{Local, Offset};
use hsplug_core::schedule::Weekdays;

/// Read password securely based on the provided options.
///
/// # Priority
///
/// 1. If `password` was provided (hidden option), use it
/// 2. If `password_stdin` is true, read from stdin
/// 3. Otherwise, prompt interactively (if terminal is available)
pub fn read_password(
    password_stdin: bool,
    password: Option<String>,
    prompt: &str,
) -> Result<String, String> {
    if let Some(pass) = password {
        return Ok(pass);
    }

    if password_stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| format!("Failed to read password from stdin: {}", e))?;
        return Ok(input.trim_end_matches(['\r', '\n']).to_string());
    }

    if std::io::stdin().is_terminal() {
        eprint!("{}: ", prompt);
        rpassword::read_password().map_err(|e| format!("Failed to read password: {}", e))
    } else {
        Err("No password provided. Use --password-stdin when piping input.".to_string())
    }
}

/// This machine's current UTC offset.
pub fn local_offset() -> chrono::FixedOffset {
    Local::now().offset().fix()
}

/// Parses `HH:MM` into minutes after midnight.
pub fn parse_minute_of_day(arg: &str) -> Result<u16, String> {
    let invalid = || format!("invalid time of day '{}': expected HH:MM", arg);
    let (hours, minutes) = arg.split_once(':').ok_or_else(invalid)?;
    let hours: u16 = hours.parse().map_err(|_| invalid())?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Parses seven 0/1 flags, Sunday first, e.g. `0111110` for weekdays.
pub fn parse_days(arg: &str) -> Result<Weekdays, String> {
    let flags: Vec<bool> = arg
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(format!("invalid day flag '{}': expected 0 or 1", other)),
        })
        .collect::<Result<_, _>>()?;
    let days: [bool; 7] = flags
        .try_into()
        .map_err(|_| format!("expected 7 day flags, got '{}'", arg))?;
    Ok(Weekdays::new(days))
}

/// Print a JSON response, validating it first.
pub fn print_json_response(response: &str) {
    match serde_json::from_str::<serde_json::Value>(response) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", response),
    }
}

/// Print guidance message after successful WiFi join command.
pub fn print_wifi_join_success(ssid: &str) {
    eprintln!();
    eprintln!("WiFi credentials sent successfully!");
    eprintln!();
    eprintln!("The plug will now leave its access point and try to join '{}'.", ssid);
    eprintln!("Reconnect to your normal WiFi and run:");
    eprintln!("  hsplug discover");
}
