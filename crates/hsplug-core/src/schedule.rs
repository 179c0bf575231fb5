//! Schedule rule types.
//!
//! The firmware keeps a list of rules under the `schedule` module. Each rule
//! names the weekdays it fires on as a seven-entry `0`/`1` array starting
//! with Sunday, which [`Weekdays`] models.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser::SerializeSeq};

/// Days of the week a rule repeats on, Sunday first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Weekdays([bool; 7]);

impl Weekdays {
    /// Builds the set from seven flags, Sunday through Saturday.
    pub const fn new(days: [bool; 7]) -> Self {
        Weekdays(days)
    }

    /// Every day of the week.
    pub const fn every_day() -> Self {
        Weekdays([true; 7])
    }

    /// Builds the set from a bit mask; bit 0 is Sunday, bit 6 Saturday.
    /// Bit 7 is ignored.
    pub fn from_bits(bits: u8) -> Self {
        let mut days = [false; 7];
        for (i, day) in days.iter_mut().enumerate() {
            *day = bits & (1 << i) != 0;
        }
        Weekdays(days)
    }

    /// Returns true if the rule fires on `day`.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_sunday() as usize]
    }

    /// Adds `day` to the set.
    pub fn insert(&mut self, day: Weekday) {
        self.0[day.num_days_from_sunday() as usize] = true;
    }

    /// The seven flags, Sunday first.
    pub fn as_array(&self) -> [bool; 7] {
        self.0
    }
}

impl From<[bool; 7]> for Weekdays {
    fn from(days: [bool; 7]) -> Self {
        Weekdays(days)
    }
}

impl fmt::Display for Weekdays {
    /// Formats as the firmware's array literal, e.g. `[1,0,1,0,1,0,1]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, &day) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(if day { "1" } else { "0" })?;
        }
        f.write_str("]")
    }
}

impl Serialize for Weekdays {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(7))?;
        for &day in &self.0 {
            seq.serialize_element(&u8::from(day))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Weekdays {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        if raw.len() != 7 {
            return Err(de::Error::invalid_length(raw.len(), &"7 weekday flags"));
        }
        let mut days = [false; 7];
        for (slot, value) in days.iter_mut().zip(raw) {
            *slot = match value {
                0 => false,
                1 => true,
                other => {
                    return Err(de::Error::invalid_value(
                        de::Unexpected::Unsigned(other.into()),
                        &"0 or 1",
                    ));
                }
            };
        }
        Ok(Weekdays(days))
    }
}

/// Rule action: switch the relay off.
pub const ACTION_OFF: i8 = 0;
/// Rule action: switch the relay on.
pub const ACTION_ON: i8 = 1;
/// No end action.
pub const ACTION_NONE: i8 = -1;

/// A rule to send with `add_rule`.
///
/// Times are minutes after midnight in the device's local time. `stime_opt`
/// of 0 means a fixed time; 1 and 2 are sunrise and sunset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRule {
    pub name: String,
    pub enable: u8,
    pub wday: Weekdays,
    pub repeat: u8,
    pub stime_opt: i8,
    pub smin: u16,
    pub sact: i8,
    pub etime_opt: i8,
    pub emin: u16,
    pub eact: i8,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub force: u8,
    pub latitude: i32,
    pub longitude: i32,
}

impl NewRule {
    fn repeating(name: &str, minute_of_day: u16, days: Weekdays, action: i8) -> Self {
        Self {
            name: name.to_string(),
            enable: 1,
            wday: days,
            repeat: 1,
            stime_opt: 0,
            smin: minute_of_day,
            sact: action,
            etime_opt: -1,
            emin: 0,
            eact: ACTION_NONE,
            year: 0,
            month: 0,
            day: 0,
            force: 0,
            latitude: 0,
            longitude: 0,
        }
    }

    /// A weekly rule that switches the relay on at `minute_of_day`.
    pub fn turn_on_at(name: &str, minute_of_day: u16, days: Weekdays) -> Self {
        Self::repeating(name, minute_of_day, days, ACTION_ON)
    }

    /// A weekly rule that switches the relay off at `minute_of_day`.
    pub fn turn_off_at(name: &str, minute_of_day: u16, days: Weekdays) -> Self {
        Self::repeating(name, minute_of_day, days, ACTION_OFF)
    }

    /// Stores the rule disabled.
    pub fn disabled(mut self) -> Self {
        self.enable = 0;
        self
    }
}

/// A rule as reported by `get_rules`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleRule {
    pub id: String,
    pub name: String,
    pub enable: u8,
    pub wday: Weekdays,
    pub smin: u16,
    pub sact: i8,
    #[serde(default)]
    pub stime_opt: i8,
    #[serde(default)]
    pub repeat: u8,
    #[serde(default)]
    pub etime_opt: Option<i8>,
    #[serde(default)]
    pub emin: Option<u16>,
    #[serde(default)]
    pub eact: Option<i8>,
}

impl ScheduleRule {
    pub fn is_enabled(&self) -> bool {
        self.enable == 1
    }
}

/// The `get_rules` payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleRules {
    pub rule_list: Vec<ScheduleRule>,
    /// Whether scheduling is enabled as a whole.
    #[serde(default)]
    pub enable: Option<u8>,
    #[serde(default)]
    pub version: Option<u32>,
}

/// The `get_next_action` payload.
///
/// `kind` is -1 when nothing is scheduled, in which case the other fields
/// are absent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NextAction {
    #[serde(rename = "type")]
    pub kind: i32,
    #[serde(default)]
    pub id: Option<String>,
    /// Seconds after local midnight.
    #[serde(default)]
    pub schd_time: Option<i64>,
    #[serde(default)]
    pub action: Option<i8>,
}

impl NextAction {
    pub fn is_scheduled(&self) -> bool {
        self.kind != -1
    }
}
