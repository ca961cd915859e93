// core/src/schedule.rs

//! Weekly availability schedule and the open/closed gate.
//!
//! The schedule record lives in the external admin service and is fetched
//! fresh for every storefront submission; nothing here caches. The gate
//! fails closed: a missing day entry, a malformed window, or the emergency
//! switch all read as "not accepting orders".

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: u32 = 24 * 60;

fn default_open() -> bool {
  true
}

/// Opening window for a single weekday, in whole local hours.
///
/// `end_hour` is exclusive. A window whose end precedes its start wraps
/// past midnight (e.g. 18 -> 2 covers 18:00 through 01:59 the next
/// morning); equal start and end is a zero-length window, closed all day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayWindow {
  pub start_hour: u32,
  pub end_hour: u32,
  #[serde(default = "default_open")]
  pub is_open: bool,
}

impl DayWindow {
  fn is_valid(&self) -> bool {
    self.start_hour < 24 && self.end_hour < 24
  }

  /// Whether `minutes` (minutes since local midnight) falls inside the
  /// window. Malformed hour values fail closed with a warning.
  fn contains(&self, minutes: u32) -> bool {
    if !self.is_open {
      return false;
    }
    if !self.is_valid() {
      tracing::warn!(
        start_hour = self.start_hour,
        end_hour = self.end_hour,
        "schedule window has out-of-range hours, treating as closed"
      );
      return false;
    }
    let start = self.start_hour * 60;
    let end = self.end_hour * 60;
    if start == end {
      false
    } else if start < end {
      (start..end).contains(&minutes)
    } else {
      // Overnight wrap: open from start until midnight, and again from
      // midnight until end.
      minutes >= start || minutes < end
    }
  }
}

/// Per-weekday windows. Days without an entry are closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub monday: Option<DayWindow>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tuesday: Option<DayWindow>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wednesday: Option<DayWindow>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub thursday: Option<DayWindow>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub friday: Option<DayWindow>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub saturday: Option<DayWindow>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sunday: Option<DayWindow>,
}

impl WeekSchedule {
  pub fn window_for(&self, day: Weekday) -> Option<&DayWindow> {
    match day {
      Weekday::Mon => self.monday.as_ref(),
      Weekday::Tue => self.tuesday.as_ref(),
      Weekday::Wed => self.wednesday.as_ref(),
      Weekday::Thu => self.thursday.as_ref(),
      Weekday::Fri => self.friday.as_ref(),
      Weekday::Sat => self.saturday.as_ref(),
      Weekday::Sun => self.sunday.as_ref(),
    }
  }
}

/// The full schedule record as stored by the admin service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSchedule {
  /// Manual override: when set, the business is closed regardless of the
  /// weekly windows. Checked before anything else.
  #[serde(default)]
  pub is_emergency_off: bool,
  #[serde(flatten)]
  pub week: WeekSchedule,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl BusinessSchedule {
  /// Evaluates the gate at a wall-clock instant already converted to the
  /// business's local timezone.
  pub fn is_open_at(&self, local: NaiveDateTime) -> bool {
    if self.is_emergency_off {
      tracing::debug!("gate closed: emergency switch is on");
      return false;
    }
    let minutes = local.time().hour() * 60 + local.time().minute();
    debug_assert!(minutes < MINUTES_PER_DAY);
    match self.week.window_for(local.date().weekday()) {
      Some(window) => window.contains(minutes),
      None => {
        tracing::debug!(day = %local.date().weekday(), "gate closed: no window for day");
        false
      }
    }
  }
}
