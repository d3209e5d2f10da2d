//! Slot and date transformation.
//!
//! Raw vendor slot records are converted into display-ready [`AppointmentSlot`]s and grouped
//! into [`AvailableDate`]s. One facility timezone drives both the calendar-date grouping and
//! the 12-hour display time, so a slot is always listed under the day a patient would see
//! on the clinic's wall clock.
//!
//! Everything here is pure: the same input always produces the same output. Filtering out
//! past slots is a separate step that takes "now" explicitly.

use crate::constants::DEFAULT_SLOT_MINUTES;
use crate::models::{extract_list, first_string};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A slot record as the vendor returns it, after lenient field extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSlot {
    pub start_time: String,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub available: bool,
    pub kind: Option<String>,
    pub slot_type_ids: Vec<String>,
}

impl RawSlot {
    /// An available slot with only a start time.
    pub fn new(start_time: impl Into<String>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: None,
            duration_minutes: None,
            available: true,
            kind: None,
            slot_type_ids: Vec::new(),
        }
    }

    /// Extract a slot from a vendor record; records without a start time are skipped.
    pub fn from_record(record: &Value) -> Option<Self> {
        let start_time = first_string(record, &["start_time", "startTime", "start"])?;
        let available = ["available", "is_available", "isAvailable"]
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_bool))
            .unwrap_or(true);
        let duration_minutes = ["duration", "duration_minutes"]
            .iter()
            .find_map(|key| match record.get(*key)? {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            })
            .filter(|minutes| *minutes > 0);
        let slot_type_ids = match record.get("slot_type_ids").or_else(|| record.get("slotTypeIds")) {
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            Some(Value::Number(n)) => vec![n.to_string()],
            _ => Vec::new(),
        };

        Some(Self {
            start_time,
            end_time: first_string(record, &["end_time", "endTime", "end"]),
            duration_minutes,
            available,
            kind: first_string(record, &["slot_type", "visit_type", "type"]),
            slot_type_ids,
        })
    }
}

/// Extract raw slots from a vendor availability response.
///
/// The vendor returns either a flat slot list or a list of per-day records that carry their
/// own `slots` array; both are flattened. Returns `None` when the response holds no list.
pub fn raw_slots_from_response(value: &Value) -> Option<Vec<RawSlot>> {
    let records = extract_list(value)?;
    let mut slots = Vec::with_capacity(records.len());
    for record in records {
        match record.get("slots").and_then(Value::as_array) {
            Some(day_slots) => slots.extend(day_slots.iter().filter_map(RawSlot::from_record)),
            None => slots.extend(RawSlot::from_record(record)),
        }
    }
    Some(slots)
}

/// Kind of visit a slot is offered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SlotType {
    #[serde(rename = "consultation")]
    Consultation,
    #[serde(rename = "follow-up")]
    FollowUp,
}

impl SlotType {
    fn from_kind(kind: Option<&str>) -> Self {
        match kind {
            Some(k) if k.to_ascii_lowercase().contains("follow") => SlotType::FollowUp,
            _ => SlotType::Consultation,
        }
    }
}

/// A bookable interval, ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlot {
    pub start_time: String,
    pub end_time: String,
    pub display_time: String,
    pub available: bool,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    pub slot_type_ids: Vec<String>,
}

impl AppointmentSlot {
    /// The slot start as an instant. Slots built by [`SlotFormatter`] always parse.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.start_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One calendar day with its available slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDate {
    pub date: String,
    pub slots_count: usize,
    pub has_slots: bool,
    pub slots: Vec<AppointmentSlot>,
}

impl AvailableDate {
    fn new(date: NaiveDate, slots: Vec<AppointmentSlot>) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            slots_count: slots.len(),
            has_slots: !slots.is_empty(),
            slots,
        }
    }
}

/// Converts raw slots using the facility timezone.
#[derive(Clone, Copy, Debug)]
pub struct SlotFormatter {
    tz: Tz,
}

impl SlotFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse a vendor timestamp. Offsets are honoured; naive timestamps are facility-local.
    pub fn parse_instant(&self, value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .and_then(|naive| self.tz.from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// 12-hour clock time in the facility timezone, e.g. `9:05 AM`.
    pub fn display_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%-I:%M %p").to_string()
    }

    /// Facility-local calendar date of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    fn convert(&self, raw: &RawSlot) -> Option<(DateTime<Utc>, AppointmentSlot)> {
        let Some(start) = self.parse_instant(&raw.start_time) else {
            tracing::warn!(start_time = %raw.start_time, "skipping slot with unparsable start time");
            return None;
        };
        let end = match raw
            .end_time
            .as_deref()
            .and_then(|end| self.parse_instant(end))
            .filter(|end| *end > start)
        {
            Some(end) => end,
            None => slot_end(start, raw.duration_minutes)?,
        };

        let slot = AppointmentSlot {
            start_time: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end_time: end.to_rfc3339_opts(SecondsFormat::Secs, true),
            display_time: self.display_time(start),
            available: raw.available,
            slot_type: SlotType::from_kind(raw.kind.as_deref()),
            slot_type_ids: raw.slot_type_ids.clone(),
        };
        Some((start, slot))
    }

    /// Convert every parseable slot, ordered by start time.
    pub fn slots(&self, raw: &[RawSlot]) -> Vec<AppointmentSlot> {
        let mut converted: Vec<_> = raw.iter().filter_map(|r| self.convert(r)).collect();
        converted.sort_by_key(|(start, _)| *start);
        converted.into_iter().map(|(_, slot)| slot).collect()
    }

    /// Group available slots by facility-local calendar date, ordered by date.
    ///
    /// Unavailable or unparsable slots are dropped, and only dates with at least one slot
    /// are returned.
    pub fn group_slots_by_date(&self, raw: &[RawSlot]) -> Vec<AvailableDate> {
        let mut by_date: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, AppointmentSlot)>> =
            BTreeMap::new();
        for (start, slot) in raw.iter().filter(|r| r.available).filter_map(|r| self.convert(r)) {
            by_date
                .entry(self.local_date(start))
                .or_default()
                .push((start, slot));
        }

        by_date
            .into_iter()
            .map(|(date, mut slots)| {
                slots.sort_by_key(|(start, _)| *start);
                AvailableDate::new(date, slots.into_iter().map(|(_, slot)| slot).collect())
            })
            .filter(|date| date.has_slots)
            .collect()
    }
}

/// End of a slot that has no usable `end_time`.
///
/// Non-positive or unrepresentable durations fall back to [`DEFAULT_SLOT_MINUTES`]; a start so
/// late that even the default overflows yields `None`.
fn slot_end(start: DateTime<Utc>, duration_minutes: Option<i64>) -> Option<DateTime<Utc>> {
    let add = |minutes: i64| Duration::try_minutes(minutes).and_then(|d| start.checked_add_signed(d));
    let requested = duration_minutes.filter(|minutes| *minutes > 0);
    if let Some(end) = requested.and_then(add) {
        return Some(end);
    }
    if let Some(minutes) = duration_minutes {
        tracing::warn!(duration = minutes, "slot duration out of range, using default");
    }
    let end = add(DEFAULT_SLOT_MINUTES);
    if end.is_none() {
        tracing::warn!(start_time = %start, "skipping slot whose end cannot be represented");
    }
    end
}

/// Group raw slots by date in the given facility timezone.
pub fn group_slots_by_date(raw: &[RawSlot], tz: Tz) -> Vec<AvailableDate> {
    SlotFormatter::new(tz).group_slots_by_date(raw)
}

/// Keep only slots starting at or after `now`, dropping dates left empty.
pub fn retain_future_dates(dates: Vec<AvailableDate>, now: DateTime<Utc>) -> Vec<AvailableDate> {
    dates
        .into_iter()
        .filter_map(|date| {
            let slots = retain_future_slots(date.slots, now);
            (!slots.is_empty()).then(|| AvailableDate {
                slots_count: slots.len(),
                has_slots: true,
                slots,
                date: date.date,
            })
        })
        .collect()
}

/// Keep only slots starting at or after `now`.
pub fn retain_future_slots(slots: Vec<AppointmentSlot>, now: DateTime<Utc>) -> Vec<AppointmentSlot> {
    slots
        .into_iter()
        .filter(|slot| slot.starts_at().is_some_and(|start| start >= now))
        .collect()
}
