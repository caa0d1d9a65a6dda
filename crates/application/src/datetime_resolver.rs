//! Date/time phrase resolution
//!
//! Turns a literal phrase ("morgen um 14:30", "next sunday", "alle 8") plus a
//! reference instant into an absolute, zone-aware timestamp and a dep/arr
//! anchor. Supported shapes, in priority order:
//! - explicit dates and times ("2024-05-16 14:30", "16.05.2024", "14:30")
//! - relative days ("heute", "tomorrow", "dopodomani")
//! - weekdays and weekends, always strictly after the reference day
//! - bare times of day, today if still ahead, else tomorrow
//! - parts of the day ("abends", "stasera", "monday morning") at a fixed
//!   hour, or shifting a bare 1-11 o'clock into the afternoon

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc, Weekday,
};
use domain::{DepArr, Language, TransitTimezone};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::ApplicationError;

#[allow(clippy::expect_used)] // Infallible with valid static patterns
fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile static pattern")
}

static ARRIVAL_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:bis|by|per\s+le|entro|ankommen|ankunft|arrive|arriving|arrival|arrivo|arrivare)\b",
    )
});
static RELATIVE_OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\bin\s+(\d{1,3})\s+(minuten|minute|min|minutes|minuti|stunden|stunde|hours|hour|ore|ora)\b",
    )
});
static NOW_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b(?:jetzt|sofort|now|adesso|subito)\b"));
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"\b(\d{4})-(\d{1,2})-(\d{1,2})(?:[t\s]+(\d{1,2}):(\d{2}))?")
});
static DOTTED_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})?"));
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}))?\b"));
static DAY_AFTER_TOMORROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"\b(?:übermorgen|uebermorgen|dopodomani|(?:the\s+)?day\s+after\s+tomorrow)\b")
});
static TODAY_RE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\b(?:heute|today|oggi)\b"));
static TOMORROW_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b(?:morgen|tomorrow|domani)\b"));
static WEEKEND_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:am\s+|this\s+|next\s+|at\s+the\s+|nel\s+|questo\s+)?(?:wochenende|weekend|fine\s+settimana)\b",
    )
});
static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:(?:nächsten|naechsten|nächster|kommenden|next|this|on|am|prossimo|prossima)\s+)?(montag|dienstag|mittwoch|donnerstag|freitag|samstag|sonntag|monday|tuesday|wednesday|thursday|friday|saturday|sunday|lunedì|lunedi|martedì|martedi|mercoledì|mercoledi|giovedì|giovedi|venerdì|venerdi|sabato|domenica)(?:\s+(?:prossimo|prossima))?\b",
    )
});
static TIME_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b(\d{1,2})[:.](\d{2})(?:\s*(am|pm)\b)?"));
static TIME_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b(\d{1,2})\s*(uhr|h|am|pm)\b"));
static TIME_PREFIXED_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:um|at|alle\s+ore|alle|ore|gegen|ab|bis|by|per\s+le|entro\s+le|entro)\s+(\d{1,2})\b",
    )
});
/// "montag morgen", "heute morgen", "am morgen": the morning, not tomorrow
static MORNING_AFTER_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:(heute|morgen|montag|dienstag|mittwoch|donnerstag|freitag|samstag|sonntag)|am)\s+morgen\b",
    )
});
static DAYPART_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:(?:am|in\s+the|this|in\s+der|di|la|nel|in)\s+)?(morgens|früh|frueh|vormittags|vormittag|nachmittags|nachmittag|mittags|mittag|abends|abend|nachts|nacht|mattina|mattino|pomeriggio|sera|notte|morning|afternoon|evening|night|tonight|stasera|stamattina|stanotte)\b",
    )
});
/// Connective words that may remain once the date and time are consumed
static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"\b(?:um|at|alle|ore|gegen|ab|bis|by|per|le|entro|uhr|am|on|the|of|il|la|del|der|den|dem|ankommen|ankunft|arrive|arriving|arrival|arrivo|arrivare|abfahrt|abfahren|depart|departure|partenza|and|und|e)\b",
    )
});

/// Part of the day named in a phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Daypart {
    /// Hour used when no clock time is given
    hour: u32,
    /// Clock hours below 12 mean the afternoon
    afternoon: bool,
    /// The word itself names today ("stasera", "tonight")
    today: bool,
}

impl Daypart {
    const fn new(hour: u32) -> Self {
        Self {
            hour,
            afternoon: hour >= 15 && hour < 22,
            today: false,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        let part = match word {
            "morgens" | "früh" | "frueh" | "mattina" | "mattino" | "morning" => Self::new(8),
            "vormittag" | "vormittags" => Self::new(10),
            "mittag" | "mittags" => Self::new(12),
            "nachmittag" | "nachmittags" | "pomeriggio" | "afternoon" => Self::new(15),
            "abend" | "abends" | "sera" | "evening" => Self::new(19),
            "nacht" | "nachts" | "notte" | "night" => Self::new(22),
            "tonight" | "stasera" => Self {
                today: true,
                ..Self::new(19)
            },
            "stamattina" => Self {
                today: true,
                ..Self::new(8)
            },
            "stanotte" => Self {
                today: true,
                ..Self::new(22)
            },
            _ => return None,
        };
        Some(part)
    }

    /// Apply to an explicit clock time, or stand in for a missing one
    fn clock(self, time: Option<NaiveTime>) -> Option<NaiveTime> {
        match time {
            Some(t) if self.afternoon && t.hour() < 12 => t.with_hour(t.hour() + 12),
            Some(t) => Some(t),
            None => NaiveTime::from_hms_opt(self.hour, 0, 0),
        }
    }
}

/// An absolute anchor time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedTime {
    /// Zone-aware instant
    pub at: DateTime<FixedOffset>,
    /// Whether `at` anchors the departure or the arrival
    pub dep_or_arr: DepArr,
}

/// Resolver for literal date/time phrases
#[derive(Debug, Clone, Copy)]
pub struct DateTimeResolver {
    timezone: TransitTimezone,
}

impl Default for DateTimeResolver {
    fn default() -> Self {
        Self::new(TransitTimezone::europe_rome())
    }
}

impl DateTimeResolver {
    /// Create a resolver for the transit system's local zone
    pub const fn new(timezone: TransitTimezone) -> Self {
        Self { timezone }
    }

    /// Resolve a phrase against `now`
    ///
    /// A missing or blank phrase yields `(now, dep)`.
    pub fn resolve(
        &self,
        phrase: Option<&str>,
        now: DateTime<Utc>,
        language: Language,
    ) -> Result<ResolvedTime, ApplicationError> {
        let Some(phrase) = phrase.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(ResolvedTime {
                at: self.timezone.to_fixed(&now),
                dep_or_arr: DepArr::Dep,
            });
        };

        let error = || ApplicationError::TemporalParse {
            phrase: phrase.to_string(),
        };
        let lower = phrase.to_lowercase();
        let dep_or_arr = if ARRIVAL_CUE_RE.is_match(&lower) {
            DepArr::Arr
        } else {
            DepArr::Dep
        };
        let mut rest = lower.clone();

        let at = if let Some(instant) = self.take_relative_instant(&mut rest, now) {
            instant
        } else {
            let now_local = now.with_timezone(&self.timezone.tz());
            let today = now_local.date_naive();
            let daypart = take_daypart(&mut rest);

            let (date, time) = match take(&ISO_RE, &mut rest) {
                Some(groups) => {
                    let date = ymd(&groups[1], &groups[2], &groups[3]).ok_or_else(error)?;
                    let time = match (&groups[4], &groups[5]) {
                        (Some(h), Some(m)) => Some(hm(h, m, None).ok_or_else(error)?),
                        _ => None,
                    };
                    (Some(date), time)
                },
                None => (take_date(&mut rest, today, language, error)?, None),
            };
            let time = match time {
                Some(t) => Some(t),
                None => take_time(&mut rest, error)?,
            };
            let (date, time) = match daypart {
                Some(part) => (
                    date.or_else(|| part.today.then_some(today)),
                    part.clock(time),
                ),
                None => (date, time),
            };

            match (date, time) {
                (Some(date), Some(time)) => self.localize(date.and_time(time)),
                (Some(date), None) => self.localize(date.and_time(now_local.time())),
                (None, Some(time)) => {
                    let current = now_local.naive_local();
                    let floor = current
                        .with_second(0)
                        .and_then(|t| t.with_nanosecond(0))
                        .unwrap_or(current);
                    let candidate = today.and_time(time);
                    if candidate >= floor {
                        self.localize(candidate)
                    } else {
                        self.localize(candidate + Duration::days(1))
                    }
                },
                (None, None) => return Err(error()),
            }
        };

        ensure_consumed(&rest).map_err(|()| error())?;
        debug!(phrase = %phrase, at = %at, mode = dep_or_arr.as_param(), "Resolved date/time phrase");
        Ok(ResolvedTime { at, dep_or_arr })
    }

    /// "in 20 minuten", "jetzt"
    fn take_relative_instant(
        &self,
        rest: &mut String,
        now: DateTime<Utc>,
    ) -> Option<DateTime<FixedOffset>> {
        if let Some(groups) = take(&RELATIVE_OFFSET_RE, rest) {
            let amount: i64 = groups[1]
                .as_deref()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let offset = match groups[2].as_deref() {
                Some(unit) if unit.starts_with("min") => Duration::minutes(amount),
                _ => Duration::hours(amount),
            };
            return Some(self.timezone.to_fixed(&(now + offset)));
        }
        take(&NOW_RE, rest).map(|_| self.timezone.to_fixed(&now))
    }

    /// Local wall-clock time to an instant; gaps shift forward, overlaps take the earlier
    fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        let tz = self.timezone.tz();
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.fixed_offset(),
            LocalResult::None => tz
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
                .fixed_offset(),
        }
    }
}

type Groups = Vec<Option<String>>;

/// Remove the first match from `text`, returning its capture groups
fn take(re: &Regex, text: &mut String) -> Option<Groups> {
    let caps = re.captures(text)?;
    let range = caps.get(0)?.range();
    let groups = caps
        .iter()
        .map(|m| m.map(|m| m.as_str().to_string()))
        .collect();
    text.replace_range(range, " ");
    Some(groups)
}

fn take_daypart(rest: &mut String) -> Option<Daypart> {
    if let Some(caps) = MORNING_AFTER_DAY_RE.captures(rest) {
        let range = caps.get(0)?.range();
        let day = caps.get(1).map_or("", |m| m.as_str()).to_string();
        rest.replace_range(range, &format!(" {day} "));
        return Some(Daypart::new(8));
    }
    let groups = take(&DAYPART_RE, rest)?;
    groups[1].as_deref().and_then(Daypart::from_word)
}

fn take_date(
    rest: &mut String,
    today: NaiveDate,
    language: Language,
    error: impl Fn() -> ApplicationError,
) -> Result<Option<NaiveDate>, ApplicationError> {
    if let Some(groups) = take(&DOTTED_DATE_RE, rest) {
        return day_month(&groups[1], &groups[2], &groups[3], today)
            .map(Some)
            .ok_or_else(error);
    }
    if let Some(groups) = take(&SLASH_DATE_RE, rest) {
        let first = parse_u32(&groups[1]);
        let second = parse_u32(&groups[2]);
        // English allows month-first when the day-first reading is impossible
        let month_first = language == Language::En && second > 12 && first <= 12;
        let (day, month) = if month_first {
            (&groups[2], &groups[1])
        } else {
            (&groups[1], &groups[2])
        };
        return day_month(day, month, &groups[3], today)
            .map(Some)
            .ok_or_else(error);
    }
    if take(&DAY_AFTER_TOMORROW_RE, rest).is_some() {
        return Ok(Some(today + Duration::days(2)));
    }
    if take(&TODAY_RE, rest).is_some() {
        return Ok(Some(today));
    }
    if take(&TOMORROW_RE, rest).is_some() {
        return Ok(Some(today + Duration::days(1)));
    }
    if take(&WEEKEND_RE, rest).is_some() {
        return Ok(Some(next_weekday(today, Weekday::Sat)));
    }
    if let Some(groups) = take(&WEEKDAY_RE, rest) {
        let weekday = groups[1].as_deref().and_then(weekday_from_name).ok_or_else(&error)?;
        return Ok(Some(next_weekday(today, weekday)));
    }
    Ok(None)
}

fn take_time(
    rest: &mut String,
    error: impl Fn() -> ApplicationError,
) -> Result<Option<NaiveTime>, ApplicationError> {
    if let Some(groups) = take(&TIME_COLON_RE, rest) {
        return hm_groups(&groups[1], &groups[2], &groups[3]).map(Some).ok_or_else(error);
    }
    if let Some(groups) = take(&TIME_SUFFIX_RE, rest) {
        let meridiem = groups[2].as_deref().filter(|s| *s == "am" || *s == "pm");
        let hour = groups[1].as_deref().unwrap_or_default();
        return hm(hour, "00", meridiem).map(Some).ok_or_else(error);
    }
    if let Some(groups) = take(&TIME_PREFIXED_RE, rest) {
        let hour = groups[1].as_deref().unwrap_or_default();
        return hm(hour, "00", None).map(Some).ok_or_else(error);
    }
    Ok(None)
}

fn hm_groups(
    hour: &Option<String>,
    minute: &Option<String>,
    meridiem: &Option<String>,
) -> Option<NaiveTime> {
    hm(hour.as_deref()?, minute.as_deref()?, meridiem.as_deref())
}

/// Hour/minute with optional am/pm
fn hm(hour: &str, minute: &str, meridiem: Option<&str>) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    let hour = match meridiem {
        Some(_) if !(1..=12).contains(&hour) => return None,
        Some("pm") if hour != 12 => hour + 12,
        Some("am") if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn ymd(year: &Option<String>, month: &Option<String>, day: &Option<String>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year.as_deref()?.parse().ok()?,
        month.as_deref()?.parse().ok()?,
        day.as_deref()?.parse().ok()?,
    )
}

/// Day and month, with the year inferred as the next occurrence when absent
fn day_month(
    day: &Option<String>,
    month: &Option<String>,
    year: &Option<String>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let day: u32 = day.as_deref()?.parse().ok()?;
    let month: u32 = month.as_deref()?.parse().ok()?;
    if let Some(year) = year.as_deref() {
        return NaiveDate::from_ymd_opt(year.parse().ok()?, month, day);
    }
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year >= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

fn parse_u32(value: &Option<String>) -> u32 {
    value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Next occurrence of `target` strictly after `from`
pub(crate) fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let current = i64::from(from.weekday().num_days_from_monday());
    let wanted = i64::from(target.num_days_from_monday());
    let mut days = (wanted - current).rem_euclid(7);
    if days == 0 {
        days = 7;
    }
    from + Duration::days(days)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let weekday = match name {
        "montag" | "monday" | "lunedì" | "lunedi" => Weekday::Mon,
        "dienstag" | "tuesday" | "martedì" | "martedi" => Weekday::Tue,
        "mittwoch" | "wednesday" | "mercoledì" | "mercoledi" => Weekday::Wed,
        "donnerstag" | "thursday" | "giovedì" | "giovedi" => Weekday::Thu,
        "freitag" | "friday" | "venerdì" | "venerdi" => Weekday::Fri,
        "samstag" | "saturday" | "sabato" => Weekday::Sat,
        "sonntag" | "sunday" | "domenica" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Anything other than connectives left over means the phrase was not understood
fn ensure_consumed(rest: &str) -> Result<(), ()> {
    let leftover = FILLER_RE.replace_all(rest, " ");
    if leftover.chars().any(char::is_alphanumeric) {
        Err(())
    } else {
        Ok(())
    }
}
