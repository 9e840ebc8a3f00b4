use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Timezone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for Timezone {
    fn default() -> Self {
        Timezone::Fixed(Utc.fix())
    }
}

impl Timezone {
    /// Accepts IANA names (`Europe/London`), `UTC`/`GMT`, and offsets such as
    /// `UTC+02:00` or `GMT-0330`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let upper = trimmed.to_ascii_uppercase();
        match upper.as_str() {
            "" => None,
            "UTC" | "GMT" | "Z" => Some(Timezone::default()),
            _ => match upper.strip_prefix("UTC").or_else(|| upper.strip_prefix("GMT")) {
                Some(offset) => offset_from_str(offset).map(Timezone::Fixed),
                None => trimmed.parse::<Tz>().ok().map(Timezone::Named),
            },
        }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Timezone::Named(tz) => instant.with_timezone(tz).date_naive(),
            Timezone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    /// Local midnight of `date` as a UTC instant. Where a DST transition
    /// swallows midnight the first valid instant of that day is used.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_hms_opt(0, 0, 0).unwrap_or(NaiveDateTime::MIN);
        match self {
            Timezone::Named(tz) => resolve_local(tz, naive),
            Timezone::Fixed(offset) => resolve_local(offset, naive),
        }
    }
}

/// Signed `HH`, `HHMM` or `HH:MM`, at most 14 hours either way.
fn offset_from_str(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, body) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else {
        (-1, raw.strip_prefix('-')?)
    };
    let digits: String = body.trim().chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        n => (
            digits[..n - 2].parse::<i32>().ok()?,
            digits[n - 2..].parse::<i32>().ok()?,
        ),
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn resolve_local<T: TimeZone>(tz: &T, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Gap: walk forward until the wall clock exists again.
            let mut probe = naive;
            for _ in 0..4 {
                probe += Duration::minutes(30);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            Utc.from_utc_datetime(&naive)
        }
    }
}

/// Monday of the Mon-Sun week containing `date`. Sunday maps back six days.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Week and day boundaries in the deployment's timezone.
#[derive(Clone, Copy, Debug, Default)]
pub struct WeekCalendar {
    tz: Timezone,
}

impl WeekCalendar {
    pub fn new(tz: Timezone) -> Self {
        Self { tz }
    }

    pub fn week_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.tz.local_midnight(monday_of(self.tz.local_date(instant)))
    }

    /// Sunday 23:59:59.999 of the week starting at `week_start`.
    pub fn week_end(&self, week_start: DateTime<Utc>) -> DateTime<Utc> {
        let next_monday = self.tz.local_date(week_start) + Duration::days(7);
        self.tz.local_midnight(next_monday) - Duration::milliseconds(1)
    }

    pub fn day_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.tz.local_midnight(self.tz.local_date(instant))
    }

    /// Monday of the week before the one containing `instant`.
    pub fn previous_week_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let monday = monday_of(self.tz.local_date(instant));
        self.tz.local_midnight(monday - Duration::days(7))
    }
}
