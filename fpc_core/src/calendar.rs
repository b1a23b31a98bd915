//! This module renders presale events as an iCalendar document.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_param, ical_property,
    parser::ical::component::IcalAlarm,
};
use regex::Regex;

use crate::presale::PresaleEvent;

static PROD_ID: &str = "-//FC St. Pauli Presale Calendar//fcsp-presale-extractor//DE";
static CALENDAR_NAME: &str = "FC St. Pauli Ticketvorverkauf";
static CALENDAR_DESCRIPTION: &str =
    "Vorverkaufstermine für Vereinsmitglieder (Heimspiele Bundesliga & DFB-Pokal)";
static UID_DOMAIN: &str = "fcstpauli.com";
static DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";
static MORNING_REMINDER: (u32, u32) = (9, 0);
static REMINDER_MINUTES_BEFORE: i64 = 15;
static MAX_LINE_OCTETS: usize = 75;

/// Settings which are the same for every event of a calendar.
#[derive(Debug, Clone, Copy)]
pub struct CalendarSettings {
    /// The zone the presale times are given in.
    pub timezone: Tz,
    /// Written as `DTSTAMP`, keep it fixed for reproducible output.
    pub stamp: DateTime<Utc>,
}

impl CalendarSettings {
    pub fn now(timezone: Tz) -> Self {
        Self {
            timezone,
            stamp: Utc::now(),
        }
    }
}

/// Build the calendar with one event per presale, in the given order.
///
/// There is no deduplication, the same presale given twice results in two events.
pub fn build_calendar(events: &[PresaleEvent], settings: &CalendarSettings) -> IcalCalendar {
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    calendar.properties.extend([
        ical_property!("METHOD", "PUBLISH"),
        ical_property!("X-WR-CALNAME", escape_text(CALENDAR_NAME)),
        ical_property!("X-WR-CALDESC", escape_text(CALENDAR_DESCRIPTION)),
        ical_property!("X-WR-TIMEZONE", settings.timezone.name()),
    ]);
    for event in events {
        calendar.events.push(get_event(event, settings));
    }
    calendar
}

/// Build a single event including its reminders.
fn get_event(event: &PresaleEvent, settings: &CalendarSettings) -> IcalEvent {
    let opponent = event.opponent.to_string();
    let timezone = settings.timezone.name();
    let end = event.start + Duration::hours(1);
    let description = format!(
        "Vorverkauf für Vereinsmitglieder\n\
        Spiel: FC St. Pauli vs. {opponent}\n\
        Wettbewerb: {}\n\
        Vorverkaufsstart: {}\n\n\
        Weitere Informationen:\n{}",
        event.competition,
        event.start.format("%d.%m.%Y um %H:%M Uhr"),
        event.link,
    );
    let mut ical_event = IcalEvent::new();
    ical_event.properties = vec![
        ical_property!("UID", uid(&event.start, &opponent)),
        ical_property!("DTSTAMP", settings.stamp.format("%Y%m%dT%H%M%SZ").to_string()),
        ical_property!(
            "DTSTART",
            event.start.format(DATETIME_FORMAT).to_string(),
            ical_param!("TZID", timezone)
        ),
        ical_property!(
            "DTEND",
            end.format(DATETIME_FORMAT).to_string(),
            ical_param!("TZID", timezone)
        ),
        ical_property!(
            "SUMMARY",
            escape_text(&format!(
                "Ticketvorverkauf: {opponent} ({})",
                event.competition
            ))
        ),
        ical_property!("DESCRIPTION", escape_text(&description)),
        ical_property!("URL", event.link.as_str()),
    ];
    if let Some(before) = morning_offset(&event.start) {
        ical_event.alarms.push(get_alarm(
            &format!("Heute: Ticketvorverkauf {opponent}"),
            before,
        ));
    }
    ical_event.alarms.push(get_alarm(
        &format!("In {REMINDER_MINUTES_BEFORE} Minuten: Ticketvorverkauf {opponent}"),
        Duration::minutes(REMINDER_MINUTES_BEFORE),
    ));
    ical_event
}

fn get_alarm(description: &str, before: Duration) -> IcalAlarm {
    let mut alarm = IcalAlarm::new();
    alarm.properties = vec![
        ical_property!("ACTION", "DISPLAY"),
        ical_property!("DESCRIPTION", escape_text(description)),
        ical_property!("TRIGGER", trigger(before)),
    ];
    alarm
}

/// Time between the morning reminder and the presale, if the presale starts after it.
fn morning_offset(start: &NaiveDateTime) -> Option<Duration> {
    let (hour, minute) = MORNING_REMINDER;
    let morning = start.date().and_time(NaiveTime::from_hms_opt(hour, minute, 0)?);
    (morning < *start).then(|| *start - morning)
}

/// Format a reminder offset as a negative iCalendar duration, like `-PT6H30M`.
fn trigger(before: Duration) -> String {
    let hours = before.num_hours();
    let minutes = before.num_minutes() % 60;
    match (hours, minutes) {
        (0, minutes) => format!("-PT{minutes}M"),
        (hours, 0) => format!("-PT{hours}H"),
        (hours, minutes) => format!("-PT{hours}H{minutes}M"),
    }
}

/// Render a calendar as iCalendar text.
///
/// Lines are folded after at most 75 octets, never inside a character.
pub fn generate(calendar: &IcalCalendar) -> String {
    let mut ics = String::new();
    push_component(&mut ics, "VCALENDAR", &calendar.properties, |ics| {
        for event in &calendar.events {
            push_component(ics, "VEVENT", &event.properties, |ics| {
                for alarm in &event.alarms {
                    push_component(ics, "VALARM", &alarm.properties, |_| {});
                }
            });
        }
    });
    ics
}

fn push_component(
    ics: &mut String,
    name: &str,
    properties: &[Property],
    children: impl FnOnce(&mut String),
) {
    push_line(ics, &format!("BEGIN:{name}"));
    for property in properties {
        push_line(ics, &content_line(property));
    }
    children(ics);
    push_line(ics, &format!("END:{name}"));
}

fn content_line(property: &Property) -> String {
    let mut line = property.name.clone();
    for (name, values) in property.params.iter().flatten() {
        let values: Vec<String> = values.iter().map(|value| quote_param(value)).collect();
        line.push_str(&format!(";{name}={}", values.join(",")));
    }
    line.push(':');
    line.push_str(property.value.as_deref().unwrap_or_default());
    line
}

fn quote_param(value: &str) -> String {
    if value.contains([':', ';', ',']) {
        format!("\"{value}\"")
    } else {
        String::from(value)
    }
}

/// Append a content line, continuation lines start with a single space.
fn push_line(ics: &mut String, line: &str) {
    let mut width = 0;
    for character in line.chars() {
        let octets = character.len_utf8();
        if width + octets > MAX_LINE_OCTETS {
            ics.push_str("\r\n ");
            width = 1;
        }
        ics.push(character);
        width += octets;
    }
    ics.push_str("\r\n");
}

/// Escape a value of type TEXT.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

/// Get a unique id for the presale of a specific game.
///
/// Changing this function is a breaking change!
fn uid(start: &NaiveDateTime, opponent: &str) -> String {
    let whitespace_regex = Regex::new(r"\s+").unwrap();
    let opponent = whitespace_regex.replace_all(opponent, "-");
    format!("{}-{opponent}@{UID_DOMAIN}", start.format("%Y%m%d%H%M"))
}
