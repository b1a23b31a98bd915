//! This module extracts presale events from the club's ticket announcements.
//!
//! Only titles and descriptions are looked at, the announcements follow a loose German wording
//! like "Ticket-Infos zum Heimspiel gegen den 1. FC Union Berlin" and
//! "Ab Donnerstag (23.10., 15 Uhr) können Vereinsmitglieder Tickets erwerben".

use std::{
    fmt::{Display, Formatter},
    sync::OnceLock,
};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use regex::Regex;
use scraper::Html;
use tracing::{debug, warn};

use crate::feed_client::FeedItem;

static TICKET_MARKER: &str = "Ticket-Infos";
static AWAY_MARKERS: [&str; 2] = ["auswärtsspiel", "beim"];
static DERBY_MARKER: &str = "derby";
static DERBY_OPPONENT: &str = "Hamburger SV";
static UNKNOWN_OPPONENT: &str = "Gegner unbekannt";

/// The competitions a home game can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Competition {
    Bundesliga,
    DfbPokal,
}

impl Display for Competition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Competition::Bundesliga => write!(f, "Bundesliga"),
            Competition::DfbPokal => write!(f, "DFB-Pokal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opponent {
    Named(String),
    /// The title names no opponent we can recognize.
    Unknown,
}

impl Display for Opponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Opponent::Named(name) => write!(f, "{name}"),
            Opponent::Unknown => write!(f, "{UNKNOWN_OPPONENT}"),
        }
    }
}

/// The start of a members' presale for a single home game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresaleEvent {
    pub opponent: Opponent,
    pub competition: Competition,
    /// Local civil time in the calendar's time zone.
    pub start: NaiveDateTime,
    pub link: String,
    pub title: String,
}

/// Check whether a title announces tickets for a home game.
pub fn is_home_game_ticket(title: &str) -> bool {
    if !is_ticket_announcement(title) {
        return false;
    }
    let title = title.to_lowercase();
    !AWAY_MARKERS.iter().any(|marker| title.contains(marker))
}

/// Extract the opponent from a title.
///
/// Derby titles never name the opponent, it is always the Hamburger SV.
pub fn extract_opponent(title: &str) -> Opponent {
    if title.to_lowercase().contains(DERBY_MARKER) {
        return Opponent::Named(String::from(DERBY_OPPONENT));
    }
    opponent_regex()
        .captures(title)
        .and_then(|captures| captures.name("opponent"))
        .map(|opponent| opponent.as_str().trim())
        .filter(|opponent| !opponent.is_empty())
        .map_or(Opponent::Unknown, |opponent| {
            Opponent::Named(String::from(opponent))
        })
}

/// Extract the competition from a title.
pub fn extract_competition(title: &str) -> Competition {
    if title.to_lowercase().contains("pokal") {
        Competition::DfbPokal
    } else {
        Competition::Bundesliga
    }
}

/// Extract the start of the members' presale from an HTML description.
///
/// The year is not part of the announcement. The presale is placed in the year of `reference`
/// unless it would lie before `reference`, then it is placed in the following year.
pub fn extract_presale_datetime(
    description: &str,
    reference: NaiveDate,
) -> Option<NaiveDateTime> {
    let text = plain_text(description);
    let Some(captures) = presale_regex().captures(&text) else {
        debug!(
            "No presale pattern in description: {}",
            text.chars().take(200).collect::<String>()
        );
        return None;
    };
    let day: u32 = captures["day"].parse().ok()?;
    let month: u32 = captures["month"].parse().ok()?;
    let hour: u32 = captures["hour"].parse().ok()?;
    let minute: u32 = match captures.name("minute") {
        Some(minute) => minute.as_str().parse().ok()?,
        None => 0,
    };
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let date = infer_date(day, month, reference)?;
    Some(date.and_time(time))
}

/// Extract the presale event of a single feed item.
///
/// `today` is the fallback reference date for items without a publication date.
pub fn extract_presale_event(
    item: &FeedItem,
    timezone: Tz,
    today: NaiveDate,
) -> Option<PresaleEvent> {
    if !is_home_game_ticket(&item.title) {
        if is_ticket_announcement(&item.title) {
            debug!("Skipping away game: {}", item.title);
        }
        return None;
    }
    debug!("Found ticket announcement: {}", item.title);
    // presale dates are local, so compare them with the local publication date
    let reference = match item.published {
        Some(published) => published.with_timezone(&timezone).date_naive(),
        None => {
            warn!("No publication date for {}, using {today}", item.title);
            today
        }
    };
    let Some(start) = extract_presale_datetime(&item.description, reference) else {
        debug!("No presale date found for {}", item.title);
        return None;
    };
    Some(PresaleEvent {
        opponent: extract_opponent(&item.title),
        competition: extract_competition(&item.title),
        start,
        link: item.link.clone(),
        title: item.title.clone(),
    })
}

/// Extract all presale events of a feed, keeping the feed order.
pub fn extract_presale_events(
    items: &[FeedItem],
    timezone: Tz,
    today: NaiveDate,
) -> Vec<PresaleEvent> {
    items
        .iter()
        .filter_map(|item| extract_presale_event(item, timezone, today))
        .collect()
}

pub(crate) fn is_ticket_announcement(title: &str) -> bool {
    title.contains(TICKET_MARKER)
}

fn infer_date(day: u32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    match NaiveDate::from_ymd_opt(reference.year(), month, day) {
        Some(date) if date >= reference => Some(date),
        _ => NaiveDate::from_ymd_opt(reference.year() + 1, month, day),
    }
}

/// Strip the tags and decode the entities of an HTML fragment.
fn plain_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

fn opponent_regex() -> &'static Regex {
    static OPPONENT_REGEX: OnceLock<Regex> = OnceLock::new();
    OPPONENT_REGEX.get_or_init(|| {
        Regex::new(
            r"(?ix)
                \bgegen\s+
                (?:(?:den|die|das|der|dem)\s+)? # a leading article, only as a whole word
                (?P<opponent>.+?)
                (?:\s*\d{4})? # the season code, like 2526
                \s*$
            ",
        )
        .unwrap()
    })
}

fn presale_regex() -> &'static Regex {
    static PRESALE_REGEX: OnceLock<Regex> = OnceLock::new();
    PRESALE_REGEX.get_or_init(|| {
        Regex::new(
            r"(?isx)
                \(
                (?P<day>\d{1,2})\.
                (?P<month>\d{1,2})\.
                ,?\s+
                (?:ab\s+)?
                (?P<hour>\d{1,2})
                (?::(?P<minute>\d{2}))?
                \s+Uhr\)
                [^(]* # no other parenthesis until the anchor
                können\s+Vereinsmitglieder
            ",
        )
        .unwrap()
    })
}
