//! This client turns the club's feed into a presale calendar.

use std::fmt::{Display, Formatter};

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use ical::generator::IcalCalendar;
use tracing::{info, warn};

use crate::{
    calendar::{build_calendar, CalendarSettings},
    feed_client::{self, FeedItem, FeedSource},
    presale::{extract_presale_event, extract_presale_events, is_ticket_announcement, PresaleEvent},
};

/// Get the presale calendar from a feed.
pub async fn get(source: &FeedSource, timezone: Tz) -> Result<IcalCalendar> {
    let items = feed_client::fetch(source)
        .await
        .with_context(|| format!("failed to read feed from {source}"))?;
    let events = extract_presale_events(&items, timezone, today(timezone));
    for event in &events {
        info!("Found presale: {} on {}", event.opponent, event.start);
    }
    if events.is_empty() {
        warn!("No presale events found in RSS feed");
    }
    let calendar = build_calendar(&events, &CalendarSettings::now(timezone));
    info!("Generated calendar with {} events", calendar.events.len());
    Ok(calendar)
}

/// Get a report of how well the ticket announcements of a feed are parsed.
pub async fn check(source: &FeedSource, timezone: Tz) -> Result<CheckReport> {
    let items = feed_client::fetch(source)
        .await
        .with_context(|| format!("failed to read feed from {source}"))?;
    Ok(CheckReport::new(&items, timezone, today(timezone)))
}

fn today(timezone: Tz) -> chrono::NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

/// The outcome of parsing every ticket announcement of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub total_entries: usize,
    /// Sorted by presale start.
    pub parsed: Vec<PresaleEvent>,
    /// Ticket announcements without a presale, like away or test games.
    pub unparsed: Vec<FeedItem>,
}

impl CheckReport {
    pub fn new(items: &[FeedItem], timezone: Tz, today: chrono::NaiveDate) -> Self {
        let mut parsed = vec![];
        let mut unparsed = vec![];
        for item in items.iter().filter(|item| is_ticket_announcement(&item.title)) {
            match extract_presale_event(item, timezone, today) {
                Some(event) => parsed.push(event),
                None => unparsed.push(item.clone()),
            }
        }
        parsed.sort_by_key(|event| event.start);
        Self {
            total_entries: items.len(),
            parsed,
            unparsed,
        }
    }

    pub fn ticket_entries(&self) -> usize {
        self.parsed.len() + self.unparsed.len()
    }
}

impl Display for CheckReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rule = "=".repeat(80);
        let thin_rule = "-".repeat(80);
        writeln!(f, "SUMMARY")?;
        writeln!(f, "{thin_rule}")?;
        writeln!(f, "Total entries in feed: {}", self.total_entries)?;
        writeln!(f, "Ticket-Infos entries: {}", self.ticket_entries())?;
        writeln!(f, "Successfully parsed presales: {}", self.parsed.len())?;
        writeln!(f, "Unparsed Ticket-Infos: {}", self.unparsed.len())?;
        writeln!(f)?;
        if self.parsed.is_empty() {
            writeln!(f, "NO PRESALES PARSED")?;
            writeln!(f, "{thin_rule}")?;
            writeln!(f)?;
        } else {
            writeln!(f, "SUCCESSFULLY PARSED PRESALES")?;
            writeln!(f, "{rule}")?;
            writeln!(f)?;
            for (index, event) in self.parsed.iter().enumerate() {
                writeln!(f, "{}. {} ({})", index + 1, event.opponent, event.competition)?;
                writeln!(f, "   Presale: {}", event.start.format("%d.%m.%Y %H:%M Uhr"))?;
                writeln!(f, "   Title: {}", event.title)?;
                writeln!(f, "   Link: {}", event.link)?;
                writeln!(f)?;
            }
        }
        if !self.unparsed.is_empty() {
            writeln!(f, "UNPARSED TICKET-INFOS (FOR MANUAL REVIEW)")?;
            writeln!(f, "{thin_rule}")?;
            for item in &self.unparsed {
                writeln!(f, "  • {}", item.title)?;
                writeln!(f, "    Link: {}", item.link)?;
                writeln!(f)?;
            }
        }
        write!(f, "{rule}")
    }
}
