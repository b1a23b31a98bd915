//! This crate turns FC St. Pauli's news feed into an iCalendar file of members' ticket presales.
//!
//! The feed is read from <https://www.fcstpauli.com/rss.xml>. Only home games of the Bundesliga and
//! the DFB-Pokal are taken into account.

pub use chrono_tz;
pub use ical;

pub mod calendar;
pub mod feed_client;
pub mod presale;
pub mod presale_client;
