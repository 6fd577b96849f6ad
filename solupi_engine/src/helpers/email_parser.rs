//! Extraction of payment facts from the bank's UPI credit notifications.
//!
//! A typical notification body looks like this:
//!
//! ```text
//! Hi Naveen,
//! You have received ₹1 via UPI in your slice bank account xx6712!
//! Transaction date	01-Dec-25
//! From	Kavya Sarsawat
//! RRN	570196198030
//! ```
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::*;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db_types::{Paise, PaymentFact, ReferenceCode};

/// Explicit timestamps in notifications are local Indian time (UTC+05:30).
pub const BANK_TIMEZONE_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bRRN[:\s]+(\d{12})\b").unwrap());
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\breceived\s+(?:₹|Rs\.?|INR)?\s*(\d[\d,]*(?:\.\d{1,2})?)").unwrap());
static SENDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bFrom[ \t]+([A-Za-z][A-Za-z \t]*?)[ \t]*(?:\r|\n|\bRRN\b|$)").unwrap());
static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:Date|Sent):\s*(\d{4}-\d{2}-\d{2})\s+(\d{2}:\d{2}:\d{2})").unwrap());

/// Extracts a payment fact from a notification body, using the current time when the body carries no timestamp.
pub fn extract_payment_fact(body: &str) -> Option<PaymentFact> {
    extract_payment_fact_at(body, Utc::now())
}

/// Extracts a payment fact from a notification body.
///
/// Returns `None` only if none of reference code, amount or sender could be found. Otherwise the fact is returned
/// with whatever fields were recognised; `received_at` is used if the body has no explicit timestamp.
pub fn extract_payment_fact_at(body: &str, received_at: DateTime<Utc>) -> Option<PaymentFact> {
    let reference_code =
        REFERENCE.captures(body).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse::<ReferenceCode>().ok());
    let amount = AMOUNT.captures(body).and_then(|c| c.get(1)).and_then(|m| match m.as_str().parse::<Paise>() {
        Ok(a) => Some(a),
        Err(e) => {
            debug!("📧️ Ignoring unparseable amount in notification. {e}");
            None
        },
    });
    let sender = SENDER
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty());
    if reference_code.is_none() && amount.is_none() && sender.is_none() {
        return None;
    }
    let observed_at = extract_timestamp(body).unwrap_or(received_at);
    Some(PaymentFact { reference_code, amount, sender, observed_at })
}

fn extract_timestamp(body: &str) -> Option<DateTime<Utc>> {
    let captures = TIMESTAMP.captures(body)?;
    let text = format!("{} {}", captures.get(1)?.as_str(), captures.get(2)?.as_str());
    let naive = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S").ok()?;
    let offset = FixedOffset::east_opt(BANK_TIMEZONE_OFFSET_SECS)?;
    offset.from_local_datetime(&naive).single().map(|t| t.with_timezone(&Utc))
}
