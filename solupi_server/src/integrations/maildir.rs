//! A [`Mailbox`] backed by a local Maildir.
//!
//! The server does not speak IMAP itself. An external sync tool (e.g. `mbsync` or `offlineimap`) mirrors the bank
//! notification inbox into a Maildir, and this module reads it:
//! * New messages are delivered into `new/`. They stay there, and are returned by every [`MaildirMailbox::poll_new`],
//!   until they are acknowledged. Acknowledging moves a message to `cur/` with the "seen" flag.
//! * Messages that cannot be parsed at all are moved to `cur/` straight away, so that they are not retried forever.
//! * [`MaildirMailbox::backfill`] additionally re-reads recent messages from `cur/`. Ingestion is idempotent, so
//!   handing the engine a notification it has already seen is harmless.
//!
//! MIME decoding is done by `mailparse`. HTML-only messages are reduced to plain text.
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use log::*;
use mailparse::{MailHeaderMap, ParsedMail};
use once_cell::sync::Lazy;
use regex::Regex;
use solupi_engine::traits::{Mailbox, MailboxError, RawMessage};
use tokio::fs;

const SEEN_SUFFIX: &str = ":2,S";

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<\s*(br|/p|/div|/tr|/li|/h\d)\s*/?>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<(style|script)[^>]*>.*?</(style|script)>").unwrap());

#[derive(Debug, Clone)]
pub struct MaildirMailbox {
    root: PathBuf,
    /// Messages in `new/` that have been handed out but not acknowledged yet, by id
    pending: HashMap<String, PathBuf>,
}

impl MaildirMailbox {
    /// Opens the Maildir at `root`, creating the `new`, `cur` and `tmp` folders if they do not exist.
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, MailboxError> {
        let root = root.as_ref().to_path_buf();
        for sub in ["new", "cur", "tmp"] {
            fs::create_dir_all(root.join(sub)).await.map_err(|e| io_error(&root.join(sub), e))?;
        }
        debug!("📧️ Maildir opened at {}", root.display());
        Ok(Self { root, pending: HashMap::new() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads every message in `dir` whose file was modified at or after `since`.
    async fn read_folder(&self, dir: &str, since: Option<DateTime<Utc>>) -> Result<Vec<MaildirEntry>, MailboxError> {
        let path = self.root.join(dir);
        let mut entries = fs::read_dir(&path).await.map_err(|e| io_error(&path, e))?;
        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&path, e))? {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!("📧️ Could not read metadata for {}. {e}", entry.path().display());
                    continue;
                },
            };
            let modified = metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| SystemTime::now().into());
            if since.map(|s| modified < s).unwrap_or(false) {
                continue;
            }
            result.push(MaildirEntry { path: entry.path(), modified });
        }
        result.sort_by_key(|e| e.modified);
        Ok(result)
    }

    async fn load(&self, entry: &MaildirEntry) -> Result<RawMessage, MailboxError> {
        let bytes = fs::read(&entry.path).await.map_err(|e| io_error(&entry.path, e))?;
        parse_message(&message_id(&entry.path), &bytes, entry.modified)
    }

    /// Moves a message from `new/` to `cur/`, marking it as seen.
    async fn mark_seen(&self, path: &Path) -> Result<(), MailboxError> {
        let target = self.root.join("cur").join(format!("{}{SEEN_SUFFIX}", message_id(path)));
        match fs::rename(path, &target).await {
            Ok(()) => Ok(()),
            // Another reader got there first
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, e)),
        }
    }

    /// Loads the messages, skipping (and logging) the ones that cannot be parsed. Unparseable messages from `new/` are
    /// marked as seen straight away. The others are tracked until they are acknowledged.
    async fn collect(&mut self, entries: Vec<MaildirEntry>, from_new: bool) -> Result<Vec<RawMessage>, MailboxError> {
        let mut messages = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.load(&entry).await {
                Ok(msg) => {
                    if from_new {
                        self.pending.insert(msg.id.clone(), entry.path.clone());
                    }
                    messages.push(msg);
                },
                Err(e) => {
                    warn!("📧️ Skipping unreadable message. {e}");
                    if from_new {
                        self.mark_seen(&entry.path).await?;
                    }
                },
            }
        }
        Ok(messages)
    }
}

impl Mailbox for MaildirMailbox {
    async fn backfill(&mut self, since: DateTime<Utc>) -> Result<Vec<RawMessage>, MailboxError> {
        let cur = self.read_folder("cur", Some(since)).await?;
        let new = self.read_folder("new", Some(since)).await?;
        let mut messages = self.collect(cur, false).await?;
        messages.extend(self.collect(new, true).await?);
        messages.sort_by_key(|m| m.received_at);
        debug!("📧️ Backfill found {} messages since {since}", messages.len());
        Ok(messages)
    }

    async fn poll_new(&mut self) -> Result<Vec<RawMessage>, MailboxError> {
        let new = self.read_folder("new", None).await?;
        if !new.is_empty() {
            trace!("📧️ {} unacknowledged messages in the maildir", new.len());
        }
        self.collect(new, true).await
    }

    async fn acknowledge(&mut self, id: &str) -> Result<(), MailboxError> {
        match self.pending.remove(id) {
            Some(path) => {
                self.mark_seen(&path).await?;
                trace!("📧️ Message {id} acknowledged");
                Ok(())
            },
            None => {
                trace!("📧️ Message {id} is not pending. Nothing to acknowledge");
                Ok(())
            },
        }
    }
}

#[derive(Debug, Clone)]
struct MaildirEntry {
    path: PathBuf,
    modified: DateTime<Utc>,
}

/// The unique part of a maildir file name, i.e. without the `:2,<flags>` info section.
fn message_id(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    match name.split_once(':') {
        Some((id, _)) => id.to_string(),
        None => name,
    }
}

fn io_error(path: &Path, e: std::io::Error) -> MailboxError {
    MailboxError::Io(format!("{}: {e}", path.display()))
}

//----------------------------------------------   Message parsing  --------------------------------------------------

/// Parses a raw RFC 5322 message. If the message has no parseable `Date` header, `fallback_time` is used.
pub fn parse_message(id: &str, raw: &[u8], fallback_time: DateTime<Utc>) -> Result<RawMessage, MailboxError> {
    let malformed = |reason: String| MailboxError::MalformedMessage { id: id.to_string(), reason };
    let mail = mailparse::parse_mail(raw).map_err(|e| malformed(e.to_string()))?;
    let from = mail.headers.get_first_value("From");
    let subject = mail.headers.get_first_value("Subject");
    if from.is_none() && subject.is_none() {
        return Err(malformed("No From or Subject header".into()));
    }
    let received_at = mail
        .headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or(fallback_time);
    let body = extract_text(&mail).ok_or_else(|| malformed("No text body".into()))?;
    Ok(RawMessage {
        id: id.to_string(),
        from: from.unwrap_or_default(),
        subject: subject.unwrap_or_default(),
        body,
        received_at,
    })
}

/// Recovers the readable text of a message body. `text/plain` is preferred over `text/html`.
fn extract_text(part: &ParsedMail<'_>) -> Option<String> {
    let mimetype = part.ctype.mimetype.to_ascii_lowercase();
    if mimetype.starts_with("multipart/") {
        let mut html = None;
        for sub in &part.subparts {
            let sub_type = sub.ctype.mimetype.to_ascii_lowercase();
            if sub_type == "text/plain" || sub_type.starts_with("multipart/") {
                if let Some(text) = extract_text(sub) {
                    return Some(text);
                }
            } else if sub_type == "text/html" && html.is_none() {
                html = extract_text(sub);
            }
        }
        return html;
    }
    let body = part
        .get_body()
        .map_err(|e| debug!("📧️ Could not decode a {mimetype} part. {e}"))
        .ok()?;
    match mimetype.as_str() {
        "text/html" => Some(html_to_text(&body)),
        m if m.starts_with("text/") => Some(body),
        _ => None,
    }
}

fn html_to_text(html: &str) -> String {
    let text = STYLE_BLOCK.replace_all(html, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&#8377;", "₹")
        .replace("&#x20B9;", "₹")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join("\n")
}
