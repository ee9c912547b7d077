//! Atom feed parsing for arXiv API responses.
//!
//! Each `<entry>` becomes a [`Record`]: the abs-URL `<id>` is split into the
//! bare id and its version, `<updated>` becomes the record time, and the
//! remaining fields land in the payload under these keys:
//!
//! | key                | source                                  |
//! |--------------------|-----------------------------------------|
//! | `version`          | `vN` suffix of `<id>` (absent if none)  |
//! | `title`            | `<title>`, whitespace collapsed         |
//! | `summary`          | `<summary>`, trimmed                    |
//! | `authors`          | `[{ "name": … }]`                       |
//! | `tags`             | `[{ "term": … }]` from `<category>`     |
//! | `primary_category` | `<arxiv:primary_category term=…>`       |
//! | `published`        | `<published>`                           |
//! | `links`            | `[{ "href", "rel", "type", "title" }]`  |
//! | `time_str`         | `updated` as `%b %d %Y`                 |
//! | `comment`, `journal_ref`, `doi` | matching `arxiv:` elements, if present |

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{json, Map, Value};

use arxsync_core::{Page, Record, RecordId, SourceError};

/// Parse a complete Atom response body into a [`Page`].
pub fn parse_feed(xml: &str) -> Result<Page, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut records = Vec::new();
    let mut total_results = None;
    let mut saw_feed = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "feed" => saw_feed = true,
                    "entry" => entry = Some(EntryBuilder::default()),
                    _ => {
                        if let Some(builder) = entry.as_mut() {
                            builder.element(&name, &e)?;
                        }
                    }
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                if let Some(builder) = entry.as_mut() {
                    builder.element(&local_name(&e), &e)?;
                }
            }
            Ok(Event::End(_)) => {
                if stack.pop().as_deref() == Some("entry") {
                    if let Some(builder) = entry.take() {
                        records.push(builder.build()?);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| SourceError::Parse(format!("invalid text: {e}")))?;
                on_text(&stack, entry.as_mut(), &mut total_results, &text)?;
            }
            Ok(Event::CData(c)) => {
                let bytes = c.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                on_text(&stack, entry.as_mut(), &mut total_results, &text)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "xml parse error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    if !saw_feed {
        return Err(SourceError::Parse("response is not an Atom feed".to_string()));
    }
    if !stack.is_empty() {
        return Err(SourceError::Parse(format!(
            "truncated feed: <{}> never closed",
            stack.join("><")
        )));
    }

    Ok(Page {
        records,
        total_results,
    })
}

/// Split `http://arxiv.org/abs/2101.00001v2` into (`2101.00001`, `Some(2)`).
pub fn split_id(raw: &str) -> (String, Option<u32>) {
    let raw = raw.trim();
    let tail = raw.split_once("/abs/").map_or(raw, |(_, tail)| tail);
    match tail.rsplit_once('v') {
        Some((id, version)) if !id.is_empty() && !version.is_empty() => {
            match version.parse::<u32>() {
                Ok(v) if version.bytes().all(|b| b.is_ascii_digit()) => (id.to_string(), Some(v)),
                _ => (tail.to_string(), None),
            }
        }
        _ => (tail.to_string(), None),
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn on_text(
    stack: &[String],
    entry: Option<&mut EntryBuilder>,
    total_results: &mut Option<u64>,
    text: &str,
) -> Result<(), SourceError> {
    let Some(current) = stack.last().map(String::as_str) else {
        return Ok(());
    };
    let parent = stack
        .len()
        .checked_sub(2)
        .and_then(|i| stack.get(i))
        .map(String::as_str);

    if let Some(builder) = entry {
        builder.text(parent, current, text);
        return Ok(());
    }

    if parent == Some("feed") && current == "totalResults" {
        let total = text
            .trim()
            .parse::<u64>()
            .map_err(|_| SourceError::Parse(format!("invalid totalResults '{text}'")))?;
        *total_results = Some(total);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry accumulation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EntryBuilder {
    raw_id: Option<String>,
    updated: Option<String>,
    published: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    comment: Option<String>,
    journal_ref: Option<String>,
    doi: Option<String>,
    authors: Vec<String>,
    tags: Vec<String>,
    primary_category: Option<String>,
    links: Vec<Value>,
}

impl EntryBuilder {
    /// Attribute-carrying elements (`<category>`, `<link>`, …).
    fn element(&mut self, name: &str, e: &BytesStart<'_>) -> Result<(), SourceError> {
        match name {
            "category" => {
                if let Some(term) = attr(e, "term")? {
                    self.tags.push(term);
                }
            }
            "primary_category" => self.primary_category = attr(e, "term")?,
            "link" => {
                let mut link = Map::new();
                for key in ["href", "rel", "type", "title"] {
                    if let Some(value) = attr(e, key)? {
                        link.insert(key.to_string(), Value::String(value));
                    }
                }
                if !link.is_empty() {
                    self.links.push(Value::Object(link));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, parent: Option<&str>, current: &str, text: &str) {
        let slot = match (parent, current) {
            (Some("entry"), "id") => &mut self.raw_id,
            (Some("entry"), "updated") => &mut self.updated,
            (Some("entry"), "published") => &mut self.published,
            (Some("entry"), "title") => &mut self.title,
            (Some("entry"), "summary") => &mut self.summary,
            (Some("entry"), "comment") => &mut self.comment,
            (Some("entry"), "journal_ref") => &mut self.journal_ref,
            (Some("entry"), "doi") => &mut self.doi,
            (Some("author"), "name") => {
                self.authors.push(text.trim().to_string());
                return;
            }
            _ => return,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn build(self) -> Result<Record, SourceError> {
        let raw_id = self
            .raw_id
            .ok_or_else(|| SourceError::Parse("entry without <id>".to_string()))?;

        // The API reports query errors as a single pseudo-entry.
        if raw_id.contains("/api/errors") {
            let reason = self.summary.or(self.title).unwrap_or_default();
            return Err(SourceError::Parse(format!("arXiv API error: {}", reason.trim())));
        }

        let (id, version) = split_id(&raw_id);
        let updated = self
            .updated
            .ok_or_else(|| SourceError::Parse(format!("entry {id} without <updated>")))?;
        let time = parse_time(&updated)
            .ok_or_else(|| SourceError::Parse(format!("entry {id} has bad <updated> '{updated}'")))?;

        let mut record = Record::new(RecordId::from(id), time);
        let payload = &mut record.payload;
        if let Some(v) = version {
            payload.insert("version".into(), json!(v));
        }
        payload.insert(
            "title".into(),
            json!(collapse_whitespace(self.title.as_deref().unwrap_or_default())),
        );
        payload.insert(
            "summary".into(),
            json!(self.summary.as_deref().unwrap_or_default().trim()),
        );
        payload.insert(
            "authors".into(),
            Value::Array(self.authors.into_iter().map(|n| json!({ "name": n })).collect()),
        );
        payload.insert(
            "tags".into(),
            Value::Array(self.tags.into_iter().map(|t| json!({ "term": t })).collect()),
        );
        if let Some(primary) = self.primary_category {
            payload.insert("primary_category".into(), json!(primary));
        }
        if let Some(published) = self.published {
            payload.insert("published".into(), json!(published.trim()));
        }
        payload.insert("links".into(), Value::Array(self.links));
        payload.insert("time_str".into(), json!(time.format("%b %d %Y").to_string()));
        for (key, value) in [
            ("comment", self.comment),
            ("journal_ref", self.journal_ref),
            ("doi", self.doi),
        ] {
            if let Some(value) = value {
                payload.insert(key.into(), json!(collapse_whitespace(&value)));
            }
        }

        Ok(record)
    }
}

fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, SourceError> {
    match e.try_get_attribute(key) {
        Ok(Some(a)) => a
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|err| SourceError::Parse(format!("invalid attribute '{key}': {err}"))),
        Ok(None) => Ok(None),
        Err(err) => Err(SourceError::Parse(format!("invalid attribute '{key}': {err}"))),
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
