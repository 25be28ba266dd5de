//! Feed payloads become either RSS items or raw JSON.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};

pub const NO_LINK: &str = "No link";
pub const NO_DESCRIPTION: &str = "No description";
pub const NO_DATE: &str = "No date";
pub const NO_GUID: &str = "No GUID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssItem {
    pub link: String,
    pub description: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub guid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedContent {
    Rss(Vec<RssItem>),
    Json(serde_json::Value),
}

impl FeedContent {
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FeedError::parse(format!("failed to serialize feed: {e}")))
    }
}

/// Payloads opening with an XML declaration are RSS; anything else must be JSON.
pub fn render(payload: &str) -> Result<FeedContent> {
    let trimmed = payload.trim_start();
    if trimmed.starts_with("<?xml") {
        parse_rss(trimmed).map(FeedContent::Rss)
    } else {
        serde_json::from_str(payload)
            .map(FeedContent::Json)
            .map_err(|e| FeedError::parse(format!("invalid JSON feed: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Link,
    Description,
    PubDate,
    Guid,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"pubDate" => Some(Self::PubDate),
            b"guid" => Some(Self::Guid),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    link: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    guid: Option<String>,
}

impl ItemBuilder {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
            Field::Guid => &mut self.guid,
        }
    }

    fn build(self) -> RssItem {
        RssItem {
            link: self.link.unwrap_or_else(|| NO_LINK.to_string()),
            description: self.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            pub_date: self.pub_date.unwrap_or_else(|| NO_DATE.to_string()),
            guid: self.guid.unwrap_or_else(|| NO_GUID.to_string()),
        }
    }
}

/// An element whose text is being collected, opened at `depth` inside the item.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

struct OpenItem {
    fields: ItemBuilder,
    depth: usize,
    captures: Vec<Capture>,
}

impl OpenItem {
    fn wants(&self, field: Field) -> bool {
        let taken = match field {
            Field::Link => self.fields.link.is_some(),
            Field::Description => self.fields.description.is_some(),
            Field::PubDate => self.fields.pub_date.is_some(),
            Field::Guid => self.fields.guid.is_some(),
        };
        !taken && !self.captures.iter().any(|c| c.field == field)
    }

    fn append(&mut self, text: &str) {
        for capture in &mut self.captures {
            capture.text.push_str(text);
        }
    }
}

/// Collects every `<item>`. Within an item the first element of each field name
/// wins, at any depth, and its value is all the text beneath it.
pub fn parse_rss(xml: &str) -> Result<Vec<RssItem>> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut open: Option<OpenItem> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FeedError::parse(format!(
                "invalid RSS at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => {
                let name = start.local_name();
                if let Some(item) = open.as_mut() {
                    item.depth += 1;
                    if let Some(field) = Field::from_name(name.as_ref()) {
                        if item.wants(field) {
                            item.captures.push(Capture {
                                field,
                                depth: item.depth,
                                text: String::new(),
                            });
                        }
                    }
                } else if name.as_ref() == b"item" {
                    open = Some(OpenItem {
                        fields: ItemBuilder::default(),
                        depth: 0,
                        captures: Vec::new(),
                    });
                }
            }
            Event::Empty(empty) => {
                if let Some(item) = open.as_mut() {
                    let name = empty.local_name();
                    if let Some(field) = Field::from_name(name.as_ref()) {
                        if item.wants(field) {
                            *item.fields.slot(field) = Some(String::new());
                        }
                    }
                } else if empty.local_name().as_ref() == b"item" {
                    items.push(ItemBuilder::default().build());
                }
            }
            Event::Text(text) => {
                if let Some(item) = open.as_mut().filter(|i| !i.captures.is_empty()) {
                    let text = text
                        .unescape()
                        .map_err(|e| FeedError::parse(format!("invalid RSS text: {e}")))?;
                    item.append(&text);
                }
            }
            Event::CData(cdata) => {
                if let Some(item) = open.as_mut().filter(|i| !i.captures.is_empty()) {
                    item.append(&String::from_utf8_lossy(&cdata));
                }
            }
            Event::End(_) => {
                if let Some(mut item) = open.take() {
                    if item.depth == 0 {
                        items.push(item.fields.build());
                        continue;
                    }
                    let depth = item.depth;
                    let (done, still_open): (Vec<_>, Vec<_>) =
                        item.captures.drain(..).partition(|c| c.depth == depth);
                    item.captures = still_open;
                    for capture in done {
                        *item.fields.slot(capture.field) = Some(capture.text);
                    }
                    item.depth -= 1;
                    open = Some(item);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    tracing::debug!(items = items.len(), "parsed RSS");
    Ok(items)
}
