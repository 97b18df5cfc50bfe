//! Payload shapes returned by the listing APIs
//!
//! OLX answers with an array of gallery groups, each tagged by its `type`:
//! a `GalleryGroup` nests galleries of ads, a `SingleGallery` holds ads
//! directly. ZAP answers with a single flat listing object. The shape is
//! chosen from the source and the `type` tag, never by probing keys.

use crate::source::Source;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Where inside a payload a listing record was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    /// Ad nested two levels deep inside an OLX `GalleryGroup`
    GroupedGallery,
    /// Ad directly inside an OLX `SingleGallery`
    SingleGallery,
    /// The whole document is one listing (ZAP)
    FlatRecord,
}

/// A raw listing record plus the context it was found in
#[derive(Debug, Clone)]
pub struct PayloadEntry {
    pub shape: PayloadShape,
    /// Title of the enclosing gallery group, if any
    pub gallery_title: Option<String>,
    pub record: Value,
}

/// Errors raised when a response body does not have the shape its source promises
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("body is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("unexpected {api} payload: expected {expected}")]
    UnexpectedShape {
        api: Source,
        expected: &'static str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum OlxGroup {
    GalleryGroup {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        content: Vec<OlxGallery>,
    },
    SingleGallery {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        content: Vec<Value>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct OlxGallery {
    #[serde(default)]
    content: Vec<Value>,
}

/// One ad as it appears inside an OLX gallery
#[derive(Debug, Clone, Deserialize)]
pub struct OlxAd {
    #[serde(default)]
    pub list_id: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub neighbourhood: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub state_uf: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ad_url: Option<String>,
    #[serde(default)]
    pub date_ts: Option<Value>,
}

impl OlxAd {
    /// Category code as text; the API sends it as either a string or a number
    pub fn category_code(&self) -> Option<String> {
        match self.category.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Price as display text, used only for logging candidates
    pub fn price_text(&self) -> Option<String> {
        match self.price.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A ZAP listing detail document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZapRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub address: Option<ZapAddress>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZapAddress {
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Splits a response body into the listing records it carries
///
/// # Arguments
///
/// * `source` - The API the body came from; selects the expected shape
/// * `body` - The verbatim response text
///
/// # Returns
///
/// * `Ok(Vec<PayloadEntry>)` - Every listing record, in document order
/// * `Err(PayloadError)` - The body is not JSON or not the source's shape
pub fn parse_payload(source: Source, body: &str) -> Result<Vec<PayloadEntry>, PayloadError> {
    match source {
        Source::Olx => parse_olx(body),
        Source::Zap => parse_zap(body),
    }
}

fn parse_olx(body: &str) -> Result<Vec<PayloadEntry>, PayloadError> {
    let document: Value = serde_json::from_str(body)?;
    if !document.is_array() {
        return Err(PayloadError::UnexpectedShape {
            api: Source::Olx,
            expected: "an array of gallery groups",
        });
    }
    let groups: Vec<OlxGroup> = serde_json::from_value(document)?;

    let mut entries = Vec::new();
    for group in groups {
        match group {
            OlxGroup::GalleryGroup { title, content } => {
                for gallery in content {
                    entries.extend(gallery.content.into_iter().map(|record| PayloadEntry {
                        shape: PayloadShape::GroupedGallery,
                        gallery_title: title.clone(),
                        record,
                    }));
                }
            }
            OlxGroup::SingleGallery { title, content } => {
                entries.extend(content.into_iter().map(|record| PayloadEntry {
                    shape: PayloadShape::SingleGallery,
                    gallery_title: title.clone(),
                    record,
                }));
            }
            OlxGroup::Other => {
                tracing::trace!("Ignoring gallery group of unknown type");
            }
        }
    }

    Ok(entries)
}

fn parse_zap(body: &str) -> Result<Vec<PayloadEntry>, PayloadError> {
    let document: Value = serde_json::from_str(body)?;
    if !document.is_object() {
        return Err(PayloadError::UnexpectedShape {
            api: Source::Zap,
            expected: "a listing object",
        });
    }

    Ok(vec![PayloadEntry {
        shape: PayloadShape::FlatRecord,
        gallery_title: None,
        record: document,
    }])
}
