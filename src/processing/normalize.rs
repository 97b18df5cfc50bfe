//! Raw envelope normalization
//!
//! Each envelope is split into listing records according to its source's
//! payload shape, and each record is validated and coerced independently:
//! one bad record never costs the rest of the batch.

use crate::filter::CategoryFilter;
use crate::processing::coerce::{
    non_empty, normalize_state, parse_epoch_millis, parse_price, parse_timestamp,
};
use crate::source::payload::{parse_payload, OlxAd, PayloadEntry, ZapRecord};
use crate::source::{ListingId, Source};
use crate::storage::RawEnvelope;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A validated, typed listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedListing {
    pub listing_id: ListingId,
    pub title: Option<String>,
    /// Non-negative amount in BRL
    pub price: Option<f64>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    /// Two-letter upper-case code
    pub state: Option<String>,
    pub listed_at: DateTime<Utc>,

    #[serde(skip)]
    pub source: Source,
    #[serde(skip)]
    pub retrieved_at: DateTime<Utc>,
}

/// Why a record (or a whole envelope) produced no listing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("body is not a {0} payload: {1}")]
    MalformedBody(Source, String),

    #[error("snapshot could not be read: {0}")]
    Unreadable(String),

    #[error("record is not a listing object: {0}")]
    NotARecord(String),

    #[error("record has no listing id")]
    MissingListingId,

    #[error("listing id {0} is not usable")]
    InvalidListingId(String),

    #[error("record has no timestamp")]
    MissingTimestamp,

    #[error("timestamp {0} is not epoch milliseconds or RFC 3339")]
    InvalidTimestamp(String),
}

/// A rejection together with where it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// The snapshot the record came from
    pub snapshot: String,
    pub reason: RejectReason,
}

/// Everything one envelope produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub listings: Vec<NormalizedListing>,
    pub rejections: Vec<RejectReason>,
    /// Records dropped by the category filter
    pub filtered: usize,
}

impl NormalizedBatch {
    fn rejected(reason: RejectReason) -> Self {
        Self {
            rejections: vec![reason],
            ..Self::default()
        }
    }
}

/// Turns raw envelopes into normalized listings
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    filter: CategoryFilter,
}

impl Normalizer {
    pub fn new(filter: CategoryFilter) -> Self {
        Self { filter }
    }

    /// Normalizes every record inside one envelope
    ///
    /// A body that is not JSON, or not the source's payload shape, yields a
    /// batch with a single rejection.
    pub fn normalize(&self, envelope: &RawEnvelope) -> NormalizedBatch {
        let entries = match parse_payload(envelope.source, &envelope.raw_body) {
            Ok(entries) => entries,
            Err(e) => {
                return NormalizedBatch::rejected(RejectReason::MalformedBody(
                    envelope.source,
                    e.to_string(),
                ))
            }
        };

        let mut batch = NormalizedBatch::default();
        for entry in entries {
            let outcome = match envelope.source {
                Source::Olx => self.normalize_olx(entry, envelope),
                Source::Zap => normalize_zap(entry, envelope).map(Some),
            };
            match outcome {
                Ok(Some(listing)) => batch.listings.push(listing),
                Ok(None) => batch.filtered += 1,
                Err(reason) => batch.rejections.push(reason),
            }
        }
        batch
    }

    /// Ok(None) means the category filter dropped the record
    fn normalize_olx(
        &self,
        entry: PayloadEntry,
        envelope: &RawEnvelope,
    ) -> Result<Option<NormalizedListing>, RejectReason> {
        let ad: OlxAd = serde_json::from_value(entry.record)
            .map_err(|e| RejectReason::NotARecord(e.to_string()))?;

        if !self
            .filter
            .accepts(ad.category_code().as_deref(), entry.gallery_title.as_deref())
        {
            return Ok(None);
        }

        let listing_id = required_id(ad.list_id.as_ref())?;
        let listed_at = required_time(ad.date_ts.as_ref(), parse_epoch_millis)?;

        Ok(Some(NormalizedListing {
            listing_id,
            title: non_empty(ad.subject),
            price: ad.price.as_ref().and_then(parse_price),
            url: non_empty(ad.ad_url),
            image_url: non_empty(ad.image_url),
            neighborhood: non_empty(ad.neighbourhood),
            city: non_empty(ad.municipality),
            state: normalize_state(ad.state_uf.as_deref()),
            listed_at,
            source: envelope.source,
            retrieved_at: envelope.retrieved_at,
        }))
    }
}

fn normalize_zap(
    entry: PayloadEntry,
    envelope: &RawEnvelope,
) -> Result<NormalizedListing, RejectReason> {
    let record: ZapRecord = serde_json::from_value(entry.record)
        .map_err(|e| RejectReason::NotARecord(e.to_string()))?;

    let listing_id = required_id(record.id.as_ref())?;
    let listed_at = required_time(record.created_at.as_ref(), parse_timestamp)?;
    let address = record.address.unwrap_or_default();

    Ok(NormalizedListing {
        listing_id,
        title: non_empty(record.title),
        price: record.price.as_ref().and_then(parse_price),
        url: non_empty(record.url),
        image_url: non_empty(record.image_url),
        neighborhood: non_empty(address.neighborhood),
        city: non_empty(address.city),
        state: normalize_state(address.state.as_deref()),
        listed_at,
        source: envelope.source,
        retrieved_at: envelope.retrieved_at,
    })
}

fn required_id(value: Option<&Value>) -> Result<ListingId, RejectReason> {
    match value {
        None | Some(Value::Null) => Err(RejectReason::MissingListingId),
        Some(v) => ListingId::from_json(v).ok_or_else(|| RejectReason::InvalidListingId(v.to_string())),
    }
}

fn required_time(
    value: Option<&Value>,
    parse: fn(&Value) -> Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, RejectReason> {
    match value {
        None | Some(Value::Null) => Err(RejectReason::MissingTimestamp),
        Some(v) => parse(v).ok_or_else(|| RejectReason::InvalidTimestamp(v.to_string())),
    }
}
