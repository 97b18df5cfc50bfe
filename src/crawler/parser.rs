//! Candidate extraction from recommendation payloads
//!
//! This module turns a fetched body into the listing references it
//! recommends. OLX bodies carry galleries of related ads; ZAP detail bodies
//! recommend nothing, so a ZAP crawl visits its seeds only.

use crate::source::payload::{parse_payload, OlxAd, PayloadError, PayloadShape};
use crate::source::{ListingId, Source};

/// A listing reference discovered inside a payload
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateListing {
    pub listing_id: ListingId,
    pub category_code: Option<String>,
    pub subject: Option<String>,
    pub price_text: Option<String>,
    pub neighborhood: Option<String>,
    pub municipality: Option<String>,
    pub state: Option<String>,
    pub url: Option<String>,

    /// Where in the payload the reference was found
    pub shape: PayloadShape,

    /// Title of the enclosing gallery group
    pub gallery_title: Option<String>,
}

/// Extracts every candidate listing from a response body
///
/// Entries without a usable listing id are skipped.
///
/// # Arguments
///
/// * `source` - The API the body came from
/// * `body` - The verbatim response body
///
/// # Returns
///
/// * `Ok(Vec<CandidateListing>)` - Candidates in document order
/// * `Err(PayloadError)` - The body is not JSON or has the wrong top-level shape
///
/// # Example
///
/// ```
/// use listing_ripple::crawler::extract_candidates;
/// use listing_ripple::Source;
///
/// let body = r#"[{"type": "SingleGallery", "content": [{"list_id": 7, "category": "1020"}]}]"#;
/// let candidates = extract_candidates(Source::Olx, body).unwrap();
/// assert_eq!(candidates[0].listing_id.as_str(), "7");
/// ```
pub fn extract_candidates(
    source: Source,
    body: &str,
) -> Result<Vec<CandidateListing>, PayloadError> {
    let entries = parse_payload(source, body)?;

    let mut candidates = Vec::new();
    for entry in entries {
        if entry.shape == PayloadShape::FlatRecord {
            continue;
        }

        let ad: OlxAd = match serde_json::from_value(entry.record) {
            Ok(ad) => ad,
            Err(e) => {
                tracing::trace!("Skipping gallery entry that is not an ad: {}", e);
                continue;
            }
        };

        let Some(listing_id) = ad.list_id.as_ref().and_then(ListingId::from_json) else {
            tracing::trace!("Skipping gallery entry without a usable list_id");
            continue;
        };

        candidates.push(CandidateListing {
            listing_id,
            category_code: ad.category_code(),
            price_text: ad.price_text(),
            subject: ad.subject,
            neighborhood: ad.neighbourhood,
            municipality: ad.municipality,
            state: ad.state_uf,
            url: ad.ad_url,
            shape: entry.shape,
            gallery_title: entry.gallery_title,
        });
    }

    Ok(candidates)
}
