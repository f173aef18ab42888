// components/media_downloader/src/tracking.rs
use url::Url;

/// Query keys that only track where a link was shared from
const TRACKING_PARAMS: &[&str] = &[
    "si",
    "feature",
    "fbclid",
    "gclid",
    "igshid",
    "pp",
    "ab_channel",
    "mc_cid",
    "mc_eid",
    "ref_src",
];

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Drop tracking query parameters, keeping the ones that identify the resource
pub fn strip_tracking_params(url: &Url) -> Url {
    let mut cleaned = url.clone();
    if url.query().is_none() {
        return cleaned;
    }

    let total = url.query_pairs().count();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    // re-serialising would change the encoding of untouched queries
    if kept.len() == total {
        return cleaned;
    }
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}
