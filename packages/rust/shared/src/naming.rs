//! Bot, table, and intent name derivation.
//!
//! A bot name is a fingerprint of its FAQ URL: the host followed by the first
//! two characters of every path segment (path part capped at 10 characters),
//! stripped of punctuation and title-cased into a single token. Two URLs that
//! only differ past that window map to the same bot; collisions are not
//! detected.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{OctochatError, Result};

/// Characters kept from each path segment.
const SEGMENT_PREFIX_LEN: usize = 2;

/// Cap on the combined path fingerprint.
const PATH_FINGERPRINT_LEN: usize = 10;

/// ASCII punctuation, same set as `!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~`.
static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:punct:]]").expect("punctuation regex"));

/// Derive the platform bot name for an FAQ URL.
///
/// The URL is validated with [`Url`], but the fingerprint is taken from the
/// text as written: an explicit default port (`:443`) and non-ASCII path
/// characters are kept rather than normalized away.
pub fn derive_bot_name(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| OctochatError::parse(format!("invalid URL '{url}': {e}")))?;
    if parsed.host_str().is_none() {
        return Err(OctochatError::parse(format!("URL has no host: {url}")));
    }

    let (authority, path) = split_authority(url)
        .ok_or_else(|| OctochatError::parse(format!("URL has no host: {url}")))?;

    let path_part: String = path
        .split('/')
        .skip(1)
        .flat_map(|segment| segment.chars().take(SEGMENT_PREFIX_LEN))
        .take(PATH_FINGERPRINT_LEN)
        .collect();

    Ok(convert_to_title(&format!("{authority}{path_part}")))
}

/// Authority and path of `scheme://authority/path?query#fragment`, unmodified.
fn split_authority(url: &str) -> Option<(&str, &str)> {
    let (_, rest) = url.split_once("://")?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    Some(match rest.find('/') {
        Some(slash) => rest.split_at(slash),
        None => (rest, ""),
    })
}

/// Strip punctuation, title-case, and remove whitespace.
pub fn convert_to_title(s: &str) -> String {
    let stripped = PUNCT_RE.replace_all(s, "");
    title_case(&stripped)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Upper-case a letter when the character before it is not a letter,
/// lower-case it otherwise.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Name of the response table backing `bot_name`.
pub fn response_table_name(bot_name: &str) -> String {
    format!("{bot_name}_intents")
}

/// Name under which an intent is registered on the bot platform.
pub fn platform_intent_name(bot_name: &str, intent_name: &str) -> String {
    format!("{bot_name}_{intent_name}")
}
