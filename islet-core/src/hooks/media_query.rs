//! Media query signals.

use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::reactive::Signal;

const PREFERS_DARK: &str = "(prefers-color-scheme: dark)";
const PREFERS_LIGHT: &str = "(prefers-color-scheme: light)";

/// Live match state of `query`.
///
/// The signal follows the host's changes. Without media-query support the
/// result is a detached signal holding `false`.
pub fn use_media_query(host: &dyn Host, query: &str) -> Signal<bool> {
    host.match_media(query).unwrap_or_else(|| {
        tracing::debug!(query = %query, "media queries unsupported, defaulting to false");
        Signal::new(false)
    })
}

/// The user's preferred color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    Dark,
    Light,
    NoPreference,
}

/// Dark wins over light when both match.
pub fn use_preferred_color_scheme(host: &dyn Host) -> ColorScheme {
    let matches = |query| host.match_media(query).is_some_and(|signal| signal.get());

    if matches(PREFERS_DARK) {
        ColorScheme::Dark
    } else if matches(PREFERS_LIGHT) {
        ColorScheme::Light
    } else {
        ColorScheme::NoPreference
    }
}
