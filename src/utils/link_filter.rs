//! Eligibility rules for rewriting a link into a click-tracking link.

/// Schemes (and the protocol-relative prefix) eligible for click tracking.
const TRACKABLE_PREFIXES: &[&str] = &["http://", "https://", "//"];

/// Reason a link is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    Fragment,
    UnsupportedScheme,
    AlreadyTracked,
}

/// Decides whether `link` should be rewritten.
///
/// # Rules
///
/// - Empty values and fragment-only references (`#top`) are skipped
/// - Only `http://`, `https://` and protocol-relative `//` links are
///   tracked; `mailto:`, `tel:`, `javascript:`, relative paths etc. are not
/// - Links already starting with `base_click_tracking_url` are skipped so
///   that adapting twice never double-wraps
///
/// Scheme matching is case-insensitive; surrounding whitespace is ignored.
pub fn check_link(link: &str, base_click_tracking_url: Option<&str>) -> Result<(), SkipReason> {
    let link = link.trim();

    if link.is_empty() {
        return Err(SkipReason::Empty);
    }
    if link.starts_with('#') {
        return Err(SkipReason::Fragment);
    }

    let has_trackable_scheme = TRACKABLE_PREFIXES.iter().any(|prefix| {
        link.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    });
    if !has_trackable_scheme {
        return Err(SkipReason::UnsupportedScheme);
    }

    if let Some(base) = base_click_tracking_url
        && !base.is_empty()
        && link.starts_with(base)
    {
        return Err(SkipReason::AlreadyTracked);
    }

    Ok(())
}

pub fn is_trackable_link(link: &str, base_click_tracking_url: Option<&str>) -> bool {
    check_link(link, base_click_tracking_url).is_ok()
}
