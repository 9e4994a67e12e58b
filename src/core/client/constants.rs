//! Centralized constants for default endpoints and UAs.

/// Rotating pool of desktop UAs to avoid trivial bot blocking.
pub(crate) const USER_AGENTS: &[&str] = &[
    concat!(
        "Mozilla/5.0 (X11; Linux x86_64) ",
        "AppleWebKit/537.36 (KHTML, like Gecko) ",
        "Chrome/122.0.0.0 Safari/537.36"
    ),
    concat!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
        "AppleWebKit/537.36 (KHTML, like Gecko) ",
        "Chrome/124.0.0.0 Safari/537.36"
    ),
    concat!(
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) ",
        "AppleWebKit/605.1.15 (KHTML, like Gecko) ",
        "Version/17.4 Safari/605.1.15"
    ),
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
];

/// Yahoo API host serving chart and v7 quote requests by default.
pub(crate) const DEFAULT_BASE_QUERY1: &str = "https://query1.finance.yahoo.com/";

/// Yahoo API host serving quoteSummary and fundamentals time series by default.
pub(crate) const DEFAULT_BASE_QUERY2: &str = "https://query2.finance.yahoo.com/";

/// A URL that returns a Set-Cookie header for Yahoo domains.
pub(crate) const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com/consent";

/// URL to fetch a crumb (requires cookie from `DEFAULT_COOKIE_URL`).
pub(crate) const DEFAULT_CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
