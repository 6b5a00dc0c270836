//! Page URL discovery.
//!
//! The page URL is resolved at every flush, not at activation, so single-page
//! applications report the page the batch was collected on.

/// Supplies the current page URL, if one is known.
pub trait PageUrlSource: Send + Sync {
    fn page_url(&self) -> Option<String>;
}

/// A fixed page URL, set once.
#[derive(Debug, Clone, Default)]
pub struct StaticPageUrl(Option<String>);

impl StaticPageUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(Some(url.into()))
    }

    /// No page URL; payloads carry `"pageUrl": null`.
    pub fn unknown() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticPageUrl {
    fn from(url: Option<String>) -> Self {
        Self(url)
    }
}

impl PageUrlSource for StaticPageUrl {
    fn page_url(&self) -> Option<String> {
        self.0.clone()
    }
}

impl<F> PageUrlSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn page_url(&self) -> Option<String> {
        self()
    }
}
