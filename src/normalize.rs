/// Markers appended by site analytics that do not change the article.
pub const DEFAULT_MARKERS: [&str; 4] = [
    // Urchin Tracking Module parameters
    "?utm", "&utm",
    // campaign parameters (The Guardian)
    "?CMP", "&CMP",
];

/// Returns `url` cut just before the first occurrence of `marker`.
pub fn strip_url<'a>(url: &'a str, marker: &str) -> &'a str {
    match url.find(marker) {
        Some(pos) => &url[..pos],
        None => url,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerMarkers(Vec<String>);

impl TrackerMarkers {
    /// Empty markers are skipped: they would cut every url down to "".
    pub fn new<I, S>(markers: I) -> TrackerMarkers
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TrackerMarkers(
            markers
                .into_iter()
                .map(Into::<String>::into)
                .filter(|marker| !marker.is_empty())
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Applies every marker in order, each one on the already truncated string.
    pub fn normalize(&self, url: &str) -> String {
        self.0
            .iter()
            .fold(url, |acc, marker| strip_url(acc, marker))
            .to_string()
    }
}

impl Default for TrackerMarkers {
    fn default() -> Self {
        TrackerMarkers::new(DEFAULT_MARKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_cuts_before_first_occurrence() {
        assert_eq!(
            strip_url("https://a.com/x?utm_source=rss&utm_medium=feed", "utm"),
            "https://a.com/x?"
        );
        assert_eq!(strip_url("https://a.com/x?utm=1", "?utm"), "https://a.com/x");
    }

    #[test]
    fn strip_without_marker_is_identity() {
        assert_eq!(strip_url("https://a.com/x", "?utm"), "https://a.com/x");
        assert_eq!(strip_url("", "?utm"), "");
    }

    #[test]
    fn default_markers_cover_utm_and_cmp() {
        let markers = TrackerMarkers::default();
        assert_eq!(
            markers.normalize("https://a.com/x?utm_source=tw"),
            "https://a.com/x"
        );
        assert_eq!(
            markers.normalize("https://a.com/x?id=3&utm_source=tw"),
            "https://a.com/x?id=3"
        );
        assert_eq!(
            markers.normalize("https://www.theguardian.com/a?CMP=share_btn_tw"),
            "https://www.theguardian.com/a"
        );
        assert_eq!(
            markers.normalize("https://a.com/x?id=3&CMP=fb"),
            "https://a.com/x?id=3"
        );
    }

    #[test]
    fn markers_are_case_sensitive() {
        let markers = TrackerMarkers::default();
        assert_eq!(
            markers.normalize("https://a.com/x?UTM_source=tw"),
            "https://a.com/x?UTM_source=tw"
        );
    }

    #[test]
    fn later_markers_see_truncated_string() {
        let markers = TrackerMarkers::new(["?a", "&b"]);
        // "&b" only occurs after "?a", so it is already gone
        assert_eq!(markers.normalize("https://x.io/p?a=1&b=2"), "https://x.io/p");
        assert_eq!(markers.normalize("https://x.io/p?c=1&b=2"), "https://x.io/p?c=1");
    }

    #[test]
    fn empty_markers_are_ignored() {
        let markers = TrackerMarkers::new(["", "?utm", ""]);
        assert_eq!(markers.as_slice(), ["?utm"]);
        assert_eq!(markers.normalize("https://a.com/"), "https://a.com/");
        assert_eq!(markers.normalize("https://a.com/?utm=1"), "https://a.com/");

        let markers = TrackerMarkers::new([""]);
        assert!(markers.as_slice().is_empty());
        assert_eq!(markers.normalize("https://b.com/"), "https://b.com/");
    }

    #[test]
    fn custom_marker_set() {
        let markers = TrackerMarkers::new(["#"]);
        assert_eq!(markers.normalize("https://x.io/p#top"), "https://x.io/p");
        assert_eq!(markers.normalize("https://x.io/p?utm=1"), "https://x.io/p?utm=1");
    }
}
