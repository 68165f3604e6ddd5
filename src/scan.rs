use crate::models::{Article, Observation, ScanReport, SeenUrls};
use crate::normalize::TrackerMarkers;
use crate::pocket::ReadingList;

/// Single pass over `articles`, which must be oldest first: the first
/// article of every group sharing a normalized url is kept, every later
/// one gets a delete queued on `list`.
pub fn scan<L>(articles: &[Article], markers: &TrackerMarkers, list: &mut L) -> ScanReport
where
    L: ReadingList + ?Sized,
{
    let mut seen = SeenUrls::new();
    let mut report = ScanReport {
        total: articles.len(),
        observations: Vec::new(),
    };

    for article in articles {
        let url = markers.normalize(&article.url);

        if seen.contains(&url) {
            tracing::debug!(id = %article.id, %url, "duplicate");
            list.queue_delete(article.id.clone());
            report
                .observations
                .push(Observation::Duplicate(article.clone()));
            continue;
        }

        // Re-adding without trackers would lose time_added and time_read,
        // so tracked articles are only reported.
        if url != article.url {
            report.observations.push(Observation::Tracked(article.clone()));
        }
        seen.visit(url);
    }

    tracing::debug!(
        total = report.total,
        unique = seen.len(),
        "scan finished"
    );
    report
}
