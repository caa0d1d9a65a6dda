//! Stop disambiguation
//!
//! Resolves free-text place names to ranked candidate stops, and to a single
//! stop when a query needs one.

use std::{cmp::Ordering, sync::Arc};

use domain::{GeoLocation, Language, Stop};
use tracing::{debug, instrument};

use crate::{error::ApplicationError, ports::TransitPort};

/// Default number of candidates returned by a stop search
pub const DEFAULT_STOP_LIMIT: usize = 10;

/// Default quality (upstream scale 0..=1000) above which a match counts as confident
pub const DEFAULT_AMBIGUITY_THRESHOLD: u32 = 900;

/// Ranks stop finder results and picks a single stop when required
#[derive(Clone)]
pub struct StopDisambiguator {
    transit: Arc<dyn TransitPort>,
    default_limit: usize,
    ambiguity_threshold: u32,
}

impl std::fmt::Debug for StopDisambiguator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopDisambiguator")
            .field("default_limit", &self.default_limit)
            .field("ambiguity_threshold", &self.ambiguity_threshold)
            .finish_non_exhaustive()
    }
}

impl StopDisambiguator {
    /// Create a disambiguator with default limit and threshold
    pub fn new(transit: Arc<dyn TransitPort>) -> Self {
        Self {
            transit,
            default_limit: DEFAULT_STOP_LIMIT,
            ambiguity_threshold: DEFAULT_AMBIGUITY_THRESHOLD,
        }
    }

    /// Override the default candidate limit
    #[must_use]
    pub const fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Override the confidence threshold
    #[must_use]
    pub const fn with_ambiguity_threshold(mut self, threshold: u32) -> Self {
        self.ambiguity_threshold = threshold;
        self
    }

    /// Ranked candidates for a place name; empty when nothing matches
    #[instrument(skip(self, focus))]
    pub async fn find_stops(
        &self,
        query: &str,
        limit: Option<usize>,
        focus: Option<&GeoLocation>,
        language: Language,
    ) -> Result<Vec<Stop>, ApplicationError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let fetched = self.transit.find_stops(query, language).await?;
        let mut ranked = rank(query, fetched.value, focus);
        ranked.truncate(limit.unwrap_or(self.default_limit));
        debug!(
            count = ranked.len(),
            from_cache = fetched.from_cache,
            "Ranked stop candidates"
        );
        Ok(ranked)
    }

    /// Pick exactly one stop for a place name
    ///
    /// Fails with `Validation` when nothing matches and with `AmbiguousStop`
    /// when several confident matches remain and no tie-break applies.
    #[instrument(skip(self, focus))]
    pub async fn resolve_one(
        &self,
        query: &str,
        focus: Option<&GeoLocation>,
        language: Language,
    ) -> Result<Stop, ApplicationError> {
        let fetched = self.transit.find_stops(query.trim(), language).await?;
        let ranked = rank(query, fetched.value, focus);
        self.pick(query, ranked, focus)
    }

    /// Selection rules over already ranked candidates
    fn pick(
        &self,
        query: &str,
        ranked: Vec<Stop>,
        focus: Option<&GeoLocation>,
    ) -> Result<Stop, ApplicationError> {
        let mut exact: Vec<&Stop> = ranked.iter().filter(|s| s.matches_exactly(query)).collect();
        if exact.len() == 1 {
            if let Some(stop) = exact.pop() {
                return Ok(stop.clone());
            }
        }

        let confident: Vec<Stop> = ranked
            .iter()
            .filter(|s| s.quality() >= self.ambiguity_threshold)
            .cloned()
            .collect();

        if confident.len() <= 1 {
            return confident
                .into_iter()
                .next()
                .or_else(|| ranked.into_iter().next())
                .ok_or_else(|| {
                    ApplicationError::Validation(format!("no stop found for '{}'", query.trim()))
                });
        }

        let best: Vec<&Stop> = confident.iter().filter(|s| s.is_best).collect();
        if let [single] = best.as_slice() {
            return Ok((*single).clone());
        }

        if let Some(point) = focus {
            let nearest = confident
                .iter()
                .filter_map(|s| s.distance_to(point).map(|d| (d, s)))
                .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            if let Some((_, stop)) = nearest {
                return Ok(stop.clone());
            }
        }

        Err(ApplicationError::AmbiguousStop {
            query: query.trim().to_string(),
            candidates: confident,
        })
    }
}

/// Order candidates: exact name first, then quality, prefix match, focus distance, name
pub fn rank(query: &str, mut candidates: Vec<Stop>, focus: Option<&GeoLocation>) -> Vec<Stop> {
    candidates.sort_by(|a, b| {
        b.matches_exactly(query)
            .cmp(&a.matches_exactly(query))
            .then_with(|| b.quality().cmp(&a.quality()))
            .then_with(|| b.starts_with(query).cmp(&a.starts_with(query)))
            .then_with(|| compare_distance(a, b, focus))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    candidates
}

fn compare_distance(a: &Stop, b: &Stop, focus: Option<&GeoLocation>) -> Ordering {
    let Some(point) = focus else {
        return Ordering::Equal;
    };
    match (a.distance_to(point), b.distance_to(point)) {
        (Some(da), Some(db)) => da.partial_cmp(&db).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{Fetched, MockTransitPort};

    fn stop(id: &str, name: &str, quality: u32) -> Stop {
        Stop::new(id, name).unwrap().with_match_quality(quality)
    }

    fn meran_candidates() -> Vec<Stop> {
        vec![
            stop("1", "Meran Bahnhof", 950),
            stop("2", "Meran Theaterplatz", 950),
            stop("3", "Meran Rennweg", 950),
        ]
    }

    fn disambiguator(candidates: Vec<Stop>) -> StopDisambiguator {
        let mut mock = MockTransitPort::new();
        mock.expect_find_stops()
            .returning(move |_, _| Ok(Fetched::fresh(candidates.clone())));
        StopDisambiguator::new(Arc::new(mock))
    }

    #[test]
    fn rank_by_quality_then_prefix_then_name() {
        let ranked = rank(
            "Meran",
            vec![
                stop("1", "Untermais, Meran", 800),
                stop("2", "Meran Rennweg", 800),
                stop("3", "Meran Bahnhof", 800),
                stop("4", "Lana", 990),
            ],
            None,
        );
        let names: Vec<&str> = ranked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Lana", "Meran Bahnhof", "Meran Rennweg", "Untermais, Meran"]
        );
    }

    #[test]
    fn rank_puts_exact_match_first() {
        let ranked = rank(
            "Meran",
            vec![stop("1", "Meran Bahnhof", 999), stop("2", "Meran", 500)],
            None,
        );
        assert_eq!(ranked[0].id, "2");
    }

    #[test]
    fn rank_uses_focus_distance() {
        let near = stop("1", "Bahnhof", 900).with_coordinates(GeoLocation::meran());
        let far = stop("2", "Bahnhof", 900).with_coordinates(GeoLocation::bozen());
        let ranked = rank("Bahnhof X", vec![far, near], Some(&GeoLocation::meran()));
        assert_eq!(ranked[0].id, "1");
    }

    #[tokio::test]
    async fn find_stops_truncates_to_limit() {
        let d = disambiguator(meran_candidates());
        let stops = d.find_stops("Meran", Some(2), None, Language::De).await.unwrap();
        assert_eq!(stops.len(), 2);
    }

    #[tokio::test]
    async fn find_stops_empty_is_not_an_error() {
        let d = disambiguator(Vec::new());
        let stops = d.find_stops("Nirgendwo", None, None, Language::De).await.unwrap();
        assert!(stops.is_empty());
    }

    #[tokio::test]
    async fn three_confident_candidates_are_ambiguous() {
        let d = disambiguator(meran_candidates());
        let err = d.resolve_one("Meran", None, Language::De).await.unwrap_err();
        match err {
            ApplicationError::AmbiguousStop { query, candidates } => {
                assert_eq!(query, "Meran");
                assert_eq!(candidates.len(), 3);
                let mut ids: Vec<&str> = candidates.iter().map(|s| s.id.as_str()).collect();
                ids.sort_unstable();
                assert_eq!(ids, vec!["1", "2", "3"]);
            },
            other => panic!("expected AmbiguousStop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn focus_breaks_ties() {
        let candidates = vec![
            stop("1", "Bahnhof", 950).with_coordinates(GeoLocation::bozen()),
            stop("2", "Bahnhof", 950).with_coordinates(GeoLocation::meran()),
        ];
        let d = disambiguator(candidates);
        let picked = d
            .resolve_one("Bahnhof Süd", Some(&GeoLocation::meran()), Language::De)
            .await
            .unwrap();
        assert_eq!(picked.id, "2");
    }

    #[tokio::test]
    async fn single_best_breaks_ties() {
        let mut best = stop("2", "Meran Theaterplatz", 950);
        best.is_best = true;
        let d = disambiguator(vec![stop("1", "Meran Bahnhof", 950), best]);
        let picked = d.resolve_one("Meran", None, Language::De).await.unwrap();
        assert_eq!(picked.id, "2");
    }

    #[tokio::test]
    async fn exact_name_short_circuits() {
        let mut candidates = meran_candidates();
        candidates.push(stop("9", "Meran", 950));
        let d = disambiguator(candidates);
        let picked = d.resolve_one("meran", None, Language::De).await.unwrap();
        assert_eq!(picked.id, "9");
    }

    #[tokio::test]
    async fn no_confident_match_takes_top_ranked() {
        let d = disambiguator(vec![stop("1", "Lana Post", 400), stop("2", "Lana Ost", 700)]);
        let picked = d.resolve_one("Lana", None, Language::De).await.unwrap();
        assert_eq!(picked.id, "2");
    }

    #[tokio::test]
    async fn nothing_found_is_validation_error() {
        let d = disambiguator(Vec::new());
        let err = d.resolve_one("Atlantis", None, Language::De).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }
}
