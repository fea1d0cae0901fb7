//! Recommendation walker: "what plays next" from a YouTube Mix
//!
//! The Mix of a video (`list=RD<id>`) is listed with a flat extraction, which
//! only returns ids and is fast. Picking the next track is then a front-to-back
//! scan for the first id that has not been played yet.

use crate::error::{Result, YoutubeError};
use crate::extractor::{ExtractMode, Extractor};
use crate::models::RecommendationSet;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of candidates considered
pub const MAX_CANDIDATES: usize = 25;

/// Watch URL of a video
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Mix id seeded from a video
pub fn mix_id(video_id: &str) -> String {
    format!("RD{}", video_id)
}

/// Watch URL of the Mix seeded from a video
pub fn mix_url(video_id: &str) -> String {
    format!("{}&list={}", watch_url(video_id), mix_id(video_id))
}

/// Lists recommendation candidates and selects the next unplayed one
#[derive(Clone)]
pub struct RecommendationWalker {
    extractor: Arc<dyn Extractor>,
}

impl RecommendationWalker {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    /// Ordered candidate ids for `seed_id`
    ///
    /// Fails with `NotFound` when the platform returns no recommendation.
    pub async fn list_candidates(&self, seed_id: &str) -> Result<RecommendationSet> {
        let result = self
            .extractor
            .fetch(&mix_url(seed_id), ExtractMode::Flat)
            .await
            .map_err(|e| YoutubeError::from_extractor(self.extractor.name(), e))?
            .ok_or_else(|| YoutubeError::not_found("Could not get mix playlist"))?;

        let video_ids: Vec<String> = result
            .entries()
            .filter_map(|entry| entry.id.as_deref())
            .filter(|id| !id.is_empty())
            .take(MAX_CANDIDATES)
            .map(str::to_string)
            .collect();

        if video_ids.is_empty() {
            return Err(YoutubeError::not_found("Empty mix playlist"));
        }

        debug!(seed = seed_id, candidates = video_ids.len(), "Mix listed");
        Ok(RecommendationSet {
            video_ids,
            mix_id: mix_id(seed_id),
        })
    }

    /// First candidate for `seed_id` that is neither the seed nor excluded
    pub async fn select_next(&self, seed_id: &str, exclude: &HashSet<String>) -> Result<String> {
        let candidates = self.list_candidates(seed_id).await?;
        first_unplayed(&candidates, seed_id, exclude)
            .ok_or_else(|| YoutubeError::not_found("No next track found (all excluded)"))
    }
}

/// Front-to-back scan of `candidates`, skipping the seed and excluded ids
pub fn first_unplayed(
    candidates: &RecommendationSet,
    seed_id: &str,
    exclude: &HashSet<String>,
) -> Option<String> {
    candidates
        .video_ids
        .iter()
        .find(|id| id.as_str() != seed_id && !exclude.contains(id.as_str()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractorError;
    use crate::models::RawEntry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed mix and records the requested targets
    struct MixExtractor {
        mix: Option<Vec<String>>,
        targets: Mutex<Vec<(String, ExtractMode)>>,
    }

    impl MixExtractor {
        fn new(mix: Option<&[&str]>) -> Arc<Self> {
            Arc::new(Self {
                mix: mix.map(|ids| ids.iter().map(|id| id.to_string()).collect()),
                targets: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Extractor for MixExtractor {
        fn name(&self) -> &'static str {
            "mix"
        }

        async fn search(&self, _: &str, _: usize) -> std::result::Result<Vec<RawEntry>, ExtractorError> {
            Ok(Vec::new())
        }

        async fn fetch(
            &self,
            target: &str,
            mode: ExtractMode,
        ) -> std::result::Result<Option<RawEntry>, ExtractorError> {
            self.targets.lock().unwrap().push((target.to_string(), mode));
            Ok(self.mix.as_ref().map(|ids| RawEntry {
                entries: Some(ids.iter().map(|id| Some(RawEntry::stub(id))).collect()),
                ..Default::default()
            }))
        }
    }

    fn exclude(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_urls() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
        assert_eq!(mix_url("abc"), "https://www.youtube.com/watch?v=abc&list=RDabc");
    }

    #[tokio::test]
    async fn test_list_candidates_uses_flat_mix() {
        let extractor = MixExtractor::new(Some(&["A", "B", "C"]));
        let walker = RecommendationWalker::new(extractor.clone());

        let set = walker.list_candidates("A").await.unwrap();
        assert_eq!(set.video_ids, vec!["A", "B", "C"]);
        assert_eq!(set.mix_id, "RDA");

        let targets = extractor.targets.lock().unwrap();
        assert_eq!(targets[0], (mix_url("A"), ExtractMode::Flat));
    }

    #[tokio::test]
    async fn test_list_candidates_is_capped() {
        let ids: Vec<String> = (0..40).map(|i| format!("v{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let walker = RecommendationWalker::new(MixExtractor::new(Some(&refs)));

        let set = walker.list_candidates("seed").await.unwrap();
        assert_eq!(set.video_ids.len(), MAX_CANDIDATES);
        assert_eq!(set.video_ids[0], "v0");
    }

    #[tokio::test]
    async fn test_empty_or_missing_mix_is_not_found() {
        let walker = RecommendationWalker::new(MixExtractor::new(Some(&[])));
        assert_eq!(walker.list_candidates("A").await.unwrap_err().code(), "NOT_FOUND");

        let walker = RecommendationWalker::new(MixExtractor::new(None));
        assert_eq!(walker.list_candidates("A").await.unwrap_err().code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_select_next_skips_seed_and_excluded() {
        let walker = RecommendationWalker::new(MixExtractor::new(Some(&["A", "B", "C"])));

        assert_eq!(walker.select_next("A", &exclude(&[])).await.unwrap(), "B");
        assert_eq!(walker.select_next("A", &exclude(&["A"])).await.unwrap(), "B");
        assert_eq!(walker.select_next("A", &exclude(&["B"])).await.unwrap(), "C");

        let err = walker.select_next("A", &exclude(&["A", "B", "C"])).await.unwrap_err();
        assert_eq!(err, YoutubeError::not_found("No next track found (all excluded)"));
    }

    #[test]
    fn test_first_unplayed_keeps_order() {
        let set = RecommendationSet {
            video_ids: vec!["X".into(), "Y".into(), "Z".into()],
            mix_id: "RDS".into(),
        };
        assert_eq!(first_unplayed(&set, "S", &exclude(&["X"])).as_deref(), Some("Y"));
        assert_eq!(first_unplayed(&set, "Y", &exclude(&["X", "Z"])), None);
    }
}
