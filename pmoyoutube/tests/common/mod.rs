//! Scripted extractor shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use pmoyoutube::{ExtractMode, Extractor, ExtractorError, RawEntry, RawFormat};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extractor answering from in-memory fixtures and counting calls
#[derive(Default)]
pub struct FakeExtractor {
    search_results: Vec<RawEntry>,
    videos: HashMap<String, RawEntry>,
    mixes: HashMap<String, Vec<String>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Option<ExtractMode>)>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry returned by every search
    pub fn with_search_result(mut self, entry: RawEntry) -> Self {
        self.search_results.push(entry);
        self
    }

    /// Entry returned by a full extraction of its watch URL
    pub fn with_video(mut self, entry: RawEntry) -> Self {
        let id = entry.id.clone().unwrap_or_default();
        self.videos.insert(id, entry);
        self
    }

    /// Mix listed by a flat extraction seeded from `seed`
    pub fn with_mix(mut self, seed: &str, ids: &[&str]) -> Self {
        self.mixes
            .insert(seed.to_string(), ids.iter().map(|id| id.to_string()).collect());
        self
    }

    /// Make every call fail with `message`, or stop failing with `None`
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Search expressions and fetch targets, in call order
    pub fn requests(&self) -> Vec<(String, Option<ExtractMode>)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, target: &str, mode: Option<ExtractMode>) -> Result<(), ExtractorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((target.to_string(), mode));

        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(ExtractorError::Process {
                status: Some(1),
                message,
            }),
            None => Ok(()),
        }
    }
}

/// `v=` parameter of a watch URL
fn video_param(target: &str) -> &str {
    target
        .split_once("v=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        .unwrap_or(target)
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(
        &self,
        expression: &str,
        max_results: usize,
    ) -> Result<Vec<RawEntry>, ExtractorError> {
        self.record(expression, None)?;
        Ok(self.search_results.iter().take(max_results).cloned().collect())
    }

    async fn fetch(
        &self,
        target: &str,
        mode: ExtractMode,
    ) -> Result<Option<RawEntry>, ExtractorError> {
        self.record(target, Some(mode))?;
        let id = video_param(target);

        Ok(match mode {
            ExtractMode::Full => self.videos.get(id).cloned(),
            ExtractMode::Flat => self.mixes.get(id).map(|ids| RawEntry {
                kind: Some("playlist".to_string()),
                id: Some(format!("RD{id}")),
                entries: Some(ids.iter().map(|id| Some(RawEntry::stub(id))).collect()),
                ..Default::default()
            }),
        })
    }

    async fn version(&self) -> Option<String> {
        Some("fake-1.0".to_string())
    }
}

/// Fully extracted video with one Opus and one AAC rendition
pub fn video(id: &str, title: &str) -> RawEntry {
    RawEntry {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        uploader: Some("Uploader".to_string()),
        thumbnail: Some(format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")),
        duration: Some(200.5),
        formats: vec![
            RawFormat::new("mp4a.40.2", "none", &format!("https://audio/{id}.m4a")),
            RawFormat::new("opus", "none", &format!("https://audio/{id}.webm")),
        ],
        ..Default::default()
    }
}
