//! # Recommendation Orchestrator
//!
//! This module coordinates one recommendation run:
//! 1. Ask the language model for a keyword matching the mood
//! 2. Parse the completion into a single keyword
//! 3. Run the film and music branches concurrently (tokio::join!)
//!    - film: search → top K → concurrent detail lookups → normalize
//!    - music: search → top K → normalize
//! 4. Bundle keyword and branch outcomes into a `PipelineResult`
//!
//! Completion strictly precedes search, and search strictly precedes every
//! detail lookup. Each upstream call is bounded by the configured timeout.
//! Nothing is retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::generation::RequestToken;
use domain::{
    AppConfig, CandidateItem, CatalogDetailClient, CatalogSearchClient, CompletionClient, FanOutPolicy,
    FilmResult, Keyword, Mood, TrackHit, TrackResult,
};
use llm_client::OpenAiClient;
use pipeline::{
    BranchOutcome, PipelineError, PipelineResult, PromptSettings, ResultNormalizer, Stage, bounded,
    build_keyword_request, fetch_details, parse_keyword, select_top_k,
};
use sources::{DeezerSource, TmdbSource};

/// Film search capability as held by the orchestrator
pub type FilmSearch = Arc<dyn CatalogSearchClient<Hit = CandidateItem>>;

/// Music search capability as held by the orchestrator
pub type MusicSearch = Arc<dyn CatalogSearchClient<Hit = TrackHit>>;

/// Main orchestrator that runs the recommendation pipeline
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    completion: Arc<dyn CompletionClient>,
    film_search: FilmSearch,
    film_detail: Arc<dyn CatalogDetailClient>,
    music_search: Option<MusicSearch>,
    prompt: PromptSettings,
    normalizer: ResultNormalizer,
    top_k: usize,
    fan_out: FanOutPolicy,
    call_timeout: Duration,
}

impl RecommendationOrchestrator {
    /// Create an orchestrator over explicit clients, with defaults for
    /// everything else (K = 3, all-or-nothing fan-out, 10 s timeout, no music)
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        film_search: FilmSearch,
        film_detail: Arc<dyn CatalogDetailClient>,
    ) -> Self {
        Self {
            completion,
            film_search,
            film_detail,
            music_search: None,
            prompt: PromptSettings::default(),
            normalizer: ResultNormalizer::new(domain::config::DEFAULT_IMAGE_BASE_URL),
            top_k: 3,
            fan_out: FanOutPolicy::AllOrNothing,
            call_timeout: Duration::from_secs(10),
        }
    }

    /// Wire the HTTP clients described by a validated config
    pub fn from_config(config: &AppConfig) -> Self {
        let completion = Arc::new(OpenAiClient::from_config(&config.completion));
        let tmdb = Arc::new(TmdbSource::from_config(&config.film));

        let mut orchestrator = Self::new(completion, tmdb.clone(), tmdb)
            .with_prompt(PromptSettings::from(&config.completion))
            .with_normalizer(ResultNormalizer::new(&config.film.image_base_url))
            .with_top_k(config.top_k)
            .with_fan_out(config.fan_out)
            .with_timeout(config.request_timeout);

        if config.music.enabled {
            orchestrator = orchestrator.with_music(Arc::new(DeezerSource::from_config(&config.music)));
        }
        orchestrator
    }

    /// Enable the music branch
    pub fn with_music(mut self, music_search: MusicSearch) -> Self {
        self.music_search = Some(music_search);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptSettings) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_normalizer(mut self, normalizer: ResultNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Number of candidates enriched per branch (clamped to at least 1)
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_fan_out(mut self, fan_out: FanOutPolicy) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Upper bound for each individual upstream call
    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn music_enabled(&self) -> bool {
        self.music_search.is_some()
    }

    /// Run the pipeline once, outside of any session
    pub async fn run(&self, mood: &Mood) -> Result<PipelineResult, PipelineError> {
        self.run_as(mood, &RequestToken::detached()).await
    }

    /// Run the pipeline on behalf of `token`.
    ///
    /// Stops with `PipelineError::Superseded` at the next step boundary once
    /// a newer request has started. Calls already in flight are not cancelled.
    ///
    /// # Returns
    /// * `Ok(PipelineResult)` - at least one branch did not fail
    /// * `Err` - the completion failed, or every enabled branch failed
    ///   (the film branch's error is reported)
    pub async fn run_as(&self, mood: &Mood, token: &RequestToken) -> Result<PipelineResult, PipelineError> {
        let start_time = Instant::now();

        let keyword = self.derive_keyword(mood).await?;
        info!("Derived keyword {:?} for request {}", keyword.as_str(), token.id());

        ensure_current(token, Stage::FilmSearch)?;

        let (films, music) = tokio::join!(self.film_branch(&keyword, token), async {
            match &self.music_search {
                Some(search) => Some(self.music_branch(search.as_ref(), &keyword).await),
                None => None,
            }
        });

        if let BranchOutcome::Failed(error @ PipelineError::Superseded { .. }) = &films {
            return Err(error.clone());
        }

        let music_failed = music.as_ref().is_none_or(|m| m.error().is_some());
        if let BranchOutcome::Failed(error) = &films {
            if music_failed {
                warn!("Every branch failed for request {}: {}", token.id(), error);
                return Err(error.clone());
            }
        }

        info!(
            "Request {} finished in {:.2?}: {} films, {} tracks",
            token.id(),
            start_time.elapsed(),
            films.items().len(),
            music.as_ref().map(|m| m.items().len()).unwrap_or(0)
        );

        Ok(PipelineResult { keyword, films, music })
    }

    /// Ask the model for a keyword and parse its reply
    async fn derive_keyword(&self, mood: &Mood) -> Result<Keyword, PipelineError> {
        let request = build_keyword_request(mood.as_str(), &self.prompt);

        let raw = bounded(self.call_timeout, self.completion.complete(&request))
            .await
            .map_err(|e| PipelineError::at(Stage::Completion, e))?;
        debug!("Completion returned {:?}", raw);

        parse_keyword(&raw).map_err(|e| PipelineError::at(Stage::Completion, e))
    }

    /// Search films, then enrich the top K concurrently
    async fn film_branch(&self, keyword: &Keyword, token: &RequestToken) -> BranchOutcome<FilmResult> {
        let hits = match bounded(self.call_timeout, self.film_search.search(keyword.as_str())).await {
            Ok(hits) => hits,
            Err(e) => return BranchOutcome::Failed(PipelineError::at(Stage::FilmSearch, e)),
        };

        if hits.is_empty() {
            info!("Film search for {:?} found nothing", keyword.as_str());
            return BranchOutcome::NoMatch;
        }

        let candidates = select_top_k(hits, self.top_k);
        info!("Selected {} film candidates", candidates.len());

        if let Err(error) = ensure_current(token, Stage::FilmDetail) {
            return BranchOutcome::Failed(error);
        }

        match fetch_details(self.film_detail.as_ref(), &candidates, self.fan_out, self.call_timeout).await {
            Ok(batch) => BranchOutcome::Found {
                items: batch
                    .details
                    .into_iter()
                    .map(|detail| self.normalizer.film(detail))
                    .collect(),
                failed: batch.failed,
            },
            Err(error) => {
                warn!("Film details failed: {}", error);
                BranchOutcome::Failed(error)
            }
        }
    }

    /// Search tracks and keep the top K
    async fn music_branch(
        &self,
        search: &dyn CatalogSearchClient<Hit = TrackHit>,
        keyword: &Keyword,
    ) -> BranchOutcome<TrackResult> {
        match bounded(self.call_timeout, search.search(keyword.as_str())).await {
            Ok(hits) if hits.is_empty() => {
                info!("Music search for {:?} found nothing", keyword.as_str());
                BranchOutcome::NoMatch
            }
            Ok(hits) => BranchOutcome::found(
                select_top_k(hits, self.top_k)
                    .into_iter()
                    .map(|hit| self.normalizer.track(hit))
                    .collect(),
            ),
            Err(e) => {
                let error = PipelineError::at(Stage::MusicSearch, e);
                warn!("Music branch failed: {}", error);
                BranchOutcome::Failed(error)
            }
        }
    }
}

fn ensure_current(token: &RequestToken, next: Stage) -> Result<(), PipelineError> {
    if token.is_current() {
        Ok(())
    } else {
        debug!("Request {} superseded before {}", token.id(), next);
        Err(PipelineError::Superseded { stage: next })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::generation::Generation;
    use async_trait::async_trait;
    use domain::{ClientError, ClientResult, CompletionRequest, FilmDetail, FilmId};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ============================================================================
    // Mock Clients
    // ============================================================================

    /// Completion client that replies from a script, optionally after a delay
    pub(crate) struct ScriptedCompletion {
        /// Mood fragment → (reply, delay)
        scripted: Vec<(String, String, Duration)>,
        fallback: ClientResult<String>,
        pub(crate) requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        pub(crate) fn always(reply: ClientResult<String>) -> Self {
            Self {
                scripted: Vec::new(),
                fallback: reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Reply `reply` after `delay` whenever the prompt mentions `mood`
        pub(crate) fn on(mut self, mood: &str, reply: &str, delay: Duration) -> Self {
            self.scripted.push((mood.to_string(), reply.to_string(), delay));
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> ClientResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();

            match self.scripted.iter().find(|(mood, _, _)| prompt.contains(mood.as_str())) {
                Some((_, reply, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(reply.clone())
                }
                None => self.fallback.clone(),
            }
        }
    }

    /// Film catalog keyed by query; details answer slower for earlier ids
    #[derive(Default)]
    pub(crate) struct ScriptedFilms {
        results: HashMap<String, Vec<CandidateItem>>,
        details: HashMap<FilmId, FilmDetail>,
        search_error: Option<ClientError>,
        failing_details: Vec<FilmId>,
        pub(crate) searched: Mutex<Vec<String>>,
        pub(crate) detail_calls: AtomicUsize,
    }

    impl ScriptedFilms {
        pub(crate) fn with_films(mut self, query: &str, films: &[(FilmId, &str)]) -> Self {
            let hits = films
                .iter()
                .map(|(id, title)| CandidateItem::new(*id, *title, 1.0))
                .collect();
            self.results.insert(query.to_string(), hits);
            for (id, title) in films {
                self.details.insert(*id, film_detail(*id, title));
            }
            self
        }

        fn failing_search(mut self, error: ClientError) -> Self {
            self.search_error = Some(error);
            self
        }

        fn failing_detail(mut self, id: FilmId) -> Self {
            self.failing_details.push(id);
            self
        }

        pub(crate) fn detail_calls(&self) -> usize {
            self.detail_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn search_calls(&self) -> usize {
            self.searched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CatalogSearchClient for ScriptedFilms {
        type Hit = CandidateItem;

        async fn search(&self, query: &str) -> ClientResult<Vec<CandidateItem>> {
            self.searched.lock().unwrap().push(query.to_string());
            if let Some(error) = &self.search_error {
                return Err(error.clone());
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl CatalogDetailClient for ScriptedFilms {
        async fn detail(&self, id: FilmId) -> ClientResult<FilmDetail> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            // Reverse the natural order: lower ids resolve last
            tokio::time::sleep(Duration::from_millis(1000 - (id % 1000))).await;
            if self.failing_details.contains(&id) {
                return Err(ClientError::Transport(format!("film {} unavailable", id)));
            }
            self.details
                .get(&id)
                .cloned()
                .ok_or_else(|| ClientError::Status { status: 404, body: String::new() })
        }
    }

    /// Music catalog with a fixed answer
    struct ScriptedMusic {
        reply: ClientResult<Vec<TrackHit>>,
    }

    #[async_trait]
    impl CatalogSearchClient for ScriptedMusic {
        type Hit = TrackHit;

        async fn search(&self, _query: &str) -> ClientResult<Vec<TrackHit>> {
            self.reply.clone()
        }
    }

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    pub(crate) fn film_detail(id: FilmId, title: &str) -> FilmDetail {
        FilmDetail {
            id,
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", id)),
            genres: vec!["Drama".into(), "Comedy".into(), "Family".into(), "Music".into()],
            cast: vec!["A".into(), "B".into(), "C".into(), "D".into(), "E".into()],
            vote_average: 7.5,
            overview: None,
            release_date: None,
        }
    }

    fn comfort_films() -> ScriptedFilms {
        ScriptedFilms::default().with_films(
            "comfort",
            &[(101, "Paddington"), (102, "Chef"), (103, "Amélie"), (104, "Up")],
        )
    }

    fn mood(text: &str) -> Mood {
        Mood::new(text).unwrap()
    }

    fn track(id: u64) -> TrackHit {
        TrackHit {
            id,
            title: format!("Track {}", id),
            artist: "Artist".to_string(),
            cover_url: Some("https://cover".to_string()),
            preview_url: Some(String::new()),
        }
    }

    fn orchestrator(
        completion: Arc<ScriptedCompletion>,
        films: Arc<ScriptedFilms>,
    ) -> RecommendationOrchestrator {
        RecommendationOrchestrator::new(completion, films.clone(), films)
            .with_normalizer(ResultNormalizer::new("https://image.tmdb.org/t/p/w500"))
    }

    // ============================================================================
    // End-to-end scenarios
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_happy_mood_returns_three_films_in_search_order() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films());

        let result = orchestrator(completion.clone(), films.clone())
            .run(&mood("행복"))
            .await
            .expect("run should succeed");

        assert_eq!(result.keyword.as_str(), "comfort");
        let titles: Vec<_> = result.films.items().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Paddington", "Chef", "Amélie"]);
        assert_eq!(films.detail_calls(), 3, "only the top 3 are enriched");
        assert!(result.music.is_none());

        let first = &result.films.items()[0];
        assert_eq!(first.cast_line(), "A, B, C");
        assert_eq!(first.genres_line(), "Drama, Comedy, Family");
        assert_eq!(
            first.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/101.jpg")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_keyword_is_no_match_without_detail_calls() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("xyzzynomatch".into())));
        let films = Arc::new(comfort_films());

        let result = orchestrator(completion, films.clone())
            .run(&mood("분노"))
            .await
            .expect("no match is not an error");

        assert!(result.is_no_match());
        assert!(result.films.is_no_match());
        assert!(result.films.items().is_empty());
        assert_eq!(films.detail_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fault_stops_before_search() {
        let completion = Arc::new(ScriptedCompletion::always(Err(ClientError::Transport(
            "connection reset".into(),
        ))));
        let films = Arc::new(comfort_films());

        let err = orchestrator(completion, films.clone())
            .run(&mood("행복"))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.stage(), Stage::Completion);
        assert_eq!(films.search_calls(), 0);
        assert_eq!(films.detail_calls(), 0);
    }

    // ============================================================================
    // Unit Tests: keyword derivation
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_blank_completion_is_a_decode_error() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("  \n ".into())));
        let films = Arc::new(comfort_films());

        let err = orchestrator(completion, films.clone())
            .run(&mood("행복"))
            .await
            .unwrap_err();

        assert!(err.is_decode());
        assert_eq!(err.stage(), Stage::Completion);
        assert_eq!(films.search_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_uses_first_line_of_completion() {
        let completion = Arc::new(ScriptedCompletion::always(Ok(
            " comfort\nBecause it feels warm.".into(),
        )));
        let films = Arc::new(comfort_films());

        orchestrator(completion.clone(), films.clone())
            .run(&mood("행복"))
            .await
            .unwrap();

        assert_eq!(*films.searched.lock().unwrap(), vec!["comfort".to_string()]);

        let requests = completion.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].messages[0].content.contains("행복"));
        assert_eq!(requests[0].max_tokens, 15);
    }

    // ============================================================================
    // Unit Tests: fan-out and top K
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_single_result_variant() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films());

        let result = orchestrator(completion, films.clone())
            .with_top_k(1)
            .run(&mood("행복"))
            .await
            .unwrap();

        assert_eq!(result.films.items().len(), 1);
        assert_eq!(result.films.items()[0].id, 101);
        assert_eq!(films.detail_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failed_detail_fails_film_branch() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films().failing_detail(102));

        let err = orchestrator(completion, films)
            .run(&mood("행복"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::FilmDetail);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_policy_reports_failed_candidates() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films().failing_detail(102));

        let result = orchestrator(completion, films)
            .with_fan_out(FanOutPolicy::Partial)
            .run(&mood("행복"))
            .await
            .unwrap();

        match &result.films {
            BranchOutcome::Found { items, failed } => {
                let ids: Vec<_> = items.iter().map(|f| f.id).collect();
                assert_eq!(ids, vec![101, 103]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].id, 102);
            }
            other => panic!("expected films, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_detail_times_out() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films());

        let err = orchestrator(completion, films)
            .with_timeout(Duration::from_millis(500))
            .run(&mood("행복"))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert_eq!(err.stage(), Stage::FilmDetail);
    }

    // ============================================================================
    // Unit Tests: music branch
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_music_branch_runs_alongside_films() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films());
        let music = Arc::new(ScriptedMusic {
            reply: Ok((1..=5).map(track).collect()),
        });

        let result = orchestrator(completion, films)
            .with_music(music)
            .run(&mood("행복"))
            .await
            .unwrap();

        assert_eq!(result.films.items().len(), 3);
        let track_ids: Vec<_> = result.tracks().iter().map(|t| t.id).collect();
        assert_eq!(track_ids, vec![1, 2, 3]);
        assert_eq!(result.tracks()[0].preview_url, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_music_failure_does_not_abort_films() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films());
        let music = Arc::new(ScriptedMusic {
            reply: Err(ClientError::Decode("missing data".into())),
        });

        let result = orchestrator(completion, films)
            .with_music(music)
            .run(&mood("행복"))
            .await
            .unwrap();

        assert_eq!(result.films.items().len(), 3);
        let music_error = result.music.as_ref().and_then(|m| m.error()).unwrap();
        assert_eq!(music_error.stage(), Stage::MusicSearch);
        assert!(music_error.is_decode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_film_failure_does_not_abort_music() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films().failing_search(ClientError::Transport("down".into())));
        let music = Arc::new(ScriptedMusic {
            reply: Ok(vec![track(7)]),
        });

        let result = orchestrator(completion, films.clone())
            .with_music(music)
            .run(&mood("행복"))
            .await
            .unwrap();

        assert_eq!(result.films.error().unwrap().stage(), Stage::FilmSearch);
        assert_eq!(result.tracks().len(), 1);
        assert_eq!(films.detail_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_branches_failing_is_an_error() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films().failing_search(ClientError::Transport("down".into())));
        let music = Arc::new(ScriptedMusic {
            reply: Err(ClientError::Transport("down".into())),
        });

        let err = orchestrator(completion, films)
            .with_music(music)
            .run(&mood("행복"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::FilmSearch);
    }

    // ============================================================================
    // Unit Tests: supersession
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_stale_token_stops_before_search() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("comfort".into())));
        let films = Arc::new(comfort_films());
        let generation = Generation::new();

        let stale = generation.begin();
        let _newer = generation.begin();

        let err = orchestrator(completion, films.clone())
            .run_as(&mood("행복"), &stale)
            .await
            .unwrap_err();

        assert_eq!(err, PipelineError::Superseded { stage: Stage::FilmSearch });
        assert_eq!(films.search_calls(), 0);
        assert_eq!(films.detail_calls(), 0);
    }

    #[test]
    fn test_builder_clamps_top_k() {
        let completion = Arc::new(ScriptedCompletion::always(Ok("x".into())));
        let films = Arc::new(ScriptedFilms::default());
        let orchestrator = orchestrator(completion, films).with_top_k(0);
        assert_eq!(orchestrator.top_k(), 1);
        assert!(!orchestrator.music_enabled());
    }
}
