//! End-to-end pipeline scenarios against scripted upstream doubles.
//!
//! These tests verify:
//! 1. One verdict per extracted claim, in extraction order
//! 2. "No claims" short-circuit with an all-zero summary
//! 3. Per-claim failures stay contained in `Error` verdicts
//! 4. Only the first 8,000 characters reach the extraction prompt
//! 5. Bounded concurrency still reports verdicts in claim order

use async_trait::async_trait;
use claimcheck_core::{
    check_document, ClaimExtractor, ClaimVerifier, CompletionRequest, DocumentError,
    DocumentLoader, EvidenceItem, EvidenceRetriever, LlmError, NoopSink, PlainTextLoader,
    ProgressSink, RunOutcome, SearchError, TextGenerator, Verdict, VerdictStatus,
    VerificationPipeline, VerificationSummary,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EXTRACTOR_MARKER: &str = "claim extractor";

// ============================================================================
// Doubles
// ============================================================================

/// Answers extraction prompts with a fixed reply and classification prompts
/// by looking the claim up in a table.
struct ScriptedGenerator {
    extraction_reply: String,
    classify: fn(&str) -> Result<String, LlmError>,
    extraction_prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(extraction_reply: &str, classify: fn(&str) -> Result<String, LlmError>) -> Arc<Self> {
        Arc::new(Self {
            extraction_reply: extraction_reply.to_string(),
            classify,
            extraction_prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        if request.system.contains(EXTRACTOR_MARKER) {
            self.extraction_prompts
                .lock()
                .unwrap()
                .push(request.user.clone());
            return Ok(self.extraction_reply.clone());
        }
        (self.classify)(&request.user)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn classify_by_keyword(prompt: &str) -> Result<String, LlmError> {
    let status = if prompt.contains("Claim: Revenue") {
        "Verified"
    } else if prompt.contains("Claim: Headcount") {
        "Inaccurate"
    } else {
        "False"
    };
    Ok(format!(
        "```json\n{{\"status\": \"{}\", \"explanation\": \"scripted\", \"sources\": [\"https://evidence.example\"]}}\n```",
        status
    ))
}

/// Fails for queries containing "outage", sleeps per query otherwise.
struct ScriptedRetriever {
    delays: Vec<(&'static str, u64)>,
}

impl ScriptedRetriever {
    fn instant() -> Arc<Self> {
        Arc::new(Self { delays: Vec::new() })
    }
}

#[async_trait]
impl EvidenceRetriever for ScriptedRetriever {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<EvidenceItem>, SearchError> {
        if let Some((_, ms)) = self.delays.iter().find(|(q, _)| query.contains(q)) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if query.contains("outage") {
            return Err(SearchError::Api {
                code: 503,
                message: "network unreachable".to_string(),
            });
        }
        Ok(vec![EvidenceItem::new("https://evidence.example", "snippet")]
            .into_iter()
            .take(max_results)
            .collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Extracted(usize),
    ExtractionError,
    Progress(usize, usize),
    Verdict(String),
    Complete(VerificationSummary),
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_claims_extracted(&self, count: usize) {
        self.events.lock().unwrap().push(Event::Extracted(count));
    }

    fn on_extraction_error(&self, _message: &str) {
        self.events.lock().unwrap().push(Event::ExtractionError);
    }

    fn on_progress(&self, index: usize, total: usize) {
        self.events.lock().unwrap().push(Event::Progress(index, total));
    }

    fn on_verdict(&self, verdict: &Verdict) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Verdict(verdict.claim.to_string()));
    }

    fn on_complete(&self, _verdicts: &[Verdict], summary: &VerificationSummary) {
        self.events.lock().unwrap().push(Event::Complete(*summary));
    }
}

fn pipeline(
    generator: Arc<dyn TextGenerator>,
    retriever: Arc<dyn EvidenceRetriever>,
) -> VerificationPipeline {
    VerificationPipeline::new(
        ClaimExtractor::new(generator.clone()),
        ClaimVerifier::new(retriever, generator),
    )
}

fn claims_json(claims: &[&str]) -> String {
    let entries: Vec<serde_json::Value> = claims
        .iter()
        .map(|c| serde_json::json!({ "claim": c }))
        .collect();
    serde_json::to_string(&entries).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_claim_document_yields_matching_verdict() {
    let generator = ScriptedGenerator::new(
        &claims_json(&["Revenue grew 40% in 2023"]),
        classify_by_keyword,
    );
    let sink = RecordingSink::default();

    let outcome = pipeline(generator, ScriptedRetriever::instant())
        .run("Our annual report: Revenue grew 40% in 2023.", &sink)
        .await;

    let verdicts = outcome.verdicts();
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].claim.as_str(), "Revenue grew 40% in 2023");
    assert_eq!(verdicts[0].status, VerdictStatus::Verified);
    assert_eq!(verdicts[0].sources, vec!["https://evidence.example".to_string()]);

    let summary = outcome.summary();
    assert_eq!(
        sink.events(),
        vec![
            Event::Extracted(1),
            Event::Verdict("Revenue grew 40% in 2023".to_string()),
            Event::Progress(1, 1),
            Event::Complete(summary),
        ]
    );
}

#[tokio::test]
async fn test_document_without_claims_short_circuits() {
    let generator = ScriptedGenerator::new("[]", classify_by_keyword);
    let sink = RecordingSink::default();

    let outcome = pipeline(generator, ScriptedRetriever::instant())
        .run("We value teamwork and integrity.", &sink)
        .await;

    assert!(outcome.is_no_claims());
    assert!(outcome.verdicts().is_empty());
    assert_eq!(outcome.summary(), VerificationSummary::default());
    assert_eq!(sink.events(), vec![Event::Extracted(0)]);
    match outcome {
        RunOutcome::NoClaims {
            extraction_error, ..
        } => assert!(extraction_error.is_none()),
        RunOutcome::Verified(_) => panic!("expected no claims"),
    }
}

#[tokio::test]
async fn test_malformed_extraction_is_reported_not_raised() {
    let generator = ScriptedGenerator::new("I found these claims: revenue, headcount", classify_by_keyword);
    let sink = RecordingSink::default();

    let outcome = pipeline(generator, ScriptedRetriever::instant())
        .run("Revenue grew 40% in 2023.", &sink)
        .await;

    assert!(outcome.is_no_claims());
    assert_eq!(sink.events(), vec![Event::ExtractionError, Event::Extracted(0)]);
    match outcome {
        RunOutcome::NoClaims {
            extraction_error: Some(message),
            ..
        } => assert!(message.contains("malformed claim list"), "got: {}", message),
        other => panic!("expected extraction error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retriever_failure_is_contained_to_its_claim() {
    let generator = ScriptedGenerator::new(
        &claims_json(&[
            "Revenue grew 40% in 2023",
            "The outage lasted 3 days",
            "Headcount reached 1,200",
        ]),
        classify_by_keyword,
    );

    let outcome = pipeline(generator, ScriptedRetriever::instant())
        .run("doc", &NoopSink)
        .await;

    let statuses: Vec<VerdictStatus> = outcome.verdicts().iter().map(|v| v.status).collect();
    assert_eq!(
        statuses,
        vec![
            VerdictStatus::Verified,
            VerdictStatus::Error,
            VerdictStatus::Inaccurate
        ]
    );

    let failed = &outcome.verdicts()[1];
    assert_eq!(failed.claim.as_str(), "The outage lasted 3 days");
    assert!(failed.sources.is_empty());
    assert!(failed.explanation.starts_with("Could not verify: "));

    let s = outcome.summary();
    assert_eq!(s.total, 3);
    assert_eq!(s.error_count, 1);
    assert_eq!(
        s.verified_count + s.inaccurate_count + s.false_count + s.error_count,
        s.total
    );
}

#[tokio::test]
async fn test_classifier_outage_yields_error_verdicts_for_every_claim() {
    fn unavailable(_: &str) -> Result<String, LlmError> {
        Err(LlmError::RetryExhausted {
            attempts: 3,
            last: "API error (500): boom".to_string(),
        })
    }

    let generator = ScriptedGenerator::new(&claims_json(&["A is 1", "B is 2"]), unavailable);
    let outcome = pipeline(generator, ScriptedRetriever::instant())
        .run("doc", &NoopSink)
        .await;

    assert_eq!(outcome.verdicts().len(), 2);
    assert!(outcome
        .verdicts()
        .iter()
        .all(|v| v.status == VerdictStatus::Error));
    assert_eq!(outcome.summary().error_count, 2);
}

#[tokio::test]
async fn test_only_first_8000_characters_reach_extraction() {
    let generator = ScriptedGenerator::new(&claims_json(&[]), classify_by_keyword);
    let head = "Revenue grew 40% in 2023. ".repeat(400);
    let head: String = head.chars().take(8000).collect();
    let tail = "Headcount reached 1,200. ".repeat(480);
    let document = format!("{}{}", head, tail);
    assert_eq!(document.chars().count(), 8000 + tail.chars().count());

    pipeline(generator.clone(), ScriptedRetriever::instant())
        .run(&document, &NoopSink)
        .await;

    let prompts = generator.extraction_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with(&head));
    assert!(!prompts[0].contains("Headcount"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_verification_preserves_claim_order() {
    let generator = ScriptedGenerator::new(
        &claims_json(&["Revenue slow", "Headcount medium", "Churn fast"]),
        classify_by_keyword,
    );
    let retriever = Arc::new(ScriptedRetriever {
        delays: vec![("slow", 300), ("medium", 200), ("fast", 100)],
    });
    let sink = RecordingSink::default();

    let outcome = pipeline(generator, retriever)
        .with_concurrency(3)
        .run("doc", &sink)
        .await;

    let claims: Vec<&str> = outcome.verdicts().iter().map(|v| v.claim.as_str()).collect();
    assert_eq!(claims, vec!["Revenue slow", "Headcount medium", "Churn fast"]);

    let progress: Vec<Event> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Progress(..)))
        .collect();
    assert_eq!(
        progress,
        vec![
            Event::Progress(1, 3),
            Event::Progress(2, 3),
            Event::Progress(3, 3)
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_can_be_spawned_on_the_runtime() {
    let generator = ScriptedGenerator::new(
        &claims_json(&["Revenue grew 40% in 2023", "Headcount reached 1,200"]),
        classify_by_keyword,
    );
    let pipeline = Arc::new(pipeline(generator, ScriptedRetriever::instant()).with_concurrency(2));

    let handle = tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move { pipeline.run("doc", &NoopSink).await }
    });
    let outcome = handle.await.expect("spawned run should finish");
    assert_eq!(outcome.verdicts().len(), 2);

    let upload = tokio::spawn(async move {
        check_document(
            &pipeline,
            Arc::new(PlainTextLoader),
            b"Revenue grew 40% in 2023.",
            Some("report.txt"),
            &NoopSink,
        )
        .await
    });
    let check = upload.await.unwrap().expect("document should load");
    assert_eq!(check.outcome.verdicts().len(), 2);
}

// ============================================================================
// Uploaded documents
// ============================================================================

/// Remembers the path it was given, then fails.
#[derive(Default)]
struct BrokenLoader {
    seen: Mutex<Option<PathBuf>>,
}

impl DocumentLoader for BrokenLoader {
    fn load(&self, path: &Path) -> Result<String, DocumentError> {
        *self.seen.lock().unwrap() = Some(path.to_path_buf());
        Err(DocumentError::NotText)
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn test_failed_text_extraction_removes_staged_upload() {
    let generator = ScriptedGenerator::new(&claims_json(&["Revenue grew 40% in 2023"]), classify_by_keyword);
    let loader = Arc::new(BrokenLoader::default());

    let result = check_document(
        &pipeline(generator.clone(), ScriptedRetriever::instant()),
        loader.clone(),
        b"%PDF-1.7 ...",
        Some("report.pdf"),
        &NoopSink,
    )
    .await;

    assert!(matches!(result, Err(DocumentError::NotText)));
    let staged = loader.seen.lock().unwrap().clone().expect("loader was called");
    assert!(!staged.exists(), "staged upload must be deleted");
    assert!(generator.extraction_prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_check_document_returns_preview_and_verdicts() {
    let generator = ScriptedGenerator::new(&claims_json(&["Revenue grew 40% in 2023"]), classify_by_keyword);
    let body = format!("Revenue grew 40% in 2023.\x0c{}", "filler ".repeat(200));

    let check = check_document(
        &pipeline(generator, ScriptedRetriever::instant()),
        Arc::new(PlainTextLoader),
        body.as_bytes(),
        Some("report.txt"),
        &NoopSink,
    )
    .await
    .expect("document should load");

    assert_eq!(check.preview.chars().count(), 500);
    assert!(check.preview.starts_with("Revenue grew 40% in 2023. filler"));
    assert_eq!(check.outcome.verdicts().len(), 1);
}
