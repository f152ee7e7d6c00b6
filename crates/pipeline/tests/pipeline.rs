//! End-to-end runs of the conversion pipeline against scripted fakes.

mod common;

use std::io::Read;
use std::time::Duration;

use assert_matches::assert_matches;
use jacport_core::event::JobEvent;
use jacport_core::role::FileRole;
use jacport_llm::GatewayError;

use common::{happy_answer, harness, harness_with, progress_pcts, terminal_count, ScriptedGenerator, StaticSource};

const THREE_FILES: &[&str] = &["app.py", "models.py", "routes/todos.py"];

// ---------------------------------------------------------------------------
// Test: a clean run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_run_completes_with_full_confidence() {
    let h = harness(ScriptedGenerator::happy(), StaticSource::with_files(THREE_FILES));

    let (job_id, events) = h.run(false).await;

    assert_eq!(terminal_count(&events), 1);
    let last = events.last().unwrap();
    assert_matches!(last, JobEvent::Complete(data) => {
        assert_eq!(data.total_files, 3);
        assert_eq!(data.avg_confidence, 0.95);
        assert_eq!(data.download_url, format!("/api/download/{job_id}"));
    });

    assert!(h.registry.preview(&job_id).await.is_some());
    let archive = h.registry.output(&job_id).await.expect("archive recorded");
    assert!(archive.starts_with(h.output_dir.path()));
    assert!(archive.exists());
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_with_one_terminal_event() {
    let h = harness(ScriptedGenerator::happy(), StaticSource::with_files(THREE_FILES));

    let (_, events) = h.run(false).await;

    let pcts = progress_pcts(&events);
    assert!(!pcts.is_empty());
    assert!(pcts.windows(2).all(|w| w[0] <= w[1]), "pcts went backwards: {pcts:?}");
    assert!(pcts.iter().all(|p| *p <= 100));
    assert!(events.last().unwrap().is_terminal());
    assert_eq!(terminal_count(&events), 1);
}

#[tokio::test]
async fn per_file_progress_carries_role_and_result() {
    let h = harness(ScriptedGenerator::happy(), StaticSource::with_files(THREE_FILES));

    let (_, events) = h.run(false).await;

    let with_role = events
        .iter()
        .filter(|e| matches!(e, JobEvent::Progress(d) if d.role == Some(FileRole::Model)))
        .count();
    let with_result = events
        .iter()
        .filter(|e| matches!(e, JobEvent::Progress(d) if d.confidence == Some(0.95) && d.validated == Some(true)))
        .count();
    assert_eq!(with_role, 3);
    assert_eq!(with_result, 3);
}

#[tokio::test]
async fn include_tests_and_file_limit_reach_the_source() {
    let h = harness_with(
        ScriptedGenerator::happy(),
        StaticSource::with_files(THREE_FILES),
        |config| config.max_files = 2,
    );

    let (_, events) = h.run(true).await;

    let (filter, limit) = h.source.seen_filter().expect("source was queried");
    assert!(filter.include_tests);
    assert_eq!(limit, 2);
    assert_matches!(events.last(), Some(JobEvent::Complete(data)) => {
        assert_eq!(data.total_files, 2);
    });
}

// ---------------------------------------------------------------------------
// Test: fatal failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_failure_emits_single_error_and_no_output() {
    let h = harness(ScriptedGenerator::happy(), StaticSource::failing());

    let (job_id, events) = h.run(false).await;

    assert_eq!(events.iter().filter(|e| matches!(e, JobEvent::Error(_))).count(), 1);
    assert_matches!(events.last(), Some(JobEvent::Error(data)) => {
        assert!(!data.recoverable);
        assert!(data.message.starts_with("GitHub error:"));
    });
    assert!(h.registry.preview(&job_id).await.is_none());
    assert!(h.registry.output(&job_id).await.is_none());
    assert_eq!(h.generator.calls().len(), 0);
}

#[tokio::test]
async fn empty_repository_is_an_error() {
    let h = harness(ScriptedGenerator::happy(), StaticSource::with_files(&[]));

    let (_, events) = h.run(false).await;

    assert_matches!(events.last(), Some(JobEvent::Error(data)) => {
        assert_eq!(data.message, "No Python files found.");
    });
    assert_eq!(terminal_count(&events), 1);
}

#[tokio::test]
async fn stage_timeout_fails_the_job() {
    let generator = ScriptedGenerator::happy().stalling("plan", Duration::from_secs(30));
    let h = harness_with(generator, StaticSource::with_files(THREE_FILES), |config| {
        config.stage_timeout = Some(Duration::from_millis(50));
    });

    let (job_id, events) = h.run(false).await;

    assert_matches!(events.last(), Some(JobEvent::Error(data)) => {
        assert!(data.message.contains("plan stage timed out"), "{}", data.message);
    });
    assert!(h.registry.output(&job_id).await.is_none());
}

#[tokio::test]
async fn panic_inside_a_stage_becomes_an_error_event() {
    let generator = ScriptedGenerator::new(|request, _| {
        if request.purpose == "plan" {
            panic!("plan exploded");
        }
        happy_answer(request)
    });
    let h = harness(generator, StaticSource::with_files(THREE_FILES));

    let (_, events) = h.run(false).await;

    assert_eq!(terminal_count(&events), 1);
    assert_matches!(events.last(), Some(JobEvent::Error(data)) => {
        assert_eq!(data.message, "Pipeline error: plan exploded");
        assert!(!data.recoverable);
    });
}

// ---------------------------------------------------------------------------
// Test: recoverable failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_plan_keeps_input_order_and_still_archives() {
    let generator = ScriptedGenerator::new(|request, _| match request.purpose {
        "plan" => Ok("this is not json".to_string()),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(THREE_FILES));

    let (job_id, events) = h.run(false).await;

    assert_matches!(events.last(), Some(JobEvent::Complete(_)));
    let preview = h.registry.preview(&job_id).await.unwrap();
    let paths: Vec<&str> = preview.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, THREE_FILES);
    assert!(h.registry.output(&job_id).await.is_some());
}

#[tokio::test]
async fn plan_order_moves_listed_files_first() {
    let generator = ScriptedGenerator::new(|request, _| match request.purpose {
        "plan" => Ok(r#"{"nodes": [], "order": ["routes/todos.py"]}"#.to_string()),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(THREE_FILES));

    let (job_id, _) = h.run(false).await;

    let preview = h.registry.preview(&job_id).await.unwrap();
    let paths: Vec<&str> = preview.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["routes/todos.py", "app.py", "models.py"]);
}

#[tokio::test]
async fn classification_failure_defaults_to_util() {
    let generator = ScriptedGenerator::new(|request, _| match request.purpose {
        "classify" => Err(GatewayError::Malformed("no text".into())),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(&["app.py"]));

    let (_, events) = h.run(false).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, JobEvent::Progress(d) if d.role == Some(FileRole::Util))));
    assert_matches!(events.last(), Some(JobEvent::Complete(_)));
}

#[tokio::test]
async fn success_on_retry_lowers_confidence() {
    let generator = ScriptedGenerator::new(|request, attempt| match (request.purpose, attempt) {
        ("convert", 0) => Err(GatewayError::Malformed("empty".into())),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(&["app.py"]));

    let (_, events) = h.run(false).await;

    assert_eq!(h.generator.calls_for("convert"), 2);
    let retry_prompt = &h
        .generator
        .calls()
        .into_iter()
        .filter(|c| c.purpose == "convert")
        .nth(1)
        .unwrap()
        .prompt;
    assert!(retry_prompt.contains("empty"));
    assert_matches!(events.last(), Some(JobEvent::Complete(data)) => {
        assert_eq!(data.avg_confidence, 0.87);
    });
}

#[tokio::test]
async fn exhausted_call_errors_fall_back_at_half_confidence() {
    let generator = ScriptedGenerator::new(|request, _| match request.purpose {
        "convert" => Err(GatewayError::Api {
            status: 529,
            body: "overloaded".into(),
        }),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(THREE_FILES));

    let (job_id, events) = h.run(false).await;

    assert_eq!(h.generator.calls_for("convert"), 6);
    assert_matches!(events.last(), Some(JobEvent::Complete(data)) => {
        assert_eq!(data.total_files, 3);
        assert_eq!(data.avg_confidence, 0.5);
    });
    let preview = h.registry.preview(&job_id).await.unwrap();
    assert!(preview.files.iter().all(|f| !f.validated));
    assert!(preview.files[0].converted.contains("manual review recommended"));
}

#[tokio::test]
async fn output_without_declarations_falls_back_without_retrying() {
    let generator = ScriptedGenerator::new(|request, attempt| match (request.purpose, attempt) {
        ("convert", 0) => Ok("print('still python')".to_string()),
        ("convert", _) => Err(GatewayError::Malformed("should not be called".into())),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(&["app.py"]));

    let (job_id, events) = h.run(false).await;

    assert_eq!(h.generator.calls_for("convert"), 1);
    assert_matches!(events.last(), Some(JobEvent::Complete(data)) => {
        assert_eq!(data.avg_confidence, 0.55);
    });
    let preview = h.registry.preview(&job_id).await.unwrap();
    assert!(!preview.files[0].validated);
}

#[tokio::test]
async fn late_acceptance_never_scores_below_zero() {
    let generator = ScriptedGenerator::new(|request, attempt| match request.purpose {
        "convert" if attempt < 12 => Err(GatewayError::Malformed("empty".into())),
        _ => happy_answer(request),
    });
    let h = harness_with(generator, StaticSource::with_files(&["app.py"]), |config| {
        config.max_retries = 12;
    });

    let (_, events) = h.run(false).await;

    assert_eq!(h.generator.calls_for("convert"), 13);
    assert_matches!(events.last(), Some(JobEvent::Complete(data)) => {
        assert_eq!(data.avg_confidence, 0.0);
    });
}

#[tokio::test]
async fn document_failures_use_fallbacks() {
    let generator = ScriptedGenerator::new(|request, _| match request.purpose {
        "readme" | "demo" => Err(GatewayError::Closed),
        _ => happy_answer(request),
    });
    let h = harness(generator, StaticSource::with_files(&["app.py"]));

    let (job_id, events) = h.run(false).await;

    assert_matches!(events.last(), Some(JobEvent::Complete(_)));
    let preview = h.registry.preview(&job_id).await.unwrap();
    assert!(preview.readme.starts_with("# todo-app - Converted to Jac"));
    assert!(preview.demo_script.contains("jac run main.jac"));
}

// ---------------------------------------------------------------------------
// Test: archive contents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_holds_converted_files_and_documents() {
    let h = harness(ScriptedGenerator::happy(), StaticSource::with_files(THREE_FILES));

    let (job_id, _) = h.run(false).await;

    let path = h.registry.output(&job_id).await.unwrap();
    let file = std::fs::File::open(path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        [".env.example", "README.md", "app.jac", "demo.sh", "models.jac", "routes/todos.jac"]
    );

    let mut body = String::new();
    zip.by_name("models.jac").unwrap().read_to_string(&mut body).unwrap();
    assert!(body.starts_with("node TodoNode"));
    assert!(!body.contains("```"));
}
