//! Scripted fakes for the text-generation and source-hosting seams.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jacport_core::event::JobEvent;
use jacport_core::types::JobId;
use jacport_events::{JobEmitter, JobRegistry, Next};
use jacport_github::{FileFilter, RemoteFile, SourceError, SourceFetcher};
use jacport_llm::{CompletionRequest, Gateway, GatewayConfig, GatewayError, TextGenerator};
use jacport_pipeline::prompts::FILE_LINE_PREFIX;
use jacport_pipeline::{ConversionJob, Pipeline, PipelineConfig};

pub const PLAN_JSON: &str = r#"{
  "nodes": [{"original_class": "Todo", "jac_node": "TodoNode", "fields": ["title: str"]}],
  "walkers": [{"original": "create_todo", "jac_walker": "CreateTodo", "purpose": "create"}],
  "edges": [],
  "order": []
}"#;

pub const JAC_OUTPUT: &str = "```jac\nnode TodoNode {\n    has title: str;\n}\n```";

type Handler = dyn Fn(&CompletionRequest, usize) -> Result<String, GatewayError> + Send + Sync;

/// Answers each call via `handler(request, attempt)` where `attempt` counts
/// earlier calls with the same purpose for the same file.
pub struct ScriptedGenerator {
    handler: Box<Handler>,
    attempts: Mutex<HashMap<(String, String), usize>>,
    calls: Mutex<Vec<CompletionRequest>>,
    delay: Option<(&'static str, Duration)>,
}

impl ScriptedGenerator {
    pub fn new(
        handler: impl Fn(&CompletionRequest, usize) -> Result<String, GatewayError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            attempts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Stall every call with `purpose` for `delay` before answering.
    pub fn stalling(mut self, purpose: &'static str, delay: Duration) -> Self {
        self.delay = Some((purpose, delay));
        self
    }

    /// Every call succeeds with well-formed output.
    pub fn happy() -> Self {
        Self::new(|request, _| happy_answer(request))
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, purpose: &str) -> usize {
        self.calls().iter().filter(|c| c.purpose == purpose).count()
    }
}

pub fn happy_answer(request: &CompletionRequest) -> Result<String, GatewayError> {
    Ok(match request.purpose {
        "classify" => "model".to_string(),
        "plan" => PLAN_JSON.to_string(),
        "convert" => JAC_OUTPUT.to_string(),
        "readme" => "# Converted project".to_string(),
        "demo" => "#!/bin/bash\njac run main.jac".to_string(),
        other => panic!("unexpected purpose {other}"),
    })
}

/// File named in a classify or convert prompt.
pub fn prompt_file(request: &CompletionRequest) -> Option<&str> {
    request
        .prompt
        .lines()
        .find_map(|line| line.strip_prefix(FILE_LINE_PREFIX))
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        let key = (
            request.purpose.to_string(),
            prompt_file(request).unwrap_or_default().to_string(),
        );
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(key).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };
        match self.delay {
            Some((purpose, delay)) if purpose == request.purpose => tokio::time::sleep(delay).await,
            _ => tokio::task::yield_now().await,
        }
        (self.handler)(request, attempt)
    }
}

/// Serves a fixed file list, or a fixed error.
pub struct StaticSource {
    files: Vec<RemoteFile>,
    fail: bool,
    seen_filter: Mutex<Option<(FileFilter, usize)>>,
}

impl StaticSource {
    pub fn with_files(paths: &[&str]) -> Self {
        Self {
            files: paths
                .iter()
                .map(|p| RemoteFile {
                    path: p.to_string(),
                    content: format!("# source of {p}\nclass Thing:\n    pass\n"),
                })
                .collect(),
            fail: false,
            seen_filter: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            fail: true,
            seen_filter: Mutex::new(None),
        }
    }

    pub fn seen_filter(&self) -> Option<(FileFilter, usize)> {
        *self.seen_filter.lock().unwrap()
    }
}

#[async_trait]
impl SourceFetcher for StaticSource {
    async fn fetch_files(
        &self,
        repo_url: &str,
        filter: &FileFilter,
        limit: usize,
    ) -> Result<Vec<RemoteFile>, SourceError> {
        *self.seen_filter.lock().unwrap() = Some((*filter, limit));
        if self.fail {
            return Err(SourceError::NotFound(repo_url.to_string()));
        }
        Ok(self.files.clone())
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub registry: Arc<JobRegistry>,
    pub generator: Arc<ScriptedGenerator>,
    pub source: Arc<StaticSource>,
    pub output_dir: tempfile::TempDir,
}

pub fn harness(generator: ScriptedGenerator, source: StaticSource) -> Harness {
    harness_with(generator, source, |_| {})
}

pub fn harness_with(
    generator: ScriptedGenerator,
    source: StaticSource,
    tweak: impl FnOnce(&mut PipelineConfig),
) -> Harness {
    let output_dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(generator);
    let source = Arc::new(source);
    let registry = Arc::new(JobRegistry::new(Duration::from_secs(3600)));
    let gateway = Arc::new(Gateway::new(
        generator.clone(),
        GatewayConfig {
            max_parallel: 2,
            call_timeout: None,
            default_model: "test-model".into(),
        },
    ));

    let mut config = PipelineConfig {
        max_files: 50,
        max_retries: 1,
        stage_timeout: None,
        output_dir: output_dir.path().to_path_buf(),
    };
    tweak(&mut config);

    let pipeline = Pipeline::new(gateway, source.clone(), Arc::clone(&registry), config);
    Harness {
        pipeline,
        registry,
        generator,
        source,
        output_dir,
    }
}

impl Harness {
    /// Register a job, run it to completion, and return everything it emitted.
    pub async fn run(&self, include_tests: bool) -> (JobId, Vec<JobEvent>) {
        let job_id = JobId::generate();
        let emitter: JobEmitter = self.registry.create(job_id.clone()).await;
        let job = ConversionJob {
            job_id: job_id.clone(),
            repo_url: "https://github.com/acme/todo-app".into(),
            include_tests,
            model: None,
        };
        self.pipeline.run(job, emitter).await;
        let events = drain(&self.registry, &job_id).await;
        (job_id, events)
    }
}

pub async fn drain(registry: &JobRegistry, job_id: &JobId) -> Vec<JobEvent> {
    let channel = registry.channel(job_id).await.expect("job registered");
    let mut subscription = channel.subscribe().expect("single subscriber");
    let mut events = Vec::new();
    while let Next::Event(event) = subscription.next(Duration::from_millis(20)).await {
        events.push(event);
    }
    events
}

pub fn terminal_count(events: &[JobEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

pub fn progress_pcts(events: &[JobEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Progress(data) => Some(data.pct),
            _ => None,
        })
        .collect()
}
