//! Prompt builders for every text-generation call site.

use jacport_core::conversion::SourceFile;
use serde::Serialize;

/// Characters of source shown to the role classifier.
const CLASSIFY_SNIPPET_CHARS: usize = 1500;

/// Characters of each file shown to the planner.
const PLAN_SNIPPET_CHARS: usize = 300;

/// Characters of the plan passed as conversion context.
const PLAN_CONTEXT_CHARS: usize = 800;

/// Prefix of the line naming the file in a conversion prompt.
pub const FILE_LINE_PREFIX: &str = "File: ";

/// First `max` characters of `text`, on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn classify_role(path: &str, source: &str) -> String {
    format!(
        "You are an expert Python architect.\n\
         Classify the role of this Python file as exactly one of: model, controller, service, util.\n\
         \n\
         - model: data structures, ORM models, schemas, dataclasses\n\
         - controller: HTTP routes and request/response handling\n\
         - service: business logic, orchestration, external API calls\n\
         - util: helpers, constants, configuration, shared functions\n\
         \n\
         {FILE_LINE_PREFIX}{path}\n\
         \n\
         Source code:\n```python\n{}\n```\n\
         \n\
         Respond with ONLY one word: model, controller, service, or util.",
        truncate(source, CLASSIFY_SNIPPET_CHARS)
    )
}

#[derive(Serialize)]
struct FileSummary<'a> {
    path: &'a str,
    role: &'a str,
    snippet: &'a str,
}

pub fn mapping_plan(repo_name: &str, files: &[SourceFile]) -> String {
    let summaries: Vec<FileSummary<'_>> = files
        .iter()
        .map(|f| FileSummary {
            path: &f.path,
            role: f.role.as_str(),
            snippet: truncate(&f.content, PLAN_SNIPPET_CHARS),
        })
        .collect();
    let summaries = serde_json::to_string_pretty(&summaries).unwrap_or_default();

    format!(
        "You are a Jac/Jaseci object-spatial architect.\n\
         Given these Python files from the repository \"{repo_name}\", produce a JSON mapping plan \
         for converting them to idiomatic Jac.\n\
         \n\
         Files:\n{summaries}\n\
         \n\
         Return a JSON object with exactly these keys:\n\
         {{\n\
         \x20 \"nodes\":   [{{\"original_class\": \"str\", \"jac_node\": \"str\", \"fields\": [\"str\"]}}],\n\
         \x20 \"walkers\": [{{\"original\": \"str\", \"jac_walker\": \"str\", \"purpose\": \"str\"}}],\n\
         \x20 \"edges\":   [{{\"from_node\": \"str\", \"to_node\": \"str\", \"edge_name\": \"str\"}}],\n\
         \x20 \"order\":   [\"str\"]\n\
         }}\n\
         \n\
         Rules:\n\
         - data classes and models become nodes\n\
         - route handlers and business logic become walkers\n\
         - object relationships become edges\n\
         - order lists file paths with dependencies first\n\
         \n\
         Respond with ONLY valid JSON."
    )
}

pub fn convert_file(file: &SourceFile, plan_context: &str, previous_error: &str) -> String {
    let retry_note = if previous_error.is_empty() {
        String::new()
    } else {
        format!(
            "\nThe previous conversion attempt failed with:\n{previous_error}\nFix this in your answer.\n"
        )
    };

    format!(
        "You are an expert Jac/Jaseci developer.\n\
         Convert the Python file below to idiomatic Jac.\n\
         \n\
         Mapping plan:\n{plan}\n\
         \n\
         {FILE_LINE_PREFIX}{path}\n\
         Role: {role}\n\
         {retry_note}\n\
         Source code:\n```python\n{source}\n```\n\
         \n\
         Rules:\n\
         - use `node` for data models, never Python classes\n\
         - use `walker` for workflows and business logic\n\
         - use `has` for typed node fields with defaults\n\
         - use `can ... with NodeType entry` for walker abilities\n\
         - use `edge` for typed relationships and `visit [-->]` to traverse\n\
         - use `import:py` for Python utility functions\n\
         - every walker needs at least one `can` ability\n\
         \n\
         Return ONLY Jac code, without markdown fences or explanation.",
        plan = truncate(plan_context, PLAN_CONTEXT_CHARS),
        path = file.path,
        role = file.role,
        source = file.content,
    )
}

pub fn readme(repo_name: &str, files: &[SourceFile]) -> String {
    let listing = files
        .iter()
        .map(|f| {
            format!(
                "- {} (role: {}, confidence: {}%)",
                f.target_path(),
                f.role,
                (f.confidence * 100.0).round()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let review: Vec<String> = files
        .iter()
        .filter(|f| f.needs_review())
        .map(|f| format!("- {}", f.path))
        .collect();
    let review_note = if review.is_empty() {
        String::new()
    } else {
        format!("Files needing manual review:\n{}", review.join("\n"))
    };

    format!(
        "Write a concise developer README.md for a Jac/Jaseci project converted from the Python \
         repository \"{repo_name}\".\n\
         \n\
         Converted files:\n{listing}\n\
         \n\
         {review_note}\n\
         \n\
         Sections:\n\
         1. Title and one-line description\n\
         2. Design decisions (which classes became nodes and which became walkers)\n\
         3. File structure\n\
         4. Setup: pip install jaseci, then jac run main.jac\n\
         5. Quick demo walkthrough\n\
         6. Files needing manual review\n\
         \n\
         Write clean Markdown."
    )
}

pub fn demo_script(repo_name: &str) -> String {
    format!(
        "Write a short, commented bash script (demo.sh) for a Jac project converted from the \
         Python repository \"{repo_name}\".\n\
         \n\
         It should:\n\
         1. install jaseci if it is missing\n\
         2. copy .env.example to .env and remind the user to add an API key\n\
         3. run: jac run main.jac\n\
         4. show the expected output as comments\n\
         \n\
         Keep it under 25 lines."
    )
}

/// Fallback README used when generation fails.
pub fn fallback_readme(repo_name: &str) -> String {
    format!("# {repo_name} - Converted to Jac\n\nRun: `jac run main.jac`\n")
}

/// Fallback demo script used when generation fails.
pub const FALLBACK_DEMO: &str = "#!/bin/bash\npip install jaseci\njac run main.jac\n";
