//! Handlers for `ask`, `index`, `eval` and `health`.
//!
//! Startup follows the same order for every command that serves answers:
//! load artifacts, load models, connect the backend. A failure in any step
//! aborts before a question is taken.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use solorag_core::{Answer, Error, Result, ScoredPassage};
use solorag_llm::{GenerationBackend, OllamaClient, RetryWrapper};
use solorag_rag::framing::SOURCES_MARKER;
use solorag_rag::prompt::shorten;
use solorag_rag::{
    AnswerService, EvalSummary, Retriever, SOURCES_DELIMITER, evaluate, read_dev_set,
    split_sources_trailer,
};
use solorag_vector::{ArtifactStore, build_artifacts, create_embedding_provider, create_reranker};
use tracing::{info, warn};

use crate::config::{GenerationConfig, SoloragConfig};

// ============================================================================
// Startup
// ============================================================================

/// Ollama client configured from `generation`.
pub fn ollama_client(config: &GenerationConfig) -> OllamaClient {
    OllamaClient::new(&config.base_url, &config.model)
        .with_timeout(config.timeout())
        .with_stream_idle_timeout(config.stream_idle_timeout())
}

/// Ollama client wrapped in the retry policy from `generation`.
pub fn generation_backend(config: &GenerationConfig) -> Arc<dyn GenerationBackend> {
    let client = Arc::new(ollama_client(config));
    Arc::new(
        RetryWrapper::new(client)
            .with_max_attempts(config.retries)
            .with_delay(config.retry_delay()),
    )
}

/// Load artifacts and models, then wire them to `backend`.
pub fn build_service_with_backend(
    config: &SoloragConfig,
    backend: Arc<dyn GenerationBackend>,
) -> Result<AnswerService> {
    let store = ArtifactStore::load(&config.artifacts.path)?;
    let embedder = create_embedding_provider(&config.embedding)?;
    if embedder.dimension() != store.dimension() {
        return Err(Error::index_unavailable(format!(
            "embedding model '{}' produces {} dimensions but artifacts at {} hold {}",
            embedder.name(),
            embedder.dimension(),
            config.artifacts.path,
            store.dimension()
        )));
    }
    let reranker = create_reranker(&config.embedding)?;
    info!(
        passages = store.len(),
        embedder = embedder.name(),
        reranker = reranker.name(),
        backend = backend.name(),
        "answer service ready"
    );

    let retriever = Retriever::new(Arc::new(store), embedder, reranker, config.retrieval);
    Ok(AnswerService::new(retriever, backend))
}

/// Build the service against the configured generation backend.
pub fn build_service(config: &SoloragConfig) -> Result<AnswerService> {
    build_service_with_backend(config, generation_backend(&config.generation))
}

// ============================================================================
// ask
// ============================================================================

/// Render sources as a numbered list, one per line.
pub fn format_sources(sources: &[ScoredPassage]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] ({:.3}) {}", i + 1, s.score, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_answer(out: &mut impl Write, answer: &Answer, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(answer)?)?;
        return Ok(());
    }
    writeln!(out, "{}", answer.answer)?;
    if !answer.sources.is_empty() {
        writeln!(out, "\nSources:\n{}", format_sources(&answer.sources))?;
    }
    Ok(())
}

/// Answer one question and print the result.
pub async fn handle_ask(service: &AnswerService, question: &str, json: bool) -> Result<()> {
    let answer = service.get_answer(question).await?;
    print_answer(&mut std::io::stdout().lock(), &answer, json)
}

/// Stream one answer to `out`, then print the parsed sources.
///
/// Chunks are written as they arrive. A chunk that opens with the sources
/// delimiter is held until the next one; only the final chunk is dropped,
/// and only when it is the trailer parsed from the accumulated body.
pub async fn stream_to(service: &AnswerService, question: &str, out: &mut impl Write) -> Result<()> {
    let mut stream = service.stream_answer(question).await?;
    let mut body = String::new();
    let mut held: Option<String> = None;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                if let Some(prev) = held.take() {
                    write!(out, "{prev}")?;
                }
                writeln!(out)?;
                return Err(e);
            }
        };
        if let Some(prev) = held.take() {
            write!(out, "{prev}")?;
        }
        body.push_str(&chunk);
        if chunk.starts_with(SOURCES_DELIMITER) {
            held = Some(chunk);
        } else {
            write!(out, "{chunk}")?;
        }
        out.flush()?;
    }

    let parsed = split_sources_trailer(&body);
    if let Some(last) = held {
        let is_trailer = matches!(
            &parsed,
            Ok(Some((answer, _))) if answer.len() + last.len() == body.len()
        );
        if !is_trailer {
            write!(out, "{last}")?;
        }
    }
    writeln!(out)?;

    match parsed? {
        Some((_, sources)) if !sources.is_empty() => {
            writeln!(out, "\nSources:\n{}", format_sources(&sources))?;
        }
        Some(_) => {}
        None => warn!(marker = SOURCES_MARKER, "stream ended without a sources trailer"),
    }
    Ok(())
}

/// Stream one answer to stdout.
pub async fn handle_ask_stream(service: &AnswerService, question: &str) -> Result<()> {
    stream_to(service, question, &mut std::io::stdout()).await
}

// ============================================================================
// index
// ============================================================================

/// Embed `input` and write artifacts to `output` or `artifacts.path`.
pub async fn handle_index(
    config: &SoloragConfig,
    input: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| Path::new(&config.artifacts.path));
    let provider = create_embedding_provider(&config.embedding)?;
    let store = build_artifacts(provider, input, output, config.embedding.batch_size).await?;
    println!(
        "Wrote {} passages ({} dimensions, {}) to {}",
        store.len(),
        store.dimension(),
        store.manifest().model,
        output.display()
    );
    Ok(())
}

// ============================================================================
// eval
// ============================================================================

/// Width of the answer and context excerpts printed for a miss.
const MISS_SNIPPET_WIDTH: usize = 160;

fn print_summary(out: &mut impl Write, summary: &EvalSummary) -> Result<()> {
    for case in &summary.cases {
        let mark = if case.hit { "HIT " } else { "MISS" };
        writeln!(
            out,
            "{mark} {:>7.2}s  {}",
            case.latency.as_secs_f64(),
            case.question
        )?;
        if let Some(error) = &case.error {
            writeln!(out, "     error: {error}")?;
        }
        if !case.hit {
            writeln!(out, "     expected: {}", case.keywords.join(", "))?;
            if let Some(answer) = &case.answer {
                writeln!(out, "     answer: {}", shorten(answer, MISS_SNIPPET_WIDTH))?;
            }
            if let Some(source) = &case.top_source {
                writeln!(out, "     top context: {}", shorten(source, MISS_SNIPPET_WIDTH))?;
            }
        }
    }
    writeln!(
        out,
        "\nhit rate {}/{} ({:.1}%), mean {:.2}s, p95 {:.2}s",
        summary.hits,
        summary.cases.len(),
        summary.hit_rate() * 100.0,
        summary.mean_latency_secs,
        summary.p95_latency_secs
    )?;
    Ok(())
}

/// Run the dev set in `dev_set` and print the results.
pub async fn handle_eval(service: &AnswerService, dev_set: &Path, json: bool) -> Result<()> {
    let cases = read_dev_set(dev_set)?;
    if cases.is_empty() {
        return Err(Error::validation(format!(
            "dev set {} has no cases",
            dev_set.display()
        )));
    }
    let summary = evaluate(service, &cases).await;
    let mut out = std::io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        Ok(())
    } else {
        print_summary(&mut out, &summary)
    }
}

// ============================================================================
// health
// ============================================================================

/// Report artifact and backend status; fail if either is down.
pub async fn handle_health(config: &SoloragConfig) -> Result<()> {
    let mut healthy = true;

    match ArtifactStore::load(&config.artifacts.path) {
        Ok(store) => println!(
            "artifacts: ok ({} passages, {} dimensions, model {})",
            store.len(),
            store.dimension(),
            store.manifest().model
        ),
        Err(e) => {
            healthy = false;
            println!("artifacts: unavailable ({e})");
        }
    }

    let client = ollama_client(&config.generation);
    match client.ping().await {
        Ok(models) => {
            let listed = models.iter().any(|m| m == client.model());
            println!(
                "backend: ok ({}, {} models{})",
                client.base_url(),
                models.len(),
                if listed { "" } else { ", configured model not pulled" }
            );
        }
        Err(e) => {
            healthy = false;
            println!("backend: unreachable ({e})");
        }
    }

    if healthy {
        Ok(())
    } else {
        Err(Error::operation("health check failed"))
    }
}

// ============================================================================
// Tests
// ============================================================================
