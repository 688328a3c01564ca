//! The two public operations: blocking and streaming answers.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use solorag_core::{Answer, Error, Result, ScoredPassage};
use solorag_llm::{GenerationBackend, TokenStream};
use tracing::{debug, info, warn};

use crate::framing::sources_trailer;
use crate::prompt::PromptComposer;
use crate::retrieval::Retriever;

/// Streamed answer chunks followed by the sources trailer.
pub type AnswerStream = BoxStream<'static, Result<String>>;

/// Composes retrieval, prompt assembly, and generation.
///
/// Built once at startup with its collaborators injected; cheap to clone
/// and safe to share across concurrent requests.
#[derive(Clone)]
pub struct AnswerService {
    retriever: Retriever,
    composer: PromptComposer,
    backend: Arc<dyn GenerationBackend>,
}

impl AnswerService {
    /// Create a service from a retriever and a generation backend.
    pub fn new(retriever: Retriever, backend: Arc<dyn GenerationBackend>) -> Self {
        let composer = PromptComposer::new(retriever.config().snippet_width);
        Self {
            retriever,
            composer,
            backend,
        }
    }

    /// The retriever in use.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    fn validate(question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        Ok(())
    }

    async fn prepare(&self, question: &str) -> Result<(String, Vec<ScoredPassage>)> {
        Self::validate(question)?;
        info!(question_chars = question.chars().count(), "query received");

        let sources = self.retriever.retrieve(question).await?;
        let prompt = self.composer.build(question, &sources);
        debug!(
            sources = sources.len(),
            prompt_chars = prompt.chars().count(),
            "prompt assembled"
        );
        Ok((prompt, sources))
    }

    /// Answer `question` and return the passages that grounded it.
    ///
    /// Sources are in reranked order and may be empty.
    pub async fn get_answer(&self, question: &str) -> Result<Answer> {
        let (prompt, sources) = self.prepare(question).await?;
        let answer = self.backend.generate(&prompt).await?;
        info!(
            answer_chars = answer.chars().count(),
            sources = sources.len(),
            "answer generated"
        );
        Ok(Answer { answer, sources })
    }

    /// Stream the answer to `question`, then one sources trailer chunk.
    ///
    /// The trailer is sent only after the backend stream completes cleanly.
    /// If the stream fails, the error is the last item and no trailer follows.
    pub async fn stream_answer(&self, question: &str) -> Result<AnswerStream> {
        let (prompt, sources) = self.prepare(question).await?;
        let trailer = sources_trailer(&sources)?;
        let upstream = self.backend.stream_generate(&prompt).await?;
        Ok(with_trailer(upstream, trailer))
    }
}

impl std::fmt::Debug for AnswerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerService")
            .field("retriever", &self.retriever)
            .field("backend", &self.backend.name())
            .finish()
    }
}

enum Phase {
    Streaming(TokenStream, String),
    Finished,
}

/// Proxy `upstream` and append `trailer` after it ends without error.
fn with_trailer(upstream: TokenStream, trailer: String) -> AnswerStream {
    futures::stream::unfold(Phase::Streaming(upstream, trailer), |phase| async move {
        match phase {
            Phase::Streaming(mut upstream, trailer) => match upstream.next().await {
                Some(Ok(chunk)) => Some((Ok(chunk), Phase::Streaming(upstream, trailer))),
                Some(Err(e)) => {
                    warn!(error = %e, "answer stream failed, sources withheld");
                    Some((Err(e), Phase::Finished))
                }
                None => Some((Ok(trailer), Phase::Finished)),
            },
            Phase::Finished => None,
        }
    })
    .boxed()
}
