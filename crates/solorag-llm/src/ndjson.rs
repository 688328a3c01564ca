//! Decoding of the streaming generation wire format.
//!
//! The backend sends newline-delimited JSON, one `{"response", "done"}`
//! object per line, optionally terminated by a `[DONE]` sentinel line.
//! Lines are classified one at a time:
//!
//! | Line | Effect |
//! |------|--------|
//! | blank | skipped |
//! | `[DONE]` | stream ends |
//! | chunk object | `response` text yielded; stream ends if `done` |
//! | `{"error": ...}` | stream fails with that message |
//! | anything else | forwarded verbatim as text |

use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use solorag_core::Error;
use tracing::{debug, warn};

use crate::provider::{StreamChunk, TokenStream};

/// Out-of-band end-of-stream sentinel.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest line the decoder will buffer, in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines.
///
/// Bytes are buffered until a `\n` arrives, so a line split across network
/// reads is reassembled before decoding. A trailing `\r` is dropped. Each
/// byte is scanned for a newline once, and a line longer than the cap fails
/// with [`Error::Stream`] instead of growing the buffer without bound.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Start of the first unconsumed line.
    start: usize,
    /// Bytes before this offset are known to hold no newline.
    scanned: usize,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    /// Create an empty decoder with the default line cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty decoder that rejects lines over `max_line` bytes.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            start: 0,
            scanned: 0,
            max_line,
        }
    }

    /// Bytes received but not yet returned as lines.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Append bytes read from the connection.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Result<Option<String>, Error> {
        let from = self.scanned.max(self.start);
        match self.buffer[from..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let newline = from + offset;
                let line = self.take(self.start, newline)?;
                self.start = newline + 1;
                self.scanned = self.start;
                Ok(Some(line))
            }
            None => {
                self.buffer.drain(..self.start);
                self.start = 0;
                self.scanned = self.buffer.len();
                // A trailing `\r` may still be dropped once the newline arrives.
                let pending = match self.buffer.last() {
                    Some(b'\r') => self.buffer.len() - 1,
                    _ => self.buffer.len(),
                };
                self.check_len(pending)?;
                Ok(None)
            }
        }
    }

    /// Take whatever remains after the connection closed.
    pub fn finish(&mut self) -> Result<Option<String>, Error> {
        if self.buffered() == 0 {
            return Ok(None);
        }
        let end = self.buffer.len();
        let rest = self.take(self.start, end)?;
        self.buffer.clear();
        self.start = 0;
        self.scanned = 0;
        Ok(Some(rest))
    }

    fn take(&self, from: usize, to: usize) -> Result<String, Error> {
        let mut line = &self.buffer[from..to];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        self.check_len(line.len())?;
        Ok(String::from_utf8_lossy(line).into_owned())
    }

    fn check_len(&self, len: usize) -> Result<(), Error> {
        if len > self.max_line {
            return Err(Error::stream(format!(
                "stream line exceeds {} bytes",
                self.max_line
            )));
        }
        Ok(())
    }
}

/// What one wire line means for the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Nothing to emit.
    Skip,
    /// Text for the consumer; `done` marks the final line.
    Text {
        /// Token text (or the raw line, if it was not a chunk object).
        text: String,
        /// Whether the stream ends after this line.
        done: bool,
    },
    /// End of stream with no text.
    Done,
    /// The backend reported an error in-band.
    Failed(String),
}

/// Classify a single wire line.
pub fn classify_line(line: &str) -> LineEvent {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineEvent::Skip;
    }
    let payload = trimmed
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(trimmed);
    if payload == DONE_SENTINEL {
        return LineEvent::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(StreamChunk {
            error: Some(message),
            ..
        }) => LineEvent::Failed(message),
        Ok(StreamChunk { response, done, .. }) => match response {
            Some(text) if !text.is_empty() => LineEvent::Text { text, done },
            _ if done => LineEvent::Done,
            _ => LineEvent::Skip,
        },
        Err(e) => {
            warn!(error = %e, "stream line was not valid JSON, forwarding raw");
            LineEvent::Text {
                text: line.to_string(),
                done: false,
            }
        }
    }
}

struct DecodeState {
    body: BoxStream<'static, Result<Vec<u8>, String>>,
    lines: LineDecoder,
    idle_timeout: Option<Duration>,
    eof: bool,
    finished: bool,
}

impl DecodeState {
    fn take_line(&mut self) -> solorag_core::Result<Option<String>> {
        match self.lines.next_line()? {
            Some(line) => Ok(Some(line)),
            None if self.eof => self.lines.finish(),
            None => Ok(None),
        }
    }

    /// Decode buffered lines until one produces an item or the buffer runs dry.
    fn next_buffered(&mut self) -> Option<solorag_core::Result<String>> {
        loop {
            let line = match self.take_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };
            match classify_line(&line) {
                LineEvent::Skip => continue,
                LineEvent::Done => {
                    self.finished = true;
                    return None;
                }
                LineEvent::Text { text, done } => {
                    self.finished = done;
                    return Some(Ok(text));
                }
                LineEvent::Failed(message) => {
                    self.finished = true;
                    return Some(Err(Error::stream(format!("backend error: {message}"))));
                }
            }
        }
    }
}

/// Turn a response body into a [`TokenStream`].
///
/// Reading is lazy: the body is polled only when the consumer asks for the
/// next chunk. With `idle_timeout` set, a gap longer than that between
/// reads fails the stream. Dropping the returned stream drops the body.
pub fn decode_token_stream<S, B, E>(body: S, idle_timeout: Option<Duration>) -> TokenStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: std::fmt::Display + 'static,
{
    let body = body
        .map(|item| item.map(|b| b.as_ref().to_vec()).map_err(|e| e.to_string()))
        .boxed();
    let state = DecodeState {
        body,
        lines: LineDecoder::new(),
        idle_timeout,
        eof: false,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(item) = state.next_buffered() {
                return Some((item, state));
            }
            if state.finished || state.eof {
                debug!("token stream ended");
                return None;
            }

            let next = match state.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, state.body.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        state.finished = true;
                        let err = Error::stream(format!("no data from backend for {limit:?}"));
                        return Some((Err(err), state));
                    }
                },
                None => state.body.next().await,
            };

            match next {
                Some(Ok(bytes)) => state.lines.push(&bytes),
                Some(Err(message)) => {
                    state.finished = true;
                    let err = Error::stream(format!("connection failed mid-stream: {message}"));
                    return Some((Err(err), state));
                }
                None => state.eof = true,
            }
        }
    })
    .boxed()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn body(parts: &[&str]) -> impl futures::Stream<Item = Result<Vec<u8>, String>> + Send + 'static {
        let parts: Vec<Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(parts)
    }

    async fn collect(parts: &[&str]) -> Vec<String> {
        decode_token_stream(body(parts), None)
            .try_collect()
            .await
            .unwrap()
    }

    #[test]
    fn test_line_decoder_reassembles_split_lines() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"respo");
        assert_eq!(decoder.next_line().unwrap(), None);
        decoder.push(b"nse\":\"a\"}\r\nnext");
        assert_eq!(
            decoder.next_line().unwrap().as_deref(),
            Some("{\"response\":\"a\"}")
        );
        assert_eq!(decoder.next_line().unwrap(), None);
        assert_eq!(decoder.finish().unwrap().as_deref(), Some("next"));
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_line_decoder_multibyte_split() {
        let mut decoder = LineDecoder::new();
        let bytes = "café\n".as_bytes();
        decoder.push(&bytes[..4]);
        decoder.push(&bytes[4..]);
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("café"));
    }

    #[test]
    fn test_line_decoder_many_lines_in_one_read() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"a\nb\n\nc");
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some(""));
        assert_eq!(decoder.next_line().unwrap(), None);
        assert_eq!(decoder.buffered(), 1);
        decoder.push(b"d\n");
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("cd"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_line_decoder_rejects_overlong_partial_line() {
        let mut decoder = LineDecoder::with_max_line(8);
        decoder.push(b"12345");
        assert_eq!(decoder.next_line().unwrap(), None);
        decoder.push(b"6789");
        assert!(matches!(decoder.next_line(), Err(Error::Stream(_))));
    }

    #[test]
    fn test_line_decoder_line_cap_boundaries() {
        let mut decoder = LineDecoder::with_max_line(4);
        decoder.push(b"abcd\r");
        assert_eq!(decoder.next_line().unwrap(), None);
        decoder.push(b"\nabcde\n");
        assert_eq!(decoder.next_line().unwrap().as_deref(), Some("abcd"));
        assert!(matches!(decoder.next_line(), Err(Error::Stream(_))));

        let mut decoder = LineDecoder::with_max_line(4);
        decoder.push(b"abcdef");
        assert!(decoder.next_line().is_err());
    }

    #[test]
    fn test_classify_lines() {
        assert_eq!(classify_line("   "), LineEvent::Skip);
        assert_eq!(classify_line("[DONE]"), LineEvent::Done);
        assert_eq!(classify_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(
            classify_line(r#"{"response":"Hi","done":false}"#),
            LineEvent::Text {
                text: "Hi".to_string(),
                done: false
            }
        );
        assert_eq!(
            classify_line(r#"{"response":"","done":true}"#),
            LineEvent::Done
        );
        assert_eq!(classify_line(r#"{"response":""}"#), LineEvent::Skip);
        assert_eq!(
            classify_line(r#"{"error":"model not loaded"}"#),
            LineEvent::Failed("model not loaded".to_string())
        );
        assert_eq!(
            classify_line("not json at all"),
            LineEvent::Text {
                text: "not json at all".to_string(),
                done: false
            }
        );
    }

    #[tokio::test]
    async fn test_stream_yields_chunks_until_done() {
        let chunks = collect(&[
            "{\"response\":\"Hello\",\"done\":false}\n",
            "{\"response\":\" world\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
            "{\"response\":\"ignored\",\"done\":false}\n",
        ])
        .await;
        assert_eq!(chunks, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_stream_stops_at_sentinel() {
        let chunks = collect(&["{\"response\":\"a\"}\n[DONE]\n{\"response\":\"b\"}\n"]).await;
        assert_eq!(chunks, vec!["a"]);
    }

    #[tokio::test]
    async fn test_stream_done_line_with_text_is_last() {
        let chunks = collect(&["{\"response\":\"end\",\"done\":true}\n{\"response\":\"x\"}\n"]).await;
        assert_eq!(chunks, vec!["end"]);
    }

    #[tokio::test]
    async fn test_stream_forwards_malformed_and_skips_blank() {
        let chunks = collect(&[
            "{\"response\":\"ok\"}\n\n   \n",
            "{oops\n",
            "{\"response\":\"!\",\"done\":true}\n",
        ])
        .await;
        assert_eq!(chunks, vec!["ok", "{oops", "!"]);
    }

    #[tokio::test]
    async fn test_stream_ends_on_close_without_done() {
        let chunks = collect(&["{\"response\":\"a\"}\n{\"response\":\"b\"}"]).await;
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stream_transport_error_ends_stream() {
        let parts: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"{\"response\":\"partial\"}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"{\"response\":\"never\"}\n".to_vec()),
        ];
        let items: Vec<_> = decode_token_stream(futures::stream::iter(parts), None)
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(Error::Stream(_))));
    }

    #[tokio::test]
    async fn test_stream_fails_on_unterminated_flood() {
        let flood = futures::stream::iter(0..)
            .map(|_| Ok::<_, String>(vec![b'x'; 64 * 1024]));
        let items: Vec<_> = decode_token_stream(flood, None).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Stream(_))));
    }

    #[tokio::test]
    async fn test_stream_in_band_error() {
        let items: Vec<_> = decode_token_stream(
            body(&["{\"response\":\"a\"}\n{\"error\":\"out of memory\"}\n"]),
            None,
        )
        .collect()
        .await;
        assert_eq!(items.len(), 2);
        let err = items[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_idle_timeout() {
        let stalled = futures::stream::iter(vec![Ok::<_, String>(b"{\"response\":\"a\"}\n".to_vec())])
            .chain(futures::stream::pending());
        let items: Vec<_> = decode_token_stream(stalled, Some(Duration::from_secs(5)))
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(Error::Stream(_))));
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let parts = futures::stream::iter(0..100).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(format!("{{\"response\":\"{i}\"}}\n").into_bytes())
        });

        let mut stream = decode_token_stream(parts, None);
        assert_eq!(stream.next().await.unwrap().unwrap(), "0");
        assert_eq!(stream.next().await.unwrap().unwrap(), "1");
        drop(stream);
        assert_eq!(polled.load(Ordering::SeqCst), 2);
    }

    fn read_all(decoder: &mut LineDecoder) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = decoder.next_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    proptest::proptest! {
        #[test]
        fn prop_line_split_points_do_not_matter(
            tokens in proptest::collection::vec("[a-zA-Z0-9 ,.é✓]{0,12}", 0..12),
            cuts in proptest::collection::vec(0usize..4096, 0..16),
        ) {
            let wire: String = tokens
                .iter()
                .map(|t| format!("{}\r\n", serde_json::json!({"response": t, "done": false})))
                .collect();
            let bytes = wire.as_bytes();

            let mut whole = LineDecoder::new();
            whole.push(bytes);
            let expected = read_all(&mut whole);

            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % (bytes.len() + 1)).collect();
            cuts.sort_unstable();
            let mut pieces = LineDecoder::new();
            let mut lines = Vec::new();
            let mut from = 0;
            for cut in cuts.into_iter().chain([bytes.len()]) {
                pieces.push(&bytes[from..cut]);
                lines.extend(read_all(&mut pieces));
                from = cut;
            }
            proptest::prop_assert_eq!(pieces.finish().unwrap(), None);
            proptest::prop_assert_eq!(&lines, &expected);

            let decoded: Vec<String> = lines
                .iter()
                .filter_map(|l| match classify_line(l) {
                    LineEvent::Text { text, .. } => Some(text),
                    _ => None,
                })
                .collect();
            let non_empty: Vec<String> = tokens.into_iter().filter(|t| !t.is_empty()).collect();
            proptest::prop_assert_eq!(decoded, non_empty);
        }
    }
}
