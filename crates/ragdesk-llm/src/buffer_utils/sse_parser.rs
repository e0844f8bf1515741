use anyhow::Result;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;

use super::buffering::LineBuffer;
use crate::StreamEvent;

/// Turns the payload of one `data:` line into stream events
pub trait SseLineParser: Send {
    fn parse_data_line(&self, data: &str) -> Result<Vec<StreamEvent>>;

    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}

/// Parse a server-sent-events byte stream with the given line parser.
///
/// Generic over the byte source so tests can feed an in-memory stream.
pub fn parse_sse_stream<S, B, E, P>(
    bytes: S,
    parser: P,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = LineBuffer::with_capacity(4096);
        let mut finished = false;

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(line_result) = buffer.next_line() {
                        match line_result {
                            Ok(line) => {
                                let Some(data) = line.strip_prefix("data:") else {
                                    continue;
                                };
                                let data = data.trim_start();

                                if parser.is_done_marker(data) {
                                    finished = true;
                                    yield Ok(StreamEvent::Done { finish_reason: None });
                                    break 'outer;
                                }

                                match parser.parse_data_line(data) {
                                    Ok(events) => {
                                        for event in events {
                                            yield Ok(event);
                                        }
                                    }
                                    Err(e) => yield Err(e),
                                }
                            }
                            Err(e) => yield Err(e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            }
        }

        if !finished {
            if let Some(Ok(line)) = buffer.take_remaining() {
                if let Some(data) = line.strip_prefix("data:") {
                    let data = data.trim_start();
                    if !data.is_empty() && !parser.is_done_marker(data) {
                        match parser.parse_data_line(data) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => yield Err(e),
                        }
                    }
                }
            }
        }
    })
}
