use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

use crate::decoder::FrameDecoder;
use crate::error::{BackendError, BackendResult};
use crate::frame::Frame;

/// Lazy, finite sequence of frames decoded from one chat response body.
pub type FrameStream = BoxStream<'static, BackendResult<Frame>>;

struct DecodeState<S> {
    source: Pin<Box<S>>,
    decoder: FrameDecoder,
    ready: VecDeque<Frame>,
    finished: bool,
}

/// Wraps a chunked byte source in a [`FrameStream`].
///
/// Frames are yielded as soon as the chunk completing them arrives. A transport error is yielded
/// once and ends the stream; unterminated trailing content is discarded at end of input.
pub fn decode_frames<S, B, E>(source: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        source: Box::pin(source),
        decoder: FrameDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.finished {
                return None;
            }

            match state.source.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.feed(chunk.as_ref());
                    state.ready.extend(frames);
                }
                Some(Err(error)) => {
                    state.finished = true;
                    state.decoder.finish();
                    let error = BackendError::ReadBody {
                        stage: "read-chat-stream",
                        message: error.to_string(),
                    };
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    state.decoder.finish();
                }
            }
        }
    })
    .boxed()
}
