//! Per-session decoding state and the session lifecycle.

use tracing::{debug, info, warn};

use crate::cancel::CancelHandle;
use crate::client::ClientError;
use crate::decoder::TextDecoder;
use crate::frame::FrameReassembler;
use crate::model::Event;
use crate::parser::FrameParser;

/// Lifecycle of one streamed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub state: SessionState,
    /// Deliveries read from the transport
    pub deliveries: u64,
    /// Non-blank frames seen, including dropped ones
    pub frames: u64,
    /// Frames dropped because their record could not be parsed
    pub dropped_frames: u64,
    /// Whether the server sent an explicit end frame, as opposed to
    /// closing the connection
    pub server_ended: bool,
}

/// Decoder, carry-over buffer and counters of one streamed exchange.
///
/// Every delivery flows through [`process_delivery`](Self::process_delivery)
/// exactly once, which is what keeps the decoder and frame carry-over
/// consistent.
#[derive(Debug)]
pub struct StreamSession {
    decoder: TextDecoder,
    frames: FrameReassembler,
    parser: FrameParser,
    cancel: CancelHandle,
    state: SessionState,
    deliveries: u64,
    frame_count: u64,
    dropped_frames: u64,
    server_ended: bool,
}

impl StreamSession {
    pub fn new(parser: FrameParser, cancel: CancelHandle) -> Self {
        Self {
            decoder: TextDecoder::new(),
            frames: FrameReassembler::new(),
            parser,
            cancel,
            state: SessionState::Idle,
            deliveries: 0,
            frame_count: 0,
            dropped_frames: 0,
            server_ended: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn outcome(&self) -> SessionOutcome {
        SessionOutcome {
            state: self.state,
            deliveries: self.deliveries,
            frames: self.frame_count,
            dropped_frames: self.dropped_frames,
            server_ended: self.server_ended,
        }
    }

    pub fn begin_request(&mut self) {
        self.transition(SessionState::Requesting);
    }

    pub fn begin_streaming(&mut self) {
        self.transition(SessionState::Streaming);
    }

    /// Decode, reassemble and classify one delivery.
    ///
    /// Classification stops at the first `End`; frames after it in the same
    /// delivery are discarded.
    pub fn process_delivery(&mut self, bytes: &[u8]) -> Vec<Event> {
        if self.state != SessionState::Streaming {
            return Vec::new();
        }
        self.deliveries += 1;

        let text = self.decoder.decode(bytes);
        debug!(
            "Delivery #{}: {} bytes, {} chars decoded",
            self.deliveries,
            bytes.len(),
            text.len()
        );

        let mut events = Vec::new();
        for frame in self.frames.push(&text) {
            if !self.classify_frame(&frame, &mut events) {
                break;
            }
        }
        events
    }

    /// Handle end of input: flush the decoder and the frame carry-over,
    /// then complete the session.
    ///
    /// No `End` is made up for a connection that closed without an end
    /// frame; [`SessionOutcome::server_ended`] tells the two cases apart.
    pub fn finish_input(&mut self) -> Vec<Event> {
        if self.state != SessionState::Streaming {
            return Vec::new();
        }

        let mut events = Vec::new();
        let tail = self.decoder.finish();
        let mut open = true;
        for frame in self.frames.push(&tail) {
            open = self.classify_frame(&frame, &mut events);
            if !open {
                break;
            }
        }
        if open {
            if let Some(frame) = self.frames.finish() {
                debug!("Parsing unterminated final frame");
                open = self.classify_frame(&frame, &mut events);
            }
        }
        if open {
            debug!("Transport closed without an end frame");
            self.transition(SessionState::Completed);
        }
        events
    }

    /// Move to `Failed` after a connection or read error.
    pub fn mark_failed(&mut self, err: &ClientError) {
        warn!("Answer stream failed: {}", err);
        self.transition(SessionState::Failed);
    }

    /// Move to `Failed` without an event, used when the consumer gave up.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.transition(SessionState::Failed);
        }
    }

    /// Move to `Cancelled` unless the session already ended.
    pub fn mark_cancelled(&mut self) {
        if !self.state.is_terminal() {
            self.transition(SessionState::Cancelled);
        }
    }

    /// Move to `Cancelled` even from a terminal state. Used when the events
    /// that reached the terminal state were suppressed before delivery.
    pub fn force_cancelled(&mut self) {
        self.transition(SessionState::Cancelled);
    }

    /// Classify one frame into `events`. Returns `false` once the session
    /// has completed.
    fn classify_frame(&mut self, frame: &str, events: &mut Vec<Event>) -> bool {
        match self.parser.parse(frame) {
            Ok(None) => true,
            Ok(Some(event)) => {
                self.frame_count += 1;
                let end = matches!(event, Event::End);
                events.push(event);
                if end {
                    self.server_ended = true;
                    self.transition(SessionState::Completed);
                }
                !end
            }
            Err(err) => {
                self.frame_count += 1;
                self.dropped_frames += 1;
                warn!("Dropping frame #{}: {}", self.frame_count, err);
                true
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if next.is_terminal() {
            info!(
                "Session {:?} -> {:?} after {} deliveries, {} frames ({} dropped)",
                self.state, next, self.deliveries, self.frame_count, self.dropped_frames
            );
        } else {
            debug!("Session {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}
