// ABOUTME: Per-connection reply routing table for the chat client
// ABOUTME: Correlates server-pushed frames with pending calls and durable handlers

use crate::frame::Frame;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

/// A durable handler invoked for every inbound frame carrying its tag.
pub(crate) type FrameHandler = Box<dyn FnMut(&Frame) + Send>;

/// Routing table from reply tag to completion slot.
///
/// Each call installs one slot per reply tag it awaits (insert on call,
/// remove on completion or cancellation), so sequential calls never collide.
/// The design assumes one in-flight call per reply tag at a time; two
/// concurrent calls awaiting the same tag are a programming error, and the
/// second displaces the first. Durable handlers installed through
/// `add_handler` receive frames no pending slot claims.
#[derive(Default)]
pub(crate) struct Router {
    pending: Mutex<HashMap<String, oneshot::Sender<Frame>>>,
    handlers: Mutex<HashMap<String, FrameHandler>>,
}

impl Router {
    /// Install a one-shot completion slot for `tag`.
    pub(crate) fn register(&self, tag: &str) -> oneshot::Receiver<Frame> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(tag.to_string(), tx);
        rx
    }

    /// Remove a slot that lost its race or will never fire.
    pub(crate) fn cancel(&self, tag: &str) {
        self.pending.lock().unwrap().remove(tag);
    }

    pub(crate) fn add_handler(&self, tag: impl Into<String>, handler: FrameHandler) {
        self.handlers.lock().unwrap().insert(tag.into(), handler);
    }

    /// Routes one inbound frame. A pending slot wins over a durable handler;
    /// a frame nobody claims is logged and dropped.
    pub(crate) fn route(&self, frame: Frame) {
        let slot = self.pending.lock().unwrap().remove(frame.handler.as_str());
        if let Some(slot) = slot {
            // The awaiting call may have been dropped in the meantime.
            let _ = slot.send(frame);
            return;
        }

        if let Some(handler) = self
            .handlers
            .lock()
            .unwrap()
            .get_mut(frame.handler.as_str())
        {
            handler(&frame);
            return;
        }

        warn!(tag = %frame.handler, "handler not found");
    }

    /// Drops every pending slot so the awaiting calls fail. Used when the
    /// stream goes away.
    pub(crate) fn fail_all(&self) {
        self.pending.lock().unwrap().clear();
    }
}
