//! Conversation view state driven by a streaming reply.
//!
//! A [`ChatView`] owns the visible conversation of one chat panel. Each
//! change is published as a [`ViewEvent`] so a UI can re-render
//! incrementally: one `Updated` event per applied delta, in arrival order.
//!
//! Only one send can be outstanding per view. A send issued while another
//! is streaming is ignored, not queued.
//!
//! The view stops applying deltas once it is closed, either explicitly via
//! [`ChatView::close`] or implicitly when the event receiver is dropped
//! (the panel that rendered it is gone). The reply stream is dropped at
//! that point, which closes the connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use tutor_types::{text, ChatMessage, Role, MAX_MESSAGES};

use crate::client::ChatTransport;
use crate::session::SessionSource;

/// A message as rendered in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Appended(DisplayMessage),
    /// Full content of message `id` after a change.
    Updated { id: u64, content: String },
    /// The reply `id` will not change any more.
    Finished { id: u64 },
}

/// Result of [`ChatView::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, a send already in flight, or a closed view.
    Ignored,
    /// No session; a sign-in prompt was shown and nothing was sent.
    SignInRequired,
    Completed,
    /// The request or the stream failed; an apology was shown.
    Failed,
    /// The view was closed while the reply was streaming.
    Cancelled,
}

pub struct ChatView {
    transport: Arc<dyn ChatTransport>,
    session: Arc<dyn SessionSource>,
    messages: Mutex<Vec<DisplayMessage>>,
    next_id: AtomicU64,
    in_flight: AtomicBool,
    /// Set once by [`ChatView::close`]; a streaming send waits on it.
    closed: watch::Sender<bool>,
    events: mpsc::UnboundedSender<ViewEvent>,
}

impl ChatView {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        session: Arc<dyn SessionSource>,
    ) -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let view = Self {
            transport,
            session,
            messages: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            in_flight: AtomicBool::new(false),
            closed: watch::Sender::new(false),
            events,
        };
        (view, rx)
    }

    /// Like [`ChatView::new`], with an assistant greeting already shown.
    pub fn with_greeting(
        transport: Arc<dyn ChatTransport>,
        session: Arc<dyn SessionSource>,
        greeting: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (view, rx) = Self::new(transport, session);
        let message = DisplayMessage {
            id: view.allocate_id(),
            role: Role::Assistant,
            content: greeting.into(),
        };
        view.with_messages(|messages| messages.push(message));
        (view, rx)
    }

    /// Snapshot of the conversation for rendering.
    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.with_messages(|messages| messages.clone())
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Stop applying deltas. An in-flight reply is abandoned right away,
    /// even while it is waiting for the next chunk.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.events.is_closed()
    }

    /// Send one user turn and stream the assistant's reply into the view.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() || self.is_closed() {
            return SendOutcome::Ignored;
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("send ignored; a reply is still streaming");
            return SendOutcome::Ignored;
        };

        let Some(token) = self.session.access_token().await else {
            self.append(Role::Assistant, text::SIGN_IN_REQUIRED);
            return SendOutcome::SignInRequired;
        };

        self.append(Role::User, text);
        let history = self.history();

        let mut stream = match self.transport.open(&token, &history).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.append(Role::Assistant, text::APOLOGY);
                return SendOutcome::Failed;
            }
        };

        let reply_id = self.append(Role::Assistant, "");
        let mut content = String::new();
        let mut closed = self.closed.subscribe();
        loop {
            let next = tokio::select! {
                biased;
                _ = closed.wait_for(|is_closed| *is_closed).map(drop) => None,
                _ = self.events.closed() => None,
                item = stream.next() => Some(item),
            };
            let Some(next) = next else {
                debug!(reply_id, "view closed; abandoning reply stream");
                return SendOutcome::Cancelled;
            };
            let Some(item) = next else {
                break;
            };
            match item {
                Ok(delta) => {
                    content.push_str(&delta);
                    self.set_content(reply_id, &content);
                }
                Err(e) => {
                    warn!(error = %e, reply_id, "reply stream failed");
                    self.fail_reply(reply_id);
                    return SendOutcome::Failed;
                }
            }
        }

        self.emit(ViewEvent::Finished { id: reply_id });
        debug!(reply_id, chars = content.chars().count(), sentinel = stream.saw_sentinel(), "reply finished");
        SendOutcome::Completed
    }

    /// The conversation as sent to the gateway: non-empty messages, most
    /// recent last, capped at the gateway's limit.
    fn history(&self) -> Vec<ChatMessage> {
        self.with_messages(|messages| {
            let sendable: Vec<_> = messages
                .iter()
                .filter(|m| !m.content.is_empty())
                .map(|m| ChatMessage::new(m.role, m.content.clone()))
                .collect();
            let skip = sendable.len().saturating_sub(MAX_MESSAGES);
            sendable.into_iter().skip(skip).collect()
        })
    }

    fn append(&self, role: Role, content: &str) -> u64 {
        let message = DisplayMessage {
            id: self.allocate_id(),
            role,
            content: content.to_owned(),
        };
        let id = message.id;
        self.with_messages(|messages| messages.push(message.clone()));
        self.emit(ViewEvent::Appended(message));
        id
    }

    fn set_content(&self, id: u64, content: &str) {
        let found = self.with_messages(|messages| match messages.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.content = content.to_owned();
                true
            }
            None => false,
        });
        if found {
            self.emit(ViewEvent::Updated {
                id,
                content: content.to_owned(),
            });
        }
    }

    /// Show the apology for a failed reply: in place of the pending reply if
    /// nothing arrived yet, after the partial text otherwise.
    fn fail_reply(&self, id: u64) {
        let pending_empty = self.with_messages(|messages| {
            messages
                .iter()
                .find(|m| m.id == id)
                .is_some_and(|m| m.content.is_empty())
        });
        if pending_empty {
            self.set_content(id, text::APOLOGY);
            self.emit(ViewEvent::Finished { id });
        } else {
            self.emit(ViewEvent::Finished { id });
            self.append(Role::Assistant, text::APOLOGY);
        }
    }

    fn emit(&self, event: ViewEvent) {
        // A dropped receiver is handled by `is_closed`.
        let _ = self.events.send(event);
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn with_messages<R>(&self, f: impl FnOnce(&mut Vec<DisplayMessage>) -> R) -> R {
        let mut guard = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl std::fmt::Debug for ChatView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatView")
            .field("messages", &self.with_messages(|m| m.len()))
            .field("sending", &self.is_sending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Holds the in-flight flag for the duration of one send.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
