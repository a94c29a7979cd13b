//! TUI application state and main event loop
//!
//! The handlers here implement the reconciliation lifecycle: contact
//! selection seeds the conversation store from cache and unseen pushes,
//! history responses merge in, optimistic sends reconcile or retract, and
//! routed push events land in the open store or the unread aggregate.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio_stream::StreamExt;
use tokio::sync::mpsc;
use tokio::time;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::compose::ComposeState;
use super::log_capture::LogBuffer;
use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::config::Config;
use crate::models::{ConversationKey, CurrentUser, Message, MessageId};
use crate::push::{self, PushControl, PushEvent};
use crate::store::{
    load_history, store_history, ConversationStore, DiskCache, EventRouter, Outbox, Roster, Route,
};

/// How long a typing indicator stays visible after the last event.
const TYPING_DISPLAY: Duration = Duration::from_secs(2);

/// Minimum gap between outgoing typing notifications.
const TYPING_DEBOUNCE: Duration = Duration::from_secs(2);

/// Active pane in the TUI
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "contacts",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_exit: bool,
    pub user: CurrentUser,
    pub roster: Roster,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub active_pane: Pane,
    /// Push connection state, for the header/status bar.
    pub connected: bool,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    pub show_help: bool,
    pub logs: LogBuffer,
    /// Display name currently typing in the active conversation.
    pub typing_from: Option<String>,

    pub conversation: Option<ConversationStore>,
    router: EventRouter,
    outbox: Outbox,
    cache: DiskCache,
    push_ctrl: mpsc::UnboundedSender<PushControl>,
    typing_until: Option<Instant>,
    last_typing_sent: Option<Instant>,
}

impl App {
    fn new(
        user: CurrentUser,
        cache: DiskCache,
        push_ctrl: mpsc::UnboundedSender<PushControl>,
        logs: LogBuffer,
    ) -> Self {
        let user_id = user.id;
        Self {
            should_exit: false,
            user,
            roster: Roster::new(user_id),
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            active_pane: Pane::default(),
            connected: false,
            status_message: None,
            status_is_error: false,
            show_help: false,
            logs,
            typing_from: None,
            conversation: None,
            router: EventRouter::new(user_id),
            outbox: Outbox::new(),
            cache,
            push_ctrl,
            typing_until: None,
            last_typing_sent: None,
        }
    }

    pub fn active_contact(&self) -> Option<u64> {
        self.router.active()
    }

    /// Header label for the open conversation.
    pub fn active_contact_label(&self) -> String {
        self.active_contact()
            .and_then(|id| self.roster.contact(id))
            .map(|c| c.display_name())
            .unwrap_or_else(|| "(no conversation)".to_string())
    }

    /// Whether any optimistic sends are still awaiting the backend.
    pub fn is_sending(&self) -> bool {
        !self.outbox.is_empty()
    }

    pub fn pending_sends(&self) -> usize {
        self.outbox.len()
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = true;
    }

    // -- key handling ------------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent, backend: &Backend) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        // Global bindings first.
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.should_exit = true;
                    return;
                }
                KeyCode::Char('u') if self.active_pane == Pane::Compose => {
                    self.compose.clear();
                    return;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Tab => {
                self.active_pane = self.active_pane.next();
                return;
            }
            KeyCode::BackTab => {
                self.active_pane = self.active_pane.prev();
                return;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key, backend),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key, backend),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent, backend: &Backend) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('r') => {
                self.set_status("Refreshing contacts...");
                backend.send(BackendCommand::LoadContacts);
            }
            KeyCode::Up => self.sidebar.move_up(),
            KeyCode::Down => self.sidebar.move_down(self.roster.len()),
            KeyCode::Enter => {
                let selected = self
                    .roster
                    .ordered()
                    .get(self.sidebar.selected)
                    .map(|c| c.id);
                if let Some(contact_id) = selected {
                    self.open_conversation(contact_id, backend);
                }
            }
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('G') => self.messages.jump_to_bottom(),
            KeyCode::Up => self.messages.scroll_up(),
            KeyCode::Down => self.messages.scroll_down(),
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent, backend: &Backend) {
        match key.code {
            KeyCode::Enter => self.submit_message(backend),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.insert_char(c);
                self.maybe_send_typing(backend);
            }
            _ => {}
        }
    }

    // -- conversation lifecycle --------------------------------------------

    /// Open the conversation with a contact: clear its unread state, seed
    /// the store from cache and already-received pushes, then fetch fresh
    /// history and re-plan subscriptions.
    fn open_conversation(&mut self, contact_id: u64, backend: &Backend) {
        let Some(contact) = self.roster.contact(contact_id) else {
            return;
        };
        let unit_id = contact.unit_id;

        let key = ConversationKey::new(self.user.id, contact_id);
        let unseen = self.roster.select(contact_id);
        self.router.set_active(Some(contact_id));

        let mut conv = ConversationStore::new(key);
        conv.merge_cached(load_history(&self.cache, &key));
        for msg in unseen {
            conv.apply_live(msg);
        }
        self.conversation = Some(conv);

        self.messages.reset();
        self.typing_from = None;
        self.typing_until = None;
        self.status_message = None;
        self.active_pane = Pane::Compose;

        backend.send(BackendCommand::LoadHistory { key, unit_id });
        let _ = self.push_ctrl.send(PushControl::SetActive(Some(contact_id)));
    }

    /// Optimistic send: provisional record into the store and the outbox,
    /// then hand the transmit to the backend.
    fn submit_message(&mut self, backend: &Backend) {
        let Some(contact_id) = self.active_contact() else {
            self.set_error("Select a contact first");
            return;
        };
        let Some(text) = self.compose.take() else {
            return;
        };
        let Some(contact) = self.roster.contact(contact_id) else {
            return;
        };
        let unit_id = contact.unit_id;

        let key = ConversationKey::new(self.user.id, contact_id);
        let msg = self.outbox.begin(key, text.clone());
        let local_id = match msg.id {
            MessageId::Local(u) => u,
            MessageId::Server(_) => unreachable!("provisional ids are always local"),
        };

        self.roster.note_activity(contact_id, msg.sent_at, &msg.content);
        if let Some(conv) = self.conversation.as_mut() {
            if conv.key() == key {
                conv.insert_provisional(msg);
            }
        }
        self.messages.jump_to_bottom();

        backend.send(BackendCommand::SendMessage {
            local_id,
            recipient_id: contact_id,
            unit_id,
            content: text,
        });
    }

    /// Debounced typing notification while composing.
    fn maybe_send_typing(&mut self, backend: &Backend) {
        let Some(contact_id) = self.active_contact() else {
            return;
        };
        let Some(contact) = self.roster.contact(contact_id) else {
            return;
        };
        let due = self
            .last_typing_sent
            .map_or(true, |at| at.elapsed() >= TYPING_DEBOUNCE);
        if due && !self.compose.input.is_empty() {
            backend.send(BackendCommand::NotifyTyping {
                recipient_id: contact_id,
                unit_id: contact.unit_id,
            });
            self.last_typing_sent = Some(Instant::now());
        }
    }

    // -- backend responses -------------------------------------------------

    fn handle_backend(&mut self, resp: BackendResponse, backend: &Backend) {
        match resp {
            BackendResponse::Contacts(Ok(contacts)) => {
                self.sidebar.loading = false;
                self.router.set_contacts(&contacts);
                let ids: Vec<u64> = contacts.iter().map(|c| c.id).collect();
                self.roster.set_contacts(contacts);
                self.sidebar.clamp(self.roster.len());
                let _ = self.push_ctrl.send(PushControl::SetContacts(ids));

                // Open the first conversation automatically on startup.
                if self.active_contact().is_none() {
                    if let Some(first) = self.roster.ordered().first().map(|c| c.id) {
                        self.open_conversation(first, backend);
                        self.active_pane = Pane::Sidebar;
                    }
                }
            }
            BackendResponse::Contacts(Err(e)) => {
                self.sidebar.loading = false;
                self.set_error(format!("Loading contacts failed: {:#}", e));
            }
            BackendResponse::History { key, result } => self.handle_history(key, result, backend),
            BackendResponse::SendResult { local_id, result } => {
                self.handle_send_result(local_id, result)
            }
        }
    }

    fn handle_history(
        &mut self,
        key: ConversationKey,
        result: Result<Vec<Message>>,
        backend: &Backend,
    ) {
        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                self.set_error(format!("Loading messages failed: {:#}", e));
                return;
            }
        };

        let Some(conv) = self.conversation.as_mut() else {
            return;
        };
        // A stale response for a conversation we already left.
        if conv.key() != key {
            return;
        }

        conv.merge_history(batch);
        store_history(&mut self.cache, &key, conv.messages());

        let receipts = conv.unread_received_ids(self.user.id);
        if !receipts.is_empty() {
            backend.send(BackendCommand::MarkRead {
                message_ids: receipts,
            });
            conv.mark_received_read(self.user.id);
        }

        if let Some(last) = conv.last() {
            let (at, preview) = (last.sent_at, last.content.clone());
            self.roster.note_activity(key.contact_id, at, &preview);
        }
    }

    fn handle_send_result(&mut self, local_id: Uuid, result: Result<Option<u64>>) {
        match result {
            Ok(Some(server_id)) => {
                let Some(entry) = self.outbox.complete(local_id) else {
                    return;
                };
                let latency = chrono::Utc::now() - entry.queued_at;
                tracing::debug!(
                    "Send {} confirmed as {} after {}ms",
                    entry.local_id,
                    server_id,
                    latency.num_milliseconds()
                );
                if let Some(conv) = self.conversation.as_mut() {
                    if conv.key() == entry.key {
                        conv.reconcile(local_id, server_id);
                        store_history(&mut self.cache, &entry.key, conv.messages());
                    }
                }
            }
            Ok(None) => {
                // Accepted but unconfirmed id; the record stays provisional.
                self.outbox.complete(local_id);
                tracing::warn!("Send accepted without a server id; keeping provisional record");
            }
            Err(e) => {
                let Some(entry) = self.outbox.fail(local_id) else {
                    return;
                };
                tracing::warn!("Retracting provisional message {}: {:#}", entry.local_id, e);
                if let Some(conv) = self.conversation.as_mut() {
                    if conv.key() == entry.key {
                        conv.retract(local_id);
                    }
                }
                self.compose.restore(&entry.content);
                self.set_error(format!("Send failed: {:#}", e));
            }
        }
    }

    // -- push events -------------------------------------------------------

    fn handle_push(&mut self, ev: PushEvent, backend: &Backend) {
        match ev {
            PushEvent::Connected => {
                self.connected = true;
            }
            PushEvent::Disconnected => {
                self.connected = false;
            }
            PushEvent::Typing { sender_id, name } => {
                if self.active_contact() == Some(sender_id) {
                    let name = name
                        .or_else(|| self.roster.contact(sender_id).map(|c| c.display_name()))
                        .unwrap_or_else(|| format!("user {}", sender_id));
                    self.typing_from = Some(name);
                    self.typing_until = Some(Instant::now() + TYPING_DISPLAY);
                }
            }
            PushEvent::Message(msg) => self.handle_push_message(msg, backend),
        }
    }

    fn handle_push_message(&mut self, msg: Message, backend: &Backend) {
        match self.router.route(&msg) {
            Route::Active => {
                // The sender is on screen; their typing indicator is stale.
                self.typing_from = None;
                self.typing_until = None;

                self.roster.record_incoming(&msg, true);

                let Some(conv) = self.conversation.as_mut() else {
                    return;
                };
                let server_id = match msg.id {
                    MessageId::Server(n) => Some(n),
                    MessageId::Local(_) => None,
                };
                if conv.apply_live(msg) {
                    let key = conv.key();
                    store_history(&mut self.cache, &key, conv.messages());
                    if let Some(id) = server_id {
                        backend.send(BackendCommand::MarkRead {
                            message_ids: vec![id],
                        });
                        conv.mark_received_read(self.user.id);
                    }
                }
            }
            Route::OwnEcho => {
                // Our own send coming back on the outbound channel. Apply it
                // only to the matching open conversation; the id-dedup in the
                // store and the reconcile path keep one copy.
                if self.active_contact() != Some(msg.recipient_id) {
                    return;
                }
                if let Some(conv) = self.conversation.as_mut() {
                    if conv.apply_live(msg) {
                        let key = conv.key();
                        store_history(&mut self.cache, &key, conv.messages());
                    }
                }
            }
            Route::Notification => {
                let sender = self
                    .roster
                    .contact(msg.sender_id)
                    .map(|c| c.display_name());
                if self.roster.record_incoming(&msg, false) {
                    if let Some(name) = sender {
                        self.set_status(format!("New message from {}", name));
                    }
                }
            }
            Route::Ignored => {
                tracing::debug!(
                    "Ignoring pushed message {} ({} -> {})",
                    msg.id,
                    msg.sender_id,
                    msg.recipient_id
                );
            }
        }
    }

    /// Periodic housekeeping: expire the typing indicator.
    fn tick(&mut self) {
        if let Some(until) = self.typing_until {
            if Instant::now() >= until {
                self.typing_from = None;
                self.typing_until = None;
            }
        }
    }
}

/// Launch the terminal user interface.
///
/// Initializes tracing into the TUI log buffer (stderr would corrupt the
/// alternate screen), so the caller must not have installed a subscriber.
pub async fn run(verbose: bool) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let user = config.current_user()?;

    let logs = LogBuffer::new();
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(logs.clone()),
        )
        .init();

    let cache = DiskCache::new(Config::cache_dir()?);

    let backend = Backend::start(config.clone());
    backend.send(BackendCommand::LoadContacts);

    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
    tokio::spawn(push::run(config, Vec::new(), push_tx, ctrl_rx));

    let mut app = App::new(user, cache, ctrl_tx, logs);

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, &mut app, backend, &mut push_rx).await;
    ratatui::restore();
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    mut backend: Backend,
    push_rx: &mut mpsc::UnboundedReceiver<PushEvent>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = time::interval(Duration::from_millis(250));
    let mut push_alive = true;

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            ev = events.next() => {
                match ev {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key, &backend);
                    }
                    Some(Ok(_)) => {
                        // Resize and other events redraw on the next pass.
                    }
                    Some(Err(e)) => return Err(e).context("Terminal event error"),
                    None => break,
                }
            }
            resp = backend.recv() => {
                match resp {
                    Some(resp) => app.handle_backend(resp, &backend),
                    None => anyhow::bail!("Backend task ended unexpectedly"),
                }
            }
            ev = push_rx.recv(), if push_alive => {
                match ev {
                    Some(ev) => app.handle_push(ev, &backend),
                    None => {
                        push_alive = false;
                        app.connected = false;
                        app.set_error("Push connection ended");
                    }
                }
            }
            _ = tick.tick() => app.tick(),
        }
    }

    Ok(())
}
