//! Pointer session actor.
//!
//! ARCHITECTURE
//! ============
//! One tokio task owns the [`EngineCore`] for a session. Everything that can
//! change overlay state reaches it as a message:
//!
//! - [`SessionCommand`]s from the host (local pointer events, resizes, leave);
//! - [`TransportEvent`]s from the mesh;
//! - nickname changes through the [`SessionContext`] watch channel;
//! - the pulse prune deadline, armed by `Action::ScheduleTick`.
//!
//! Engine actions are carried out in order: sends go through the cursor
//! service, ticks re-arm the deadline, and render requests mark the state
//! dirty. The render state is published once per handled message through a
//! `watch` channel, so a burst of frames costs one redraw.
//!
//! ERROR HANDLING
//! ==============
//! Send failures and malformed frames are logged and dropped; pointer
//! traffic is best-effort. A transport reset drops every remote pointer and
//! pulse without tombstoning anyone, so peers that are still connected show
//! up again with their next frame. The actor stops when the host sends `Leave` or
//! `Shutdown`, when every [`SessionHandle`] is dropped, or when the
//! transport's event queue closes.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use frames::{WireFormat, WireMessage};
use overlay::engine::{Action, EngineCore, RenderState};
use overlay::input::LocalPointer;
use overlay::transform::{FitPolicy, Size};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::services::cursor;
use crate::state::SessionContext;
use crate::transport::{ChannelRegistry, POINTER_TOPICS, Transport, TransportEvent};

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// Host-side input to a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// A local pointer event in element-local pixels.
    Pointer(LocalPointer),
    ContainerResized(Size),
    ElementResized(Size),
    VideoResized(Size),
    SetFitPolicy(FitPolicy),
    /// Hide the local pointer, drop remote state, close topics, flush the transport, stop.
    Leave,
    /// Stop without telling peers.
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session stopped")]
    Stopped,
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    render: watch::Receiver<RenderState>,
}

impl SessionHandle {
    /// Queue a command for the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] once the actor has exited.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| SessionError::Stopped)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] once the actor has exited.
    pub async fn pointer(&self, event: LocalPointer) -> Result<(), SessionError> {
        self.send(SessionCommand::Pointer(event)).await
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] once the actor has exited.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Leave).await
    }

    /// Latest published render state.
    #[must_use]
    pub fn render_state(&self) -> RenderState {
        self.render.borrow().clone()
    }

    /// Receiver woken on every published render state.
    #[must_use]
    pub fn subscribe_render(&self) -> watch::Receiver<RenderState> {
        self.render.clone()
    }
}

/// Spawn a session actor over `transport` and its inbound `events`.
pub fn spawn_session(
    context: SessionContext,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    events: mpsc::Receiver<TransportEvent>,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
    let (render_tx, render_rx) = watch::channel(RenderState::default());

    let capabilities = transport.capabilities();
    let actor = SessionActor {
        context,
        format: capabilities.wire_format(),
        registry: ChannelRegistry::new(capabilities.shape),
        transport,
        core: EngineCore::new(config.engine_config()),
        render_tx,
        tick_deadline: None,
        dirty: false,
    };
    let task = tokio::spawn(actor.run(command_rx, events));
    (SessionHandle { commands: command_tx, render: render_rx }, task)
}

// =============================================================================
// ACTOR
// =============================================================================

struct SessionActor {
    context: SessionContext,
    format: WireFormat,
    registry: ChannelRegistry,
    transport: Arc<dyn Transport>,
    core: EngineCore,
    render_tx: watch::Sender<RenderState>,
    tick_deadline: Option<Instant>,
    dirty: bool,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, mut events: mpsc::Receiver<TransportEvent>) {
        let mut nickname_rx = self.context.subscribe();
        let nickname = nickname_rx.borrow_and_update().clone();
        let actions = self.core.set_nickname(&nickname);
        self.perform(actions).await;
        info!(peer = %self.context.local_peer(), format = ?self.format, "session: started");

        loop {
            let deadline = self.tick_deadline;
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(SessionCommand::Leave) => {
                        self.leave().await;
                        break;
                    }
                    Some(command) => {
                        let actions = self.on_command(command);
                        self.perform(actions).await;
                    }
                },
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("session: transport closed");
                        break;
                    };
                    let actions = self.on_event(event);
                    self.perform(actions).await;
                }
                Ok(()) = nickname_rx.changed() => {
                    let nickname = nickname_rx.borrow_and_update().clone();
                    debug!(%nickname, "session: nickname changed");
                    let actions = self.core.set_nickname(&nickname);
                    self.perform(actions).await;
                }
                () = wait_until(deadline) => {
                    self.tick_deadline = None;
                    let actions = self.core.on_tick(now_ms());
                    self.perform(actions).await;
                }
            }
            self.publish();
        }

        self.publish();
        info!(peer = %self.context.local_peer(), "session: stopped");
    }

    fn on_command(&mut self, command: SessionCommand) -> Vec<Action> {
        match command {
            SessionCommand::Pointer(event) => self.core.on_local_pointer(event, now_ms()),
            SessionCommand::ContainerResized(size) => self.core.on_container_resize(size),
            SessionCommand::ElementResized(size) => self.core.on_element_resize(size),
            SessionCommand::VideoResized(size) => self.core.on_video_resize(size),
            SessionCommand::SetFitPolicy(fit) => self.core.set_fit_policy(fit),
            SessionCommand::Leave | SessionCommand::Shutdown => Vec::new(),
        }
    }

    fn on_event(&mut self, event: TransportEvent) -> Vec<Action> {
        match event {
            TransportEvent::PeerJoined { peer } => {
                debug!(%peer, "session: peer joined");
                self.registry.peer_joined(&peer);
                self.core.announce()
            }
            TransportEvent::ChannelOpened { peer, topic } => {
                self.registry.channel_opened(&peer, &topic);
                Vec::new()
            }
            TransportEvent::Message { peer, topic, payload } => {
                if !self.registry.accepts(&peer, &topic) {
                    debug!(%peer, %topic, "session: ignoring frame on closed channel");
                    return Vec::new();
                }
                match cursor::decode_inbound(self.format, &peer, &topic, &payload) {
                    Some(message) => self.core.apply_message(&peer, message, now_ms()),
                    None => Vec::new(),
                }
            }
            TransportEvent::ChannelClosed { peer, topic } => {
                debug!(%peer, %topic, "session: channel closed");
                self.registry.channel_closed(&peer, &topic);
                self.core.remove_peer(&peer)
            }
            TransportEvent::ChannelError { peer, topic, error } => {
                warn!(%peer, %topic, %error, "session: channel error");
                self.registry.channel_closed(&peer, &topic);
                self.core.remove_peer(&peer)
            }
            TransportEvent::PeerRemoved { peer } => {
                debug!(%peer, "session: peer removed");
                self.registry.peer_removed(&peer);
                self.core.remove_peer(&peer)
            }
            TransportEvent::Reset => {
                info!("session: transport reset; dropping remote state");
                self.registry.reset();
                self.core.clear()
            }
        }
    }

    async fn perform(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Send(message) => {
                    if let Err(e) = cursor::broadcast(self.transport.as_ref(), self.format, &message).await {
                        debug!(kind = cursor::message_kind(&message), error = %e, "session: send dropped");
                    }
                }
                Action::ScheduleTick { at_ms } => {
                    let delay = Duration::from_millis(at_ms.saturating_sub(now_ms()));
                    self.tick_deadline = Some(Instant::now() + delay);
                }
                Action::RenderNeeded => self.dirty = true,
            }
        }
    }

    async fn leave(&mut self) {
        let mut actions = vec![Action::Send(WireMessage::Hide)];
        actions.extend(self.core.clear());
        self.perform(actions).await;
        self.tick_deadline = None;
        for topic in POINTER_TOPICS {
            if let Err(e) = self.transport.close_topic(topic).await {
                debug!(%topic, error = %e, "session: close failed");
            }
        }
        if let Err(e) = self.transport.shutdown().await {
            debug!(error = %e, "session: transport shutdown failed");
        }
        info!(peer = %self.context.local_peer(), "session: left");
    }

    fn publish(&mut self) {
        if self.dirty {
            self.dirty = false;
            self.render_tx.send_replace(self.core.render_state());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Wall-clock milliseconds; click timestamps are compared across peers.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
