//! Chat server: accept loop, identification gate, room membership and
//! message routing.
//!
//! All mutable state lives in a [`ServerState`] owned exclusively by the
//! server task. Per-connection tasks decode frames and forward them over a
//! channel; handlers run to completion on the server task without awaiting,
//! so every (decode → dispatch → mutation → replies) step is atomic with
//! respect to other connections and no locks are needed. Sending is
//! fire-and-forget: frames are queued for the connection task to write.

mod room;

pub use room::Room;

use crate::connection::Connection;
use crate::frame::Frame;
use crate::message::{self, tags};
use bytes::Bytes;
use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Stable identifier for one accepted connection. Rooms hold these instead
/// of references; a broadcast that finds the id gone simply skips it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    #[cfg(test)]
    pub(crate) fn for_tests(id: u64) -> ConnId {
        ConnId(id)
    }
}

/// Frames (or the close marker) queued for one connection's writer.
#[derive(Debug)]
enum Outbound {
    Frame(Frame),
    Shutdown,
}

#[derive(Debug)]
enum Event {
    Inbound(ConnId, Frame),
    Disconnected(ConnId),
}

/// A dispatch table entry. Handlers run synchronously on the server task; an
/// `Err` is fatal to the offending connection, never to the server.
pub type Handler = Box<dyn Fn(&mut ServerState, ConnId, &Frame) -> crate::Result<()> + Send>;

/// The chat server. Holds the dispatch table from handler tag to handler,
/// built once at construction; [`Server::with_handler`] overlays entries on
/// the base table.
pub struct Server {
    handlers: HashMap<String, Handler>,
}

impl Server {
    pub fn new() -> Server {
        let mut server = Server {
            handlers: HashMap::new(),
        };
        server.install(tags::ECHO, handle_echo);
        server.install(tags::TERMINATE, handle_terminate);
        server.install(tags::IDENTIFY, handle_identify);
        server.install(tags::CREATE_ROOM, handle_create_room);
        server.install(tags::LIST_ROOMS, handle_list_rooms);
        server.install(tags::JOIN_ROOM, handle_join_room);
        server.install(tags::LEAVE_ROOM, handle_leave_room);
        server.install(tags::ROOM_MEMBERS, handle_room_members);
        server.install(tags::MSG_ROOM, handle_msg_room);
        server.install(tags::MSG_CLIENT, handle_msg_client);
        server
    }

    fn install(
        &mut self,
        tag: &str,
        handler: fn(&mut ServerState, ConnId, &Frame) -> crate::Result<()>,
    ) {
        self.handlers.insert(tag.to_string(), Box::new(handler));
    }

    /// Override a base entry, or extend the table with a new verb.
    pub fn with_handler(mut self, tag: impl Into<String>, handler: Handler) -> Server {
        self.handlers.insert(tag.into(), handler);
        self
    }

    /// Serve connections accepted from `listener` until it fails.
    pub async fn run(self, listener: TcpListener) -> crate::Result<()> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut state = ServerState::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, addr) = accepted?;
                    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                    let id = state.register(outbound_tx);
                    info!(%addr, "connection accepted");
                    tokio::spawn(drive_connection(
                        id,
                        Connection::new(socket),
                        events_tx.clone(),
                        outbound_rx,
                    ));
                }
                Some(event) = events_rx.recv() => match event {
                    Event::Inbound(id, frame) => self.dispatch(&mut state, id, frame),
                    Event::Disconnected(id) => state.remove(id),
                },
            }
        }
    }

    fn dispatch(&self, state: &mut ServerState, id: ConnId, frame: Frame) {
        match self.handlers.get(frame.handler.as_str()) {
            Some(handler) => {
                if let Err(err) = handler(state, id, &frame) {
                    warn!(tag = %frame.handler, error = %err, "handler failed; closing connection");
                    state.close(id);
                }
            }
            None => {
                warn!(tag = %frame.handler, "handler not found");
                state.send(id, message::not_found());
            }
        }
    }
}

impl Default for Server {
    fn default() -> Server {
        Server::new()
    }
}

/// Mutable server state: one entry per live connection plus the client and
/// room registries. Handlers (including overlay handlers) mutate it through
/// the methods below.
pub struct ServerState {
    next_id: u64,
    peers: HashMap<ConnId, Peer>,
    clients: HashMap<String, ConnId>,
    // Insertion-ordered so room listings come back in creation order.
    rooms: IndexMap<String, Room>,
}

struct Peer {
    name: String,
    identified: bool,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ServerState {
    fn new() -> ServerState {
        ServerState {
            next_id: 0,
            peers: HashMap::new(),
            clients: HashMap::new(),
            rooms: IndexMap::new(),
        }
    }

    fn register(&mut self, outbound: mpsc::UnboundedSender<Outbound>) -> ConnId {
        let id = ConnId(self.next_id);
        self.next_id += 1;
        self.peers.insert(
            id,
            Peer {
                name: String::new(),
                identified: false,
                outbound,
            },
        );
        id
    }

    /// Drops the connection entry and releases its name. Room membership is
    /// left in place; broadcasts prune it when they next touch the room.
    fn remove(&mut self, id: ConnId) {
        if let Some(peer) = self.peers.remove(&id) {
            if peer.identified && self.clients.get(&peer.name) == Some(&id) {
                self.clients.remove(&peer.name);
            }
            debug!(?id, name = %peer.name, "connection closed");
        }
    }

    /// Queue a frame for delivery to `id`. Fire-and-forget; the return value
    /// reports whether the connection's writer is still accepting frames.
    pub fn send(&mut self, id: ConnId, frame: Frame) -> bool {
        match self.peers.get(&id) {
            Some(peer) => peer.outbound.send(Outbound::Frame(frame)).is_ok(),
            None => false,
        }
    }

    /// Ask the connection task to close the stream after draining its queue.
    pub fn close(&mut self, id: ConnId) {
        if let Some(peer) = self.peers.get(&id) {
            let _ = peer.outbound.send(Outbound::Shutdown);
        }
    }

    pub fn is_identified(&self, id: ConnId) -> bool {
        self.peers.get(&id).is_some_and(|peer| peer.identified)
    }

    /// The name bound to `id`, once identified.
    pub fn client_name(&self, id: ConnId) -> Option<&str> {
        self.peers
            .get(&id)
            .filter(|peer| peer.identified)
            .map(|peer| peer.name.as_str())
    }

    /// Room names in creation order.
    pub fn room_names(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Best-effort fan-out of `body` to every current member of the room.
    /// Members whose connection is gone are skipped and pruned; the sender
    /// never sees an error for them.
    pub fn broadcast(&mut self, room_name: &str, sender: &str, body: Bytes) {
        let Some(room) = self.rooms.get(room_name) else {
            return;
        };
        let frame = message::broadcast(room.name(), sender, body);
        let targets: Vec<(String, ConnId)> = room
            .members()
            .map(|(name, conn)| (name.to_string(), conn))
            .collect();

        let mut stale = Vec::new();
        for (name, conn) in targets {
            let delivered = self
                .peers
                .get(&conn)
                .map(|peer| peer.outbound.send(Outbound::Frame(frame.clone())).is_ok())
                .unwrap_or(false);
            if !delivered {
                stale.push(name);
            }
        }

        if !stale.is_empty() {
            if let Some(room) = self.rooms.get_mut(room_name) {
                for name in stale {
                    debug!(room = %room_name, member = %name, "pruning stale member");
                    room.leave(&name);
                }
            }
        }
    }
}

/// Replies `req_id` and reports `false` when the connection has not yet
/// identified. Every room and messaging verb starts here.
fn gate(state: &mut ServerState, id: ConnId) -> bool {
    if state.is_identified(id) {
        true
    } else {
        state.send(id, message::req_id());
        false
    }
}

fn handle_echo(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    state.send(id, frame.clone());
    Ok(())
}

fn handle_terminate(state: &mut ServerState, id: ConnId, _frame: &Frame) -> crate::Result<()> {
    // The name must be released before any later identify is processed, so
    // the registry entry goes now rather than when the task reports back.
    state.close(id);
    state.remove(id);
    Ok(())
}

fn handle_identify(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    let name = frame.str_payload().into_owned();

    // Empty names and names containing the broadcast origin delimiter are
    // refused outright; `room:sender` headers must stay parseable.
    if name.is_empty() || name.contains(message::ORIGIN_DELIMITER) {
        state.send(id, message::id_taken());
        return Ok(());
    }

    let owner = state.clients.get(&name).copied();
    if matches!(owner, Some(existing) if existing != id) {
        state.send(id, message::id_taken());
        return Ok(());
    }

    if !state.peers.contains_key(&id) {
        return Ok(());
    }

    // Rebinding to a fresh name releases the old one.
    let previous = state
        .peers
        .get(&id)
        .filter(|peer| peer.identified)
        .map(|peer| peer.name.clone());
    if let Some(previous) = previous {
        if previous != name && state.clients.get(&previous) == Some(&id) {
            state.clients.remove(&previous);
        }
    }

    if let Some(peer) = state.peers.get_mut(&id) {
        peer.name = name.clone();
        peer.identified = true;
    }
    state.clients.insert(name, id);
    state.send(id, message::identified());
    Ok(())
}

fn handle_create_room(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    let room_name = frame.str_payload().into_owned();
    state
        .rooms
        .entry(room_name.clone())
        .or_insert_with(|| Room::new(room_name));
    state.send(id, message::room_created());
    Ok(())
}

fn handle_list_rooms(state: &mut ServerState, id: ConnId, _frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    let names: Vec<&str> = state.room_names().collect();
    let reply = message::room_list(&names);
    state.send(id, reply);
    Ok(())
}

fn handle_join_room(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    let Some(client) = state.client_name(id).map(str::to_string) else {
        return Ok(());
    };
    let room_name = frame.str_payload().into_owned();

    // Joining a room that does not exist yet creates it.
    let room = state
        .rooms
        .entry(room_name.clone())
        .or_insert_with(|| Room::new(room_name));
    room.join(client, id);
    state.send(id, message::room_joined());
    Ok(())
}

fn handle_leave_room(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    let Some(client) = state.client_name(id).map(str::to_string) else {
        return Ok(());
    };
    if let Some(room) = state.rooms.get_mut(frame.str_payload().as_ref()) {
        room.leave(&client);
    }
    state.send(id, message::room_left());
    Ok(())
}

fn handle_room_members(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    // A missing room lists as empty.
    let reply = match state.room(frame.str_payload().as_ref()) {
        Some(room) => {
            let names: Vec<&str> = room.clients().collect();
            message::member_list(&names)
        }
        None => message::member_list(&[]),
    };
    state.send(id, reply);
    Ok(())
}

fn handle_msg_room(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    let Some(sender) = state.client_name(id).map(str::to_string) else {
        return Ok(());
    };
    let room_name = frame.str_header().into_owned();

    if state.room(&room_name).is_none() {
        state.send(id, message::no_room(&room_name));
        return Ok(());
    }

    // Every member delivery is queued before the sender's ack, so members
    // observe the broadcast no later than the sender observes the ack.
    state.broadcast(&room_name, &sender, frame.payload.clone());
    state.send(id, message::room_msgd());
    Ok(())
}

fn handle_msg_client(state: &mut ServerState, id: ConnId, frame: &Frame) -> crate::Result<()> {
    if !gate(state, id) {
        return Ok(());
    }

    let Some(sender) = state.client_name(id).map(str::to_string) else {
        return Ok(());
    };
    let target = frame.str_header().into_owned();

    match state.clients.get(&target).copied() {
        Some(dest) => {
            // The body is relayed verbatim, without re-encoding.
            state.send(dest, message::client_msg(&sender, frame.payload.clone()));
            state.send(id, message::client_msgd());
        }
        None => {
            state.send(id, message::no_client(&target));
        }
    }
    Ok(())
}

/// Drives one accepted connection: decoded frames flow to the server task,
/// queued frames flow to the socket. Decode failures and handler failures
/// close only this stream.
async fn drive_connection(
    id: ConnId,
    conn: Connection,
    events: mpsc::UnboundedSender<Event>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let (mut reader, mut writer) = conn.into_split();

    loop {
        tokio::select! {
            inbound = reader.read_frame() => match inbound {
                Ok(Some(frame)) => {
                    if events.send(Event::Inbound(id, frame)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(?id, error = %err, "closing connection after decode failure");
                    break;
                }
            },
            queued = outbound.recv() => match queued {
                Some(Outbound::Frame(frame)) => {
                    if writer.write_frame(&frame).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Shutdown) | None => break,
            },
        }
    }

    let _ = events.send(Event::Disconnected(id));
}
