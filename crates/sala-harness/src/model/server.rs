//! Model chat server.

use std::collections::{BTreeMap, BTreeSet};

use super::operation::{ClientId, Operation};

/// Lines received by each client during one operation, in order.
pub type Deliveries = BTreeMap<ClientId, Vec<String>>;

/// Model state of one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelClient {
    /// Whether the client has an open connection.
    pub connected: bool,
    /// Nickname, once claimed.
    pub nickname: Option<String>,
    /// Room, while inside one.
    pub room: Option<String>,
}

/// Reference chat server.
#[derive(Debug, Clone)]
pub struct ModelServer {
    /// Clients indexed by [`ClientId`]; disconnected ones keep their slot.
    clients: Vec<ModelClient>,
}

impl ModelServer {
    /// Create a model with `num_clients` disconnected clients.
    pub fn new(num_clients: usize) -> Self {
        Self { clients: vec![ModelClient::default(); num_clients] }
    }

    /// All client slots.
    pub fn clients(&self) -> &[ModelClient] {
        &self.clients
    }

    /// Client by id.
    pub fn client(&self, id: ClientId) -> Option<&ModelClient> {
        self.clients.get(usize::from(id))
    }

    /// Connected clients currently in `room`.
    pub fn room_members(&self, room: &str) -> BTreeSet<ClientId> {
        self.ids()
            .filter(|id| self.clients[usize::from(*id)].room.as_deref() == Some(room))
            .collect()
    }

    /// Apply an operation and return what every client receives.
    ///
    /// Operations for a disconnected client (other than `Connect`) do
    /// nothing.
    pub fn apply(&mut self, op: &Operation) -> Deliveries {
        let mut out = Deliveries::new();
        let id = op.client_id();
        let Some(connected) = self.client(id).map(|c| c.connected) else {
            return out;
        };

        if let Operation::Connect { .. } = op {
            if !connected {
                *self.slot(id) = ModelClient { connected: true, ..ModelClient::default() };
            }
            return out;
        }
        if !connected {
            return out;
        }

        match op {
            Operation::Connect { .. } => {},
            Operation::Disconnect { .. } => self.drop_client(id, None, &mut out),
            Operation::Bye { .. } => self.drop_client(id, Some("BYE"), &mut out),
            Operation::Nick { name, .. } => self.nick(id, name.as_str(), &mut out),
            Operation::NickWithoutName { .. } => reply(&mut out, id, "ERROR Nome inválido"),
            Operation::Join { room, .. } => self.join(id, room.as_str(), &mut out),
            Operation::Leave { .. } => self.leave(id, &mut out),
            Operation::Say { text, .. } => self.say(id, text.as_str(), &mut out),
            Operation::Private { target, text, .. } => {
                self.private(id, target.as_str(), text.as_str(), &mut out);
            },
        }
        out
    }

    fn ids(&self) -> impl Iterator<Item = ClientId> + '_ {
        (0..self.clients.len())
            .filter(|i| self.clients[*i].connected)
            .map(|i| ClientId::try_from(i).unwrap_or(ClientId::MAX))
    }

    /// Connected client holding `nickname`.
    fn holder_of(&self, nickname: &str) -> Option<ClientId> {
        self.ids().find(|id| self.clients[usize::from(*id)].nickname.as_deref() == Some(nickname))
    }

    fn slot(&mut self, id: ClientId) -> &mut ModelClient {
        &mut self.clients[usize::from(id)]
    }

    /// Send `line` to everyone in `room` except `except`.
    fn announce(&self, room: &str, except: ClientId, line: &str, out: &mut Deliveries) {
        for member in self.room_members(room) {
            if member != except {
                reply(out, member, line);
            }
        }
    }

    fn nick(&mut self, id: ClientId, name: &str, out: &mut Deliveries) {
        if self.holder_of(name).is_some() {
            reply(out, id, "ERROR Nome já em uso");
            return;
        }

        let client = self.slot(id);
        let old = client.nickname.replace(name.to_owned());
        let room = client.room.clone();
        if let (Some(old), Some(room)) = (old, room) {
            self.announce(&room, id, &format!("NEWNICK {old} {name}"), out);
        }
        reply(out, id, "OK");
    }

    fn join(&mut self, id: ClientId, room: &str, out: &mut Deliveries) {
        let client = self.slot(id).clone();
        let Some(nickname) = client.nickname else {
            reply(out, id, "ERROR Comando não permitido neste estado");
            return;
        };

        if let Some(current) = client.room {
            self.slot(id).room = None;
            self.announce(&current, id, &format!("LEFT {nickname}"), out);
        }
        self.slot(id).room = Some(room.to_owned());
        self.announce(room, id, &format!("JOINED {nickname}"), out);
        reply(out, id, "OK");
    }

    fn leave(&mut self, id: ClientId, out: &mut Deliveries) {
        let client = self.slot(id).clone();
        let (Some(nickname), Some(room)) = (client.nickname, client.room) else {
            reply(out, id, "ERROR Não está numa sala");
            return;
        };

        self.slot(id).room = None;
        self.announce(&room, id, &format!("LEFT {nickname}"), out);
        reply(out, id, "OK");
    }

    fn say(&mut self, id: ClientId, text: &str, out: &mut Deliveries) {
        let client = self.slot(id).clone();
        match (client.nickname, client.room) {
            (Some(nickname), Some(room)) => {
                let text = match text.strip_prefix('/') {
                    Some(rest) if rest.starts_with('/') => rest,
                    _ => text,
                };
                self.announce(&room, id, &format!("MESSAGE {nickname} {text}"), out);
            },
            _ if text.starts_with('/') => reply(out, id, "ERROR Comando não suportado"),
            _ => reply(out, id, "ERROR Não está numa sala"),
        }
    }

    fn private(&mut self, id: ClientId, target: &str, text: &str, out: &mut Deliveries) {
        let Some(nickname) = self.slot(id).nickname.clone() else {
            reply(out, id, "ERROR Comando não permitido neste estado");
            return;
        };

        match self.holder_of(target) {
            Some(recipient) => {
                reply(out, recipient, &format!("PRIVATE {nickname} {text}"));
                reply(out, id, "OK");
            },
            None => reply(out, id, "ERROR Utilizador não encontrado"),
        }
    }

    /// End a client's connection, optionally sending a last line.
    fn drop_client(&mut self, id: ClientId, farewell: Option<&str>, out: &mut Deliveries) {
        let client = std::mem::take(self.slot(id));
        if let (Some(nickname), Some(room)) = (client.nickname, client.room) {
            self.announce(&room, id, &format!("LEFT {nickname}"), out);
        }
        if let Some(line) = farewell {
            reply(out, id, line);
        }
    }
}

fn reply(out: &mut Deliveries, to: ClientId, line: &str) {
    out.entry(to).or_default().push(line.to_owned());
}
