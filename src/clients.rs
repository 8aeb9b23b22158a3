use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::ConnectorType;

pub type ClientId = u64;

#[derive(Clone, Debug, PartialEq)]
pub struct Client {
    pub id: ClientId,
    pub connector: ConnectorType,
    pub arrival: f64,
    pub post: usize,
    pub validation_end: f64,
    pub charge_minutes: f64,
    pub price: f64,
    pub charge_end: Option<f64>,
}

/// Clients currently holding a post, keyed by id.
#[derive(Clone, Debug)]
pub struct ClientTracker {
    next_id: ClientId,
    clients: BTreeMap<ClientId, Client>,
}

impl Default for ClientTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientTracker {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            clients: BTreeMap::new(),
        }
    }

    /// Id the next admitted client will receive.
    pub fn peek_id(&self) -> ClientId {
        self.next_id
    }

    pub fn admit(&mut self, client: Client) -> Result<ClientId> {
        let id = self.peek_id();
        if client.id != id {
            return Err(Error::InvariantViolation(format!(
                "client admitted as {} but next id is {}",
                client.id, id
            )));
        }
        self.next_id = id + 1;
        self.clients.insert(id, client);
        Ok(id)
    }

    pub fn get(&self, id: ClientId) -> Result<&Client> {
        self.clients.get(&id).ok_or_else(|| unknown_client(id))
    }

    pub fn get_mut(&mut self, id: ClientId) -> Result<&mut Client> {
        self.clients.get_mut(&id).ok_or_else(|| unknown_client(id))
    }

    pub fn remove(&mut self, id: ClientId) -> Result<Client> {
        self.clients.remove(&id).ok_or_else(|| unknown_client(id))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn unknown_client(id: ClientId) -> Error {
    Error::InvariantViolation(format!("client {} is not in the system", id))
}
