//! One open chat panel: the selected room, its reconciled messages, the live
//! subscription and the composer.
//!
//! Every store call runs on its own task and reports back through a channel,
//! tagged with the selection it was made for. Completions therefore arrive in
//! whatever order the store resolves them, and the ones that no longer match
//! the selection are dropped. At most one subscription is held, and it is
//! always released before another is opened.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    backend::{DataStore, RealtimeFeed, Subscription},
    db::{Message, RoomDetail},
    error::{StoreError, SubscriptionError},
};

use super::{
    composer::Composer,
    membership::{self, Joined},
    msg,
    reconciler::{LoadTicket, MessageStream},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Select { room_id: Uuid },
    Join,
    Send { content: String },
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    Room {
        room_id: Uuid,
        name: String,
        members: Vec<String>,
        is_member: bool,
        messages: Vec<String>,
    },
    Message {
        id: Uuid,
        html: String,
    },
    Composer {
        draft: String,
    },
    Notice {
        text: String,
    },
    Error {
        text: String,
    },
}

enum Completion {
    Loaded(LoadTicket, Result<RoomDetail, StoreError>),
    CaughtUp(LoadTicket, Result<RoomDetail, StoreError>),
    Joined(Uuid, Result<Joined, StoreError>),
    Sent(Uuid, String, Result<Message, StoreError>),
}

pub struct ChatWindow<S: DataStore, F: RealtimeFeed> {
    store: S,
    feed: F,
    stream: MessageStream,
    composer: Composer,
    subscription: Option<F::Subscription>,
    joining: bool,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S: DataStore, F: RealtimeFeed> ChatWindow<S, F> {
    pub fn new(store: S, feed: F, user_id: Uuid) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            feed,
            stream: MessageStream::new(user_id),
            composer: Composer::default(),
            subscription: None,
            joining: false,
            tx,
            rx,
        }
    }

    pub fn stream(&self) -> &MessageStream {
        &self.stream
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// The room the live subscription is for, if one is held.
    pub fn subscribed_to(&self) -> Option<Uuid> {
        self.subscription.as_ref().map(|s| s.room_id())
    }

    pub fn handle(&mut self, command: Command) -> Vec<Update> {
        match command {
            Command::Select { room_id } => {
                self.unsubscribe();
                self.joining = false;
                let ticket = self.stream.select(room_id);
                tracing::debug!(%room_id, user_id = %self.stream.user_id(), "selected room");
                self.spawn_load(ticket, Completion::Loaded);
                vec![]
            }
            Command::Join => self.join(),
            Command::Send { content } => {
                self.composer.set_draft(content);
                self.send()
            }
            Command::Close => {
                self.unsubscribe();
                self.stream.deselect();
                vec![]
            }
        }
    }

    /// Waits for the next store completion or live insert and returns what changed.
    pub async fn next(&mut self) -> Vec<Update> {
        tokio::select! {
            Some(done) = self.rx.recv() => self.complete(done),
            message = next_insert(&mut self.subscription) => self.on_insert(message),
        }
    }

    fn join(&mut self) -> Vec<Update> {
        let Some(room_id) = self.stream.selected().filter(|_| self.stream.is_loaded()) else {
            return vec![error("Pick a room first.")];
        };
        if self.joining {
            return vec![];
        }
        self.joining = true;

        let store = self.store.clone();
        let user_id = self.stream.user_id();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = membership::join(&store, room_id, user_id).await;
            let _ = tx.send(Completion::Joined(room_id, result));
        });
        vec![]
    }

    fn send(&mut self) -> Vec<Update> {
        let Some(room_id) = self.stream.selected().filter(|_| self.stream.is_member()) else {
            return vec![error("Join the room to send messages.")];
        };
        let Some(content) = self.composer.submit() else {
            return vec![];
        };

        let store = self.store.clone();
        let sender_id = self.stream.user_id();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = store.insert_message(room_id, sender_id, &content).await;
            let _ = tx.send(Completion::Sent(room_id, content, result));
        });

        vec![Update::Composer { draft: String::new() }]
    }

    fn complete(&mut self, done: Completion) -> Vec<Update> {
        match done {
            Completion::Loaded(ticket, Ok(detail)) => {
                if !self.stream.apply_load(&ticket, detail) {
                    tracing::debug!(room_id = %ticket.room_id, "dropping stale room load");
                    return vec![];
                }
                self.sync_subscription();
                vec![self.room_update()]
            }
            Completion::Loaded(ticket, Err(err)) => {
                if !self.stream.is_current(&ticket) {
                    return vec![];
                }
                tracing::warn!(room_id = %ticket.room_id, "couldn't load room: {err}");
                if self.stream.is_loaded() {
                    // a failed refresh leaves the view and its subscription as they were
                    return vec![error("Couldn't refresh this room.")];
                }
                self.unsubscribe();
                match err {
                    StoreError::NotFound(_) => vec![error("This room doesn't exist anymore.")],
                    _ => vec![error("Couldn't load this room.")],
                }
            }
            Completion::CaughtUp(ticket, Ok(detail)) => self
                .stream
                .apply_catch_up(&ticket, detail.messages)
                .iter()
                .map(|message| self.message_update(message))
                .collect(),
            Completion::CaughtUp(ticket, Err(err)) => {
                tracing::warn!(room_id = %ticket.room_id, "couldn't catch up on room: {err}");
                vec![]
            }
            Completion::Joined(room_id, result) => {
                if self.stream.selected() != Some(room_id) {
                    return vec![];
                }
                self.joining = false;
                match result {
                    Ok(joined) => {
                        if let Some(ticket) = self.stream.refresh() {
                            self.spawn_load(ticket, Completion::Loaded);
                        }
                        match joined {
                            Joined::Now => vec![],
                            Joined::Already => vec![notice("You are already a member of this room.")],
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%room_id, "couldn't join room: {err}");
                        vec![error("Couldn't join this room.")]
                    }
                }
            }
            Completion::Sent(room_id, content, result) => match result {
                Ok(message) => {
                    tracing::debug!(%room_id, message_id = %message.id, "message stored");
                    vec![]
                }
                Err(err) => {
                    tracing::warn!(%room_id, "couldn't send message: {err}");
                    let mut updates = vec![error("Couldn't send your message.")];
                    if self.composer.restore(content) {
                        updates.push(Update::Composer { draft: self.composer.draft().to_owned() });
                    }
                    updates
                }
            },
        }
    }

    fn on_insert(&mut self, message: Result<Message, SubscriptionError>) -> Vec<Update> {
        let message = match message {
            Ok(message) => message,
            Err(SubscriptionError::Lagged(_)) => {
                // skipped inserts are still in the store
                if let Some(ticket) = self.stream.catch_up_ticket() {
                    self.spawn_load(ticket, Completion::CaughtUp);
                }
                return vec![];
            }
            Err(SubscriptionError::Closed) => {
                let room_id = self.subscribed_to();
                tracing::warn!(?room_id, "live updates stopped");
                self.subscription = None;
                return vec![notice("Live updates stopped. Reopen the room to resume.")];
            }
        };

        if !self.stream.apply_insert(message.clone()) {
            return vec![];
        }
        vec![self.message_update(&message)]
    }

    /// Holds a subscription exactly when the user is a member of the selected room.
    fn sync_subscription(&mut self) {
        let wanted = self.stream.selected().filter(|_| self.stream.is_member());

        match (self.subscribed_to(), wanted) {
            (Some(current), Some(room_id)) if current == room_id => {}
            (_, Some(room_id)) => {
                self.unsubscribe();
                self.subscription = Some(self.feed.subscribe(room_id));
            }
            (_, None) => {
                self.unsubscribe();
                return;
            }
        }

        // anything stored between the load and the subscription going live
        if let Some(ticket) = self.stream.catch_up_ticket() {
            self.spawn_load(ticket, Completion::CaughtUp);
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    fn spawn_load(&self, ticket: LoadTicket, done: fn(LoadTicket, Result<RoomDetail, StoreError>) -> Completion) {
        let store = self.store.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = store.room_detail(ticket.room_id).await;
            let _ = tx.send(done(ticket, result));
        });
    }

    fn room_update(&self) -> Update {
        let me = self.stream.user_id();
        let members = self.stream.members();
        let (room_id, name) = match self.stream.room() {
            Some(room) => (room.id, room.name.clone()),
            None => (Uuid::nil(), String::new()),
        };

        Update::Room {
            room_id,
            name,
            members: members.iter().map(|m| m.username.clone()).collect(),
            is_member: self.stream.is_member(),
            messages: self
                .stream
                .messages()
                .iter()
                .map(|message| msg::msg_to_html(message, members, me))
                .collect(),
        }
    }

    fn message_update(&self, message: &Message) -> Update {
        Update::Message {
            id: message.id,
            html: msg::msg_to_html(message, self.stream.members(), self.stream.user_id()),
        }
    }
}

async fn next_insert<T: Subscription>(subscription: &mut Option<T>) -> Result<Message, SubscriptionError> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn notice(text: &str) -> Update {
    Update::Notice { text: text.to_owned() }
}

fn error(text: &str) -> Update {
    Update::Error { text: text.to_owned() }
}
