//! The local view of one room's messages.
//!
//! Three things feed it: the history fetched when a room is selected, live
//! inserts from the realtime feed, and catch-up fetches made once the feed is
//! live. All of them merge by message id, so an entry shows up at most once no
//! matter how often or in which order the same row arrives. The stream is
//! scoped to the selected room; selecting another room starts a new
//! generation and anything still in flight for the old one is ignored.

use std::collections::HashSet;

use uuid::Uuid;

use crate::db::{Member, Message, Room, RoomDetail};

use super::membership;

/// Identifies which selection a fetch was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub room_id: Uuid,
    generation: u64,
}

#[derive(Debug)]
pub struct MessageStream {
    user_id: Uuid,
    selected: Option<Uuid>,
    generation: u64,
    loaded: bool,
    room: Option<Room>,
    members: Vec<Member>,
    is_member: bool,
    messages: Vec<Message>,
    seen: HashSet<Uuid>,
}

impl MessageStream {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            selected: None,
            generation: 0,
            loaded: false,
            room: None,
            members: Vec::new(),
            is_member: false,
            messages: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True once the selected room's detail has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_member(&self) -> bool {
        self.loaded && self.is_member
    }

    /// Switches to `room_id`, dropping everything known about the previous room.
    pub fn select(&mut self, room_id: Uuid) -> LoadTicket {
        self.clear();
        self.selected = Some(room_id);
        self.next_ticket(room_id)
    }

    /// A ticket for re-fetching the selected room, superseding earlier ones.
    pub fn refresh(&mut self) -> Option<LoadTicket> {
        let room_id = self.selected?;
        Some(self.next_ticket(room_id))
    }

    fn next_ticket(&mut self, room_id: Uuid) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            room_id,
            generation: self.generation,
        }
    }

    /// A ticket for a fetch that merges into the current view without replacing it.
    pub fn catch_up_ticket(&self) -> Option<LoadTicket> {
        self.selected.map(|room_id| LoadTicket {
            room_id,
            generation: self.generation,
        })
    }

    pub fn deselect(&mut self) {
        self.clear();
        self.selected = None;
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.loaded = false;
        self.room = None;
        self.members.clear();
        self.is_member = false;
        self.messages.clear();
        self.seen.clear();
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.selected == Some(ticket.room_id) && self.generation == ticket.generation
    }

    /// Replaces the view with freshly fetched detail. Returns false, changing
    /// nothing, if the ticket has been superseded.
    pub fn apply_load(&mut self, ticket: &LoadTicket, detail: RoomDetail) -> bool {
        if !self.is_current(ticket) || detail.room.id != ticket.room_id {
            return false;
        }

        self.is_member = membership::is_member(&detail, self.user_id);
        let RoomDetail { room, members, messages } = detail;
        self.room = Some(room);
        self.members = members;
        self.messages.clear();
        self.seen.clear();
        for message in messages {
            self.push_unseen(message);
        }
        self.loaded = true;
        true
    }

    /// Appends a live insert unless it belongs elsewhere or is already shown.
    pub fn apply_insert(&mut self, message: Message) -> bool {
        if !self.loaded || self.selected != Some(message.room_id) {
            return false;
        }
        self.push_unseen(message)
    }

    /// Merges a re-fetch of the history, appending only unseen messages.
    /// Returns the messages that were new.
    pub fn apply_catch_up(&mut self, ticket: &LoadTicket, messages: Vec<Message>) -> Vec<Message> {
        if !self.loaded || !self.is_current(ticket) {
            return Vec::new();
        }

        let mut added = Vec::new();
        for message in messages {
            if message.room_id == ticket.room_id && self.push_unseen(message.clone()) {
                added.push(message);
            }
        }
        added
    }

    fn push_unseen(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    struct Fixture {
        me: Uuid,
        room_a: Room,
        room_b: Room,
    }

    fn room(name: &str) -> Room {
        Room {
            id: Uuid::now_v7(),
            name: name.to_owned(),
            created_at: OffsetDateTime::now_utc(),
            tags: Vec::new(),
            created_by: Uuid::now_v7(),
        }
    }

    fn fixture() -> Fixture {
        Fixture {
            me: Uuid::now_v7(),
            room_a: room("a"),
            room_b: room("b"),
        }
    }

    fn member(user_id: Uuid) -> Member {
        Member {
            user_id,
            username: "me".to_owned(),
            email: "me@example.com".to_owned(),
            joined_at: OffsetDateTime::now_utc(),
        }
    }

    fn message(room: &Room, content: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_id: room.id,
            sender_id: Uuid::now_v7(),
            content: content.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn detail(room: &Room, members: Vec<Member>, messages: Vec<Message>) -> RoomDetail {
        RoomDetail {
            room: room.clone(),
            members,
            messages,
        }
    }

    fn ids(stream: &MessageStream) -> Vec<Uuid> {
        stream.messages().iter().map(|m| m.id).collect()
    }

    #[test]
    fn load_replaces_and_keeps_fetch_order() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);
        let one = message(&f.room_a, "one");
        let two = message(&f.room_a, "two");

        let ticket = stream.select(f.room_a.id);
        assert!(stream.apply_load(&ticket, detail(&f.room_a, vec![member(f.me)], vec![two.clone(), one.clone(), two.clone()])));

        assert_eq!(ids(&stream), [two.id, one.id]);
        assert!(stream.is_member());
    }

    #[test]
    fn inserts_merge_idempotently_with_history() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);
        let old = message(&f.room_a, "old");
        let live = message(&f.room_a, "live");

        let ticket = stream.select(f.room_a.id);
        stream.apply_load(&ticket, detail(&f.room_a, vec![member(f.me)], vec![old.clone()]));

        assert!(!stream.apply_insert(old.clone()));
        assert!(stream.apply_insert(live.clone()));
        assert!(!stream.apply_insert(live.clone()));
        let ticket = stream.catch_up_ticket().unwrap();
        assert!(stream.apply_catch_up(&ticket, vec![old.clone(), live.clone()]).is_empty());

        assert_eq!(ids(&stream), [old.id, live.id]);
    }

    #[test]
    fn any_interleaving_shows_each_id_once() {
        let f = fixture();
        let history: Vec<_> = (0..5).map(|i| message(&f.room_a, &i.to_string())).collect();

        for start in 0..history.len() {
            let mut stream = MessageStream::new(f.me);
            let ticket = stream.select(f.room_a.id);
            stream.apply_load(&ticket, detail(&f.room_a, vec![member(f.me)], history[..start].to_vec()));

            for m in history.iter().rev().chain(history.iter()) {
                stream.apply_insert(m.clone());
            }

            let mut got = ids(&stream);
            assert_eq!(got.len(), history.len());
            got.sort();
            got.dedup();
            assert_eq!(got.len(), history.len());
        }
    }

    #[test]
    fn late_load_for_previous_room_is_ignored() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);

        let ticket_a = stream.select(f.room_a.id);
        let ticket_b = stream.select(f.room_b.id);
        let b_msg = message(&f.room_b, "b");
        assert!(stream.apply_load(&ticket_b, detail(&f.room_b, vec![], vec![b_msg.clone()])));

        assert!(!stream.apply_load(&ticket_a, detail(&f.room_a, vec![member(f.me)], vec![message(&f.room_a, "a")])));
        assert_eq!(stream.room().unwrap().id, f.room_b.id);
        assert_eq!(ids(&stream), [b_msg.id]);
        assert!(!stream.is_member());
    }

    #[test]
    fn late_event_for_previous_room_is_ignored() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);

        let ticket = stream.select(f.room_a.id);
        stream.apply_load(&ticket, detail(&f.room_a, vec![member(f.me)], vec![]));
        let ticket = stream.select(f.room_b.id);
        stream.apply_load(&ticket, detail(&f.room_b, vec![member(f.me)], vec![]));

        assert!(!stream.apply_insert(message(&f.room_a, "late")));
        assert!(stream.messages().is_empty());
    }

    #[test]
    fn superseded_refresh_is_ignored() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);

        let first = stream.select(f.room_a.id);
        let second = stream.refresh().unwrap();
        assert!(stream.apply_load(&second, detail(&f.room_a, vec![member(f.me)], vec![])));
        assert!(!stream.apply_load(&first, detail(&f.room_a, vec![], vec![])));
        assert!(stream.is_member());
    }

    #[test]
    fn events_before_the_first_load_are_dropped() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);
        stream.select(f.room_a.id);

        assert!(!stream.apply_insert(message(&f.room_a, "early")));
        assert!(!stream.is_member());
    }

    #[test]
    fn catch_up_appends_only_unseen() {
        let f = fixture();
        let mut stream = MessageStream::new(f.me);
        let one = message(&f.room_a, "one");
        let two = message(&f.room_a, "two");
        let ticket = stream.select(f.room_a.id);
        stream.apply_load(&ticket, detail(&f.room_a, vec![member(f.me)], vec![one.clone()]));

        let ticket = stream.catch_up_ticket().unwrap();
        let added = stream.apply_catch_up(&ticket, vec![one.clone(), two.clone()]);
        assert_eq!(added, vec![two.clone()]);
        assert_eq!(ids(&stream), [one.id, two.id]);

        let stale = stream.catch_up_ticket().unwrap();
        stream.select(f.room_b.id);
        assert!(stream.apply_catch_up(&stale, vec![message(&f.room_a, "x")]).is_empty());
    }
}
