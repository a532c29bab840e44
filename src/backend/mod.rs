//! The hosted collaborators the chat front-end talks to: a relational store and
//! a realtime change feed over the `messages` table.

mod realtime;
mod sqlite;

use std::future::Future;

use uuid::Uuid;

use crate::{
    db::{Message, Profile, Room, RoomDetail},
    error::{StoreError, SubscriptionError},
};

pub use realtime::{BroadcastFeed, BroadcastSubscription};
pub use sqlite::SqliteStore;

pub trait DataStore: Clone + Send + Sync + 'static {
    /// All rooms, newest first.
    fn list_rooms(&self) -> impl Future<Output = Result<Vec<Room>, StoreError>> + Send;

    fn insert_room(
        &self,
        name: &str,
        tags: &[String],
        created_by: Uuid,
    ) -> impl Future<Output = Result<Room, StoreError>> + Send;

    fn delete_room(&self, room_id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails with `StoreError::Duplicate` if the user already is a member.
    fn insert_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The room with its roster and its messages in insertion order.
    fn room_detail(&self, room_id: Uuid) -> impl Future<Output = Result<RoomDetail, StoreError>> + Send;

    /// Stores the message and, once committed, publishes it on the realtime feed.
    fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> impl Future<Output = Result<Message, StoreError>> + Send;

    fn profile(&self, user_id: Uuid) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send;
}

pub trait RealtimeFeed: Clone + Send + Sync + 'static {
    type Subscription: Subscription;

    /// Opens a subscription to message inserts for one room.
    fn subscribe(&self, room_id: Uuid) -> Self::Subscription;
}

/// A live subscription. Dropping it unsubscribes.
pub trait Subscription: Send + 'static {
    fn room_id(&self) -> Uuid;

    /// The next insert for this room. `Lagged` means inserts were skipped and
    /// the subscription carries on; `Closed` means it is dead for good.
    fn recv(&mut self) -> impl Future<Output = Result<Message, SubscriptionError>> + Send;

    fn unsubscribe(self)
    where
        Self: Sized,
    {
        drop(self)
    }
}
