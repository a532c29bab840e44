use uuid::Uuid;

use crate::{backend::DataStore, db::RoomDetail, error::StoreError};

pub fn is_member(detail: &RoomDetail, user_id: Uuid) -> bool {
    detail.member(user_id).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    Now,
    Already,
}

/// Adds the user to the room. There is no pre-check: the store's duplicate-key
/// error is what says the user was a member all along.
pub async fn join<S: DataStore>(store: &S, room_id: Uuid, user_id: Uuid) -> Result<Joined, StoreError> {
    match store.insert_membership(room_id, user_id).await {
        Ok(()) => {
            tracing::info!(%room_id, %user_id, "joined room");
            Ok(Joined::Now)
        }
        Err(err) if err.is_duplicate() => {
            tracing::info!(%room_id, %user_id, "already a member");
            Ok(Joined::Already)
        }
        Err(err) => Err(err),
    }
}

/// Leaves the room. Not offered while a chat window has the room open.
pub async fn exit<S: DataStore>(store: &S, room_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
    store.delete_membership(room_id, user_id).await?;
    tracing::info!(%room_id, %user_id, "left room");
    Ok(())
}
