use serde::Deserialize;
use uuid::Uuid;

use crate::{backend::DataStore, db::Room, error::StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Name,
    Tag,
}

/// The list of rooms a visitor browses, newest first.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: Vec<Room>,
}

impl RoomDirectory {
    /// Fetches every room. A failed fetch is logged and shows as an empty directory.
    pub async fn load<S: DataStore>(store: &S) -> RoomDirectory {
        match store.list_rooms().await {
            Ok(rooms) => RoomDirectory { rooms },
            Err(err) => {
                tracing::warn!("couldn't list rooms: {err}");
                RoomDirectory::default()
            }
        }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Creates a room with `creator` as its first member and puts it at the top.
    ///
    /// A blank name creates nothing and returns `Ok(None)`. The room and the
    /// creator's membership stand or fall together: if the membership can't be
    /// stored the room is deleted again.
    pub async fn create_room<S: DataStore>(
        &mut self,
        store: &S,
        creator: Uuid,
        name: &str,
        tags: &[String],
    ) -> Result<Option<Room>, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let tags = clean_tags(tags);

        let room = store.insert_room(name, &tags, creator).await?;

        if let Err(err) = store.insert_membership(room.id, creator).await {
            tracing::warn!(room_id = %room.id, %creator, "couldn't add creator to new room: {err}");
            if let Err(undo_err) = store.delete_room(room.id).await {
                tracing::error!(
                    room_id = %room.id,
                    %creator,
                    "room exists but its creator is not a member: {undo_err}"
                );
            }
            return Err(err);
        }

        tracing::info!(room_id = %room.id, name = %room.name, %creator, "created room");
        self.rooms.insert(0, room.clone());
        Ok(Some(room))
    }

    /// Case-insensitive substring match on the name or on any tag. A blank term matches everything.
    pub fn filter(&self, term: &str, mode: FilterMode) -> Vec<&Room> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.rooms.iter().collect();
        }

        self.rooms
            .iter()
            .filter(|room| match mode {
                FilterMode::Name => room.name.to_lowercase().contains(&term),
                FilterMode::Tag => room.tags.iter().any(|tag| tag.to_lowercase().contains(&term)),
            })
            .collect()
    }
}

/// Trimmed, non-empty, first occurrence wins.
pub fn clean_tags<T: AsRef<str>>(tags: &[T]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_owned());
        }
    }
    cleaned
}
