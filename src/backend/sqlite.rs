use sqlx::{SqlitePool, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::{Member, Message, Profile, Room, RoomDetail},
    error::StoreError,
};

use super::{BroadcastFeed, DataStore};

#[derive(Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
    feed: BroadcastFeed,
}

impl SqliteStore {
    pub fn new(db_pool: SqlitePool, feed: BroadcastFeed) -> Self {
        Self { db_pool, feed }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }
}

impl DataStore for SqliteStore {
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT id,name,created_at,tags,created_by FROM chat_rooms ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rooms)
    }

    async fn insert_room(&self, name: &str, tags: &[String], created_by: Uuid) -> Result<Room, StoreError> {
        let room = Room {
            id: Uuid::now_v7(),
            name: name.to_owned(),
            created_at: OffsetDateTime::now_utc(),
            tags: tags.to_vec(),
            created_by,
        };

        sqlx::query("INSERT INTO chat_rooms (id,name,created_at,tags,created_by) VALUES (?,?,?,?,?)")
            .bind(room.id)
            .bind(&room.name)
            .bind(room.created_at)
            .bind(Json(&room.tags))
            .bind(room.created_by)
            .execute(&self.db_pool)
            .await
            .map_err(StoreError::on_insert("room"))?;

        Ok(room)
    }

    async fn delete_room(&self, room_id: Uuid) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM chat_rooms WHERE id=?")
            .bind(room_id)
            .execute(&self.db_pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("room"));
        }
        Ok(())
    }

    async fn insert_membership(&self, room_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO chat_room_members (chat_room_id,user_id,joined_at) VALUES (?,?,?)")
            .bind(room_id)
            .bind(user_id)
            .bind(OffsetDateTime::now_utc())
            .execute(&self.db_pool)
            .await
            .map_err(StoreError::on_insert("membership"))?;

        Ok(())
    }

    async fn delete_membership(&self, room_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let done = sqlx::query("DELETE FROM chat_room_members WHERE chat_room_id=? AND user_id=?")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound("membership"));
        }
        Ok(())
    }

    async fn room_detail(&self, room_id: Uuid) -> Result<RoomDetail, StoreError> {
        let Some(room) = sqlx::query_as::<_, Room>(
            "SELECT id,name,created_at,tags,created_by FROM chat_rooms WHERE id=?",
        )
        .bind(room_id)
        .fetch_optional(&self.db_pool)
        .await?
        else {
            return Err(StoreError::NotFound("room"));
        };

        let members = sqlx::query_as::<_, Member>(
            "SELECT m.user_id AS user_id, p.username AS username, p.email AS email, m.joined_at AS joined_at
             FROM chat_room_members m JOIN profiles p ON p.id = m.user_id
             WHERE m.chat_room_id=?
             ORDER BY m.joined_at, m.user_id",
        )
        .bind(room_id)
        .fetch_all(&self.db_pool)
        .await?;

        let messages = sqlx::query_as::<_, Message>(
            "SELECT id,chat_room_id AS room_id,sender_id,content,created_at
             FROM messages WHERE chat_room_id=?
             ORDER BY created_at, id",
        )
        .bind(room_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(RoomDetail { room, members, messages })
    }

    async fn insert_message(&self, room_id: Uuid, sender_id: Uuid, content: &str) -> Result<Message, StoreError> {
        let message = Message {
            id: Uuid::now_v7(),
            room_id,
            sender_id,
            content: content.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };

        sqlx::query("INSERT INTO messages (id,chat_room_id,sender_id,content,created_at) VALUES (?,?,?,?,?)")
            .bind(message.id)
            .bind(message.room_id)
            .bind(message.sender_id)
            .bind(&message.content)
            .bind(message.created_at)
            .execute(&self.db_pool)
            .await
            .map_err(StoreError::on_insert("message"))?;

        self.feed.publish(message.clone());

        Ok(message)
    }

    async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT id,username,email FROM profiles WHERE id=?")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(profile)
    }
}
