//! Notification and event broadcasting service
//!
//! Handles broadcasting events to connected clients via WebSocket
//! and Redis Pub/Sub for cross-node messaging.

use serde::{Deserialize, Serialize};
use crate::{
    models::{RoomId, UserId},
    Result,
};

/// Room event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEvent {
    /// User joined the room
    UserJoined { user_id: UserId, username: String },
    /// User left the room
    UserLeft { user_id: UserId, username: String },
    /// Chat message
    ChatMessage {
        message_id: String,
        user_id: UserId,
        username: String,
        content: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Danmaku message
    Danmaku {
        user_id: UserId,
        username: String,
        content: String,
        position: String, // "top", "bottom", or "scrolling"
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Playback state changed
    PlaybackStateChanged {
        playing: bool,
        position: i64,
        speed: f64,
        media_id: Option<String>,
    },
    /// Media added to playlist
    MediaAdded {
        media_id: String,
        title: String,
        url: String,
        position: i32,
    },
    /// Media removed from playlist
    MediaRemoved { media_id: String },
    /// Playlist reordered
    PlaylistReordered { media_ids: Vec<String> },
    /// Member permissions changed
    PermissionChanged {
        user_id: UserId,
        permissions: i64,
    },
    /// Member kicked
    MemberKicked { user_id: UserId },
    /// Room settings updated
    SettingsUpdated { settings: serde_json::Value },
    /// Room deleted
    RoomDeleted,
}

/// Notification service
///
/// Broadcasts events to connected clients and handles cross-node messaging.
#[derive(Clone)]
pub struct NotificationService {
    // TODO: Add WebSocket connection manager
    // TODO: Add Redis Pub/Sub client
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService").finish()
    }
}

impl NotificationService {
    /// Create a new notification service
    pub fn new() -> Self {
        Self {}
    }

    /// Broadcast an event to all members of a room
    pub async fn broadcast_to_room(&self, room_id: &RoomId, event: RoomEvent) -> Result<()> {
        // TODO: Implement WebSocket broadcasting
        // TODO: Implement Redis Pub/Sub for cross-node messaging

        tracing::trace!("Broadcasting event to room {}: {:?}", room_id.0, std::mem::discriminant(&event));

        Ok(())
    }

    /// Broadcast an event to a specific user in a room
    pub async fn send_to_user(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        event: RoomEvent,
    ) -> Result<()> {
        // TODO: Implement direct user messaging via WebSocket

        tracing::trace!(
            "Sending event to user {} in room {}: {:?}",
            user_id.0,
            room_id.0,
            std::mem::discriminant(&event)
        );

        Ok(())
    }

    /// Broadcast to all nodes in cluster (via Redis Pub/Sub)
    pub async fn broadcast_to_cluster(
        &self,
        room_id: &RoomId,
        event: RoomEvent,
    ) -> Result<()> {
        // TODO: Implement Redis Pub/Sub publishing

        tracing::trace!(
            "Broadcasting event to cluster for room {}: {:?}",
            room_id.0,
            std::mem::discriminant(&event)
        );

        Ok(())
    }

    /// Notify room members that a user joined
    pub async fn notify_user_joined(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &str,
    ) -> Result<()> {
        let event = RoomEvent::UserJoined {
            user_id: user_id.clone(),
            username: username.to_string(),
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify room members that a user left
    pub async fn notify_user_left(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &str,
    ) -> Result<()> {
        let event = RoomEvent::UserLeft {
            user_id: user_id.clone(),
            username: username.to_string(),
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Broadcast chat message
    pub async fn notify_chat_message(
        &self,
        room_id: &RoomId,
        message_id: &str,
        user_id: &UserId,
        username: &str,
        content: &str,
    ) -> Result<()> {
        let event = RoomEvent::ChatMessage {
            message_id: message_id.to_string(),
            user_id: user_id.clone(),
            username: username.to_string(),
            content: content.to_string(),
            timestamp: chrono::Utc::now(),
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Broadcast danmaku message
    pub async fn notify_danmaku(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &str,
        content: &str,
        position: &str,
    ) -> Result<()> {
        let event = RoomEvent::Danmaku {
            user_id: user_id.clone(),
            username: username.to_string(),
            content: content.to_string(),
            position: position.to_string(),
            timestamp: chrono::Utc::now(),
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify playback state change
    pub async fn notify_playback_state_changed(
        &self,
        room_id: &RoomId,
        playing: bool,
        position: i64,
        speed: f64,
        media_id: Option<String>,
    ) -> Result<()> {
        let event = RoomEvent::PlaybackStateChanged {
            playing,
            position,
            speed,
            media_id,
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify media added
    pub async fn notify_media_added(
        &self,
        room_id: &RoomId,
        media_id: &str,
        title: &str,
        url: &str,
        position: i32,
    ) -> Result<()> {
        let event = RoomEvent::MediaAdded {
            media_id: media_id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            position,
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify media removed
    pub async fn notify_media_removed(
        &self,
        room_id: &RoomId,
        media_id: &str,
    ) -> Result<()> {
        let event = RoomEvent::MediaRemoved {
            media_id: media_id.to_string(),
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify permission changed
    pub async fn notify_permission_changed(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        permissions: i64,
    ) -> Result<()> {
        let event = RoomEvent::PermissionChanged {
            user_id: user_id.clone(),
            permissions,
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify member kicked
    pub async fn notify_member_kicked(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<()> {
        let event = RoomEvent::MemberKicked {
            user_id: user_id.clone(),
        };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify settings updated
    pub async fn notify_settings_updated(
        &self,
        room_id: &RoomId,
        settings: serde_json::Value,
    ) -> Result<()> {
        let event = RoomEvent::SettingsUpdated { settings };
        self.broadcast_to_room(room_id, event).await
    }

    /// Notify room deleted
    pub async fn notify_room_deleted(&self, room_id: &RoomId) -> Result<()> {
        let event = RoomEvent::RoomDeleted;
        self.broadcast_to_room(room_id, event).await
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_room_event_serialization() {
        let event = RoomEvent::UserJoined {
            user_id: UserId("user123".to_string()),
            username: "testuser".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("UserJoined"));
        assert!(json.contains("user123"));
    }
}
