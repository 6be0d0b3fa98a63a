use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{friend_requests, friendships, users};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub created_at: NaiveDateTime,
}

// --- Friendship ---

/// A friendship between two users, stored with the lower id first.
#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = friendships)]
pub struct Friendship {
    pub id: i64,
    pub user_low: i64,
    pub user_high: i64,
    pub created_at: NaiveDateTime,
}

impl Friendship {
    /// The other side of the friendship, if `user_id` is part of it.
    pub fn other(&self, user_id: i64) -> Option<i64> {
        if self.user_low == user_id {
            Some(self.user_high)
        } else if self.user_high == user_id {
            Some(self.user_low)
        } else {
            None
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = friendships)]
pub struct NewFriendship {
    pub user_low: i64,
    pub user_high: i64,
    pub created_at: NaiveDateTime,
}

impl NewFriendship {
    pub fn between(a: i64, b: i64, created_at: NaiveDateTime) -> Self {
        let (user_low, user_high) = ordered_pair(a, b);
        Self { user_low, user_high, created_at }
    }
}

pub fn ordered_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

// --- FriendRequest ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = friend_requests)]
pub struct FriendRequest {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub responded_at: Option<NaiveDateTime>,
}

impl FriendRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending.as_str()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = friend_requests)]
pub struct NewFriendRequest {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: &'static str,
    pub created_at: NaiveDateTime,
}

impl NewFriendRequest {
    pub fn pending(sender_id: i64, receiver_id: i64, created_at: NaiveDateTime) -> Self {
        Self {
            sender_id,
            receiver_id,
            status: RequestStatus::Pending.as_str(),
            created_at,
        }
    }
}
