use std::sync::Arc;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use metrics::counter;
use tablero_shared::persistence::ContextFactory;
use tablero_shared::validation;
use tablero_shared::RepositoryError;

use crate::error::SocialError;
use crate::models::{
    ordered_pair, FriendRequest, Friendship, NewFriendRequest, NewFriendship, RequestStatus, User,
};
use crate::schema::{friend_requests, friendships, users};

use super::users::require_username;
use super::{is_unique_violation, utc_now};

const REPOSITORY: &str = "friends";

fn storage(operation: &'static str) -> impl FnOnce(diesel::result::Error) -> SocialError {
    move |e| RepositoryError::storage(REPOSITORY, operation)(e).into()
}

/// Friend requests and friendships.
///
/// Every operation checks out its own persistence context and drops it before
/// returning. Writes that read-then-modify run in an immediate transaction so
/// two concurrent requests for the same pair cannot both pass validation.
pub struct FriendRepository {
    contexts: Arc<dyn ContextFactory>,
}

impl FriendRepository {
    pub fn new(contexts: Arc<dyn ContextFactory>) -> Self {
        Self { contexts }
    }

    /// Records a pending request from `sender_username` to `receiver_username`.
    pub fn send_friend_request(
        &self,
        sender_username: &str,
        receiver_username: &str,
    ) -> Result<FriendRequest, SocialError> {
        let sender_name = validation::username("sender", sender_username)?;
        let receiver_name = validation::username("receiver", receiver_username)?;
        if sender_name == receiver_name {
            return Err(SocialError::SelfRequest);
        }

        let mut conn = self.contexts.create()?;
        let request = conn.immediate_transaction(|conn| {
            let sender = require_username(conn, sender_name)?;
            let receiver = require_username(conn, receiver_name)?;
            if sender.id == receiver.id {
                return Err(SocialError::SelfRequest);
            }
            if friendship_exists(conn, sender.id, receiver.id)? {
                return Err(SocialError::AlreadyFriends(sender.id, receiver.id));
            }
            if pending_between(conn, sender.id, receiver.id)? {
                return Err(SocialError::RequestAlreadyPending(sender.id, receiver.id));
            }

            diesel::insert_into(friend_requests::table)
                .values(&NewFriendRequest::pending(sender.id, receiver.id, utc_now()))
                .get_result::<FriendRequest>(conn)
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        SocialError::RequestAlreadyPending(sender.id, receiver.id)
                    } else {
                        storage("send_friend_request")(e)
                    }
                })
        })?;

        counter!("friend_requests_sent_total").increment(1);
        tracing::info!(
            request_id = request.id,
            sender_id = request.sender_id,
            receiver_id = request.receiver_id,
            "friend request sent"
        );
        Ok(request)
    }

    /// Creates the friendship and retires the request in one transaction.
    pub fn accept_friend_request(&self, request_id: i64) -> Result<Friendship, SocialError> {
        let mut conn = self.contexts.create()?;
        let friendship = conn.immediate_transaction(|conn| {
            let request = load_pending(conn, request_id, "accept_friend_request")?;
            if friendship_exists(conn, request.sender_id, request.receiver_id)? {
                return Err(SocialError::AlreadyFriends(request.sender_id, request.receiver_id));
            }

            let now = utc_now();
            let friendship = diesel::insert_into(friendships::table)
                .values(&NewFriendship::between(request.sender_id, request.receiver_id, now))
                .get_result::<Friendship>(conn)
                .map_err(storage("accept_friend_request"))?;

            diesel::update(friend_requests::table.find(request.id))
                .set((
                    friend_requests::status.eq(RequestStatus::Accepted.as_str()),
                    friend_requests::responded_at.eq(Some(now)),
                ))
                .execute(conn)
                .map_err(storage("accept_friend_request"))?;

            Ok(friendship)
        })?;

        counter!("friend_requests_accepted_total").increment(1);
        tracing::info!(
            request_id,
            friendship_id = friendship.id,
            user_low = friendship.user_low,
            user_high = friendship.user_high,
            "friend request accepted"
        );
        Ok(friendship)
    }

    pub fn reject_friend_request(&self, request_id: i64) -> Result<FriendRequest, SocialError> {
        let mut conn = self.contexts.create()?;
        let request = conn.immediate_transaction(|conn| {
            let request = load_pending(conn, request_id, "reject_friend_request")?;
            diesel::update(friend_requests::table.find(request.id))
                .set((
                    friend_requests::status.eq(RequestStatus::Rejected.as_str()),
                    friend_requests::responded_at.eq(Some(utc_now())),
                ))
                .get_result::<FriendRequest>(conn)
                .map_err(storage("reject_friend_request"))
        })?;

        tracing::info!(request_id, "friend request rejected");
        Ok(request)
    }

    /// Incoming requests still awaiting an answer, oldest first.
    pub fn pending_requests_for(&self, user_id: i64) -> Result<Vec<FriendRequest>, SocialError> {
        let mut conn = self.contexts.create()?;
        friend_requests::table
            .filter(friend_requests::receiver_id.eq(user_id))
            .filter(friend_requests::status.eq(RequestStatus::Pending.as_str()))
            .order((friend_requests::created_at.asc(), friend_requests::id.asc()))
            .load::<FriendRequest>(&mut conn)
            .map_err(storage("pending_requests_for"))
    }

    /// Friends of `user_id` ordered by username; empty when there are none.
    pub fn get_friends(&self, user_id: i64) -> Result<Vec<User>, SocialError> {
        let mut conn = self.contexts.create()?;

        let friend_ids: Vec<i64> = friendships::table
            .filter(
                friendships::user_low
                    .eq(user_id)
                    .or(friendships::user_high.eq(user_id)),
            )
            .load::<Friendship>(&mut conn)
            .map_err(storage("get_friends"))?
            .iter()
            .filter_map(|f| f.other(user_id))
            .collect();

        if friend_ids.is_empty() {
            return Ok(Vec::new());
        }

        users::table
            .filter(users::id.eq_any(friend_ids))
            .order(users::username.asc())
            .load::<User>(&mut conn)
            .map_err(storage("get_friends"))
    }

    pub fn are_friends(&self, a: i64, b: i64) -> Result<bool, SocialError> {
        let mut conn = self.contexts.create()?;
        friendship_exists(&mut conn, a, b)
    }

    /// Deletes the friendship between `a` and `b`, in either order.
    pub fn remove_friendship(&self, a: i64, b: i64) -> Result<(), SocialError> {
        validation::positive_id("user_id", a)?;
        validation::positive_id("user_id", b)?;
        if a == b {
            return Err(SocialError::FriendshipNotFound(a, b));
        }

        let mut conn = self.contexts.create()?;
        let (low, high) = ordered_pair(a, b);
        let deleted = diesel::delete(
            friendships::table
                .filter(friendships::user_low.eq(low))
                .filter(friendships::user_high.eq(high)),
        )
        .execute(&mut conn)
        .map_err(storage("remove_friendship"))?;

        if deleted == 0 {
            return Err(SocialError::FriendshipNotFound(a, b));
        }

        tracing::info!(user_a = a, user_b = b, "friendship removed");
        Ok(())
    }
}

fn friendship_exists(conn: &mut SqliteConnection, a: i64, b: i64) -> Result<bool, SocialError> {
    if a == b {
        return Ok(false);
    }
    let (low, high) = ordered_pair(a, b);
    let count: i64 = friendships::table
        .filter(friendships::user_low.eq(low))
        .filter(friendships::user_high.eq(high))
        .count()
        .get_result(conn)
        .map_err(storage("friendship_exists"))?;
    Ok(count > 0)
}

fn pending_between(conn: &mut SqliteConnection, a: i64, b: i64) -> Result<bool, SocialError> {
    let count: i64 = friend_requests::table
        .filter(friend_requests::status.eq(RequestStatus::Pending.as_str()))
        .filter(
            friend_requests::sender_id
                .eq(a)
                .and(friend_requests::receiver_id.eq(b))
                .or(friend_requests::sender_id.eq(b).and(friend_requests::receiver_id.eq(a))),
        )
        .count()
        .get_result(conn)
        .map_err(storage("pending_between"))?;
    Ok(count > 0)
}

fn load_pending(
    conn: &mut SqliteConnection,
    request_id: i64,
    operation: &'static str,
) -> Result<FriendRequest, SocialError> {
    let request = friend_requests::table
        .find(request_id)
        .first::<FriendRequest>(conn)
        .optional()
        .map_err(storage(operation))?
        .ok_or(SocialError::RequestNotFound(request_id))?;

    if !request.is_pending() {
        return Err(SocialError::RequestNotPending {
            id: request.id,
            status: request.status,
        });
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use diesel::connection::SimpleConnection;

    use super::*;
    use crate::repositories::test_support;
    use crate::repositories::UserRepository;
    use tablero_shared::persistence::{DbContext, DbPool};

    struct Fixture {
        pool: DbPool,
        users: UserRepository,
        friends: FriendRepository,
    }

    fn fixture(names: &[&str]) -> Fixture {
        let pool = test_support::pool();
        let users = UserRepository::new(test_support::contexts(&pool));
        let friends = FriendRepository::new(test_support::contexts(&pool));
        for name in names {
            users.create(name).unwrap();
        }
        Fixture { pool, users, friends }
    }

    fn all_requests(pool: &DbPool) -> Vec<FriendRequest> {
        let mut conn = pool.get().unwrap();
        friend_requests::table
            .order(friend_requests::id.asc())
            .load::<FriendRequest>(&mut conn)
            .unwrap()
    }

    fn friendship_count(pool: &DbPool) -> i64 {
        let mut conn = pool.get().unwrap();
        friendships::table.count().get_result(&mut conn).unwrap()
    }

    #[test]
    fn sending_creates_one_pending_request() {
        let fx = fixture(&["alice", "bob"]);

        let request = fx.friends.send_friend_request("alice", "bob").unwrap();

        assert_eq!((request.sender_id, request.receiver_id), (1, 2));
        assert!(request.is_pending());
        let stored = all_requests(&fx.pool);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], request);
    }

    #[test]
    fn self_request_is_rejected() {
        let fx = fixture(&["alice"]);

        assert!(matches!(
            fx.friends.send_friend_request("alice", "alice"),
            Err(SocialError::SelfRequest)
        ));
        assert!(matches!(
            fx.friends.send_friend_request("ghost", " ghost"),
            Err(SocialError::SelfRequest)
        ));
        assert!(all_requests(&fx.pool).is_empty());
    }

    #[test]
    fn unknown_user_is_reported_by_name() {
        let fx = fixture(&["alice"]);

        let err = fx.friends.send_friend_request("alice", "zoe").unwrap_err();
        assert!(matches!(err, SocialError::UserNotFound(ref name) if name == "zoe"));
        assert!(!err.is_storage());
    }

    #[test]
    fn duplicate_pending_request_is_rejected_in_both_directions() {
        let fx = fixture(&["alice", "bob"]);
        fx.friends.send_friend_request("alice", "bob").unwrap();

        assert!(matches!(
            fx.friends.send_friend_request("alice", "bob"),
            Err(SocialError::RequestAlreadyPending(1, 2))
        ));
        assert!(matches!(
            fx.friends.send_friend_request("bob", "alice"),
            Err(SocialError::RequestAlreadyPending(2, 1))
        ));
        assert_eq!(all_requests(&fx.pool).len(), 1);
    }

    #[test]
    fn existing_friends_cannot_request_again() {
        let fx = fixture(&["alice", "bob"]);
        let request = fx.friends.send_friend_request("alice", "bob").unwrap();
        fx.friends.accept_friend_request(request.id).unwrap();

        assert!(matches!(
            fx.friends.send_friend_request("alice", "bob"),
            Err(SocialError::AlreadyFriends(..))
        ));
        assert!(matches!(
            fx.friends.send_friend_request("bob", "alice"),
            Err(SocialError::AlreadyFriends(..))
        ));
    }

    #[test]
    fn accepting_creates_friendship_and_retires_request() {
        let fx = fixture(&["alice", "bob"]);
        let request = fx.friends.send_friend_request("bob", "alice").unwrap();

        let friendship = fx.friends.accept_friend_request(request.id).unwrap();

        assert_eq!((friendship.user_low, friendship.user_high), (1, 2));
        let stored = &all_requests(&fx.pool)[0];
        assert_eq!(stored.status, "accepted");
        assert!(stored.responded_at.is_some());
        assert!(fx.friends.are_friends(2, 1).unwrap());
        assert!(fx.friends.pending_requests_for(1).unwrap().is_empty());
    }

    #[test]
    fn accepting_twice_never_double_inserts() {
        let fx = fixture(&["alice", "bob"]);
        let request = fx.friends.send_friend_request("alice", "bob").unwrap();
        fx.friends.accept_friend_request(request.id).unwrap();

        let err = fx.friends.accept_friend_request(request.id).unwrap_err();
        assert!(matches!(err, SocialError::RequestNotPending { ref status, .. } if status == "accepted"));
        assert!(matches!(
            fx.friends.accept_friend_request(999),
            Err(SocialError::RequestNotFound(999))
        ));
        assert_eq!(friendship_count(&fx.pool), 1);
    }

    #[test]
    fn failed_accept_leaves_no_friendship_behind() {
        let fx = fixture(&["alice", "bob"]);
        let request = fx.friends.send_friend_request("alice", "bob").unwrap();
        {
            let mut conn = fx.pool.get().unwrap();
            conn.batch_execute(
                "CREATE TRIGGER fail_request_update BEFORE UPDATE ON friend_requests
                 BEGIN SELECT RAISE(ABORT, 'update refused'); END;",
            )
            .unwrap();
        }

        let err = fx.friends.accept_friend_request(request.id).unwrap_err();

        assert!(err.is_storage());
        assert_eq!(friendship_count(&fx.pool), 0);
        assert!(!fx.friends.are_friends(1, 2).unwrap());
        assert!(all_requests(&fx.pool)[0].is_pending());
    }

    #[test]
    fn rejected_request_can_be_resent_but_not_accepted() {
        let fx = fixture(&["alice", "bob"]);
        let first = fx.friends.send_friend_request("alice", "bob").unwrap();

        let rejected = fx.friends.reject_friend_request(first.id).unwrap();
        assert_eq!(rejected.status, "rejected");
        assert!(matches!(
            fx.friends.accept_friend_request(first.id),
            Err(SocialError::RequestNotPending { .. })
        ));

        let second = fx.friends.send_friend_request("alice", "bob").unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(friendship_count(&fx.pool), 0);
    }

    #[test]
    fn friends_list_is_empty_without_friendships() {
        let fx = fixture(&["alice"]);
        assert_eq!(fx.friends.get_friends(1).unwrap(), Vec::<User>::new());
        assert!(fx.friends.get_friends(77).unwrap().is_empty());
    }

    #[test]
    fn friends_list_covers_both_sides_ordered_by_name() {
        let fx = fixture(&["mallory", "carol", "bob"]);
        let r1 = fx.friends.send_friend_request("mallory", "carol").unwrap();
        let r2 = fx.friends.send_friend_request("bob", "mallory").unwrap();
        fx.friends.accept_friend_request(r1.id).unwrap();
        fx.friends.accept_friend_request(r2.id).unwrap();

        let names: Vec<String> = fx
            .friends
            .get_friends(1)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["bob", "carol"]);

        let carol = fx.users.find_by_username("carol").unwrap().unwrap();
        let carols: Vec<i64> = fx.friends.get_friends(carol.id).unwrap().iter().map(|u| u.id).collect();
        assert_eq!(carols, vec![1]);
    }

    #[test]
    fn removing_is_order_independent() {
        let fx = fixture(&["alice", "bob"]);
        let request = fx.friends.send_friend_request("alice", "bob").unwrap();
        fx.friends.accept_friend_request(request.id).unwrap();

        fx.friends.remove_friendship(2, 1).unwrap();
        assert!(!fx.friends.are_friends(1, 2).unwrap());
        assert!(matches!(
            fx.friends.remove_friendship(1, 2),
            Err(SocialError::FriendshipNotFound(1, 2))
        ));
        assert!(matches!(
            fx.friends.remove_friendship(1, 1),
            Err(SocialError::FriendshipNotFound(1, 1))
        ));
    }

    #[test]
    fn validation_runs_before_a_context_is_opened() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let failing: Arc<dyn ContextFactory> = Arc::new(move || -> Result<DbContext, RepositoryError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::Context("store offline".into()))
        });
        let friends = FriendRepository::new(failing);

        let err = friends.send_friend_request("  ", "bob").unwrap_err();
        assert!(matches!(err, SocialError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let err = friends.send_friend_request("alice", "bob").unwrap_err();
        assert!(err.is_storage());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
