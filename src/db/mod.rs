//! Database layer (Firestore, or an in-process store for development).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TRIPS: &str = "trips";
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    /// Keyed by `relation_id(user_id, post_id)`
    pub const LIKES: &str = "likes";
    /// Keyed by `relation_id(follower_id, following_id)`
    pub const FOLLOWS: &str = "follows";
    pub const WISHLISTS: &str = "wishlists";
    pub const AI_RECOMMENDATIONS: &str = "ai_recommendations";
}
