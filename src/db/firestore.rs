// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts and credentials)
//! - Trips (recorded paths)
//! - Posts, comments, likes and follows
//! - Wishlist items and saved AI recommendations
//!
//! The same operations run against an in-process [`MemoryStore`] when the
//! service is started with `STORAGE_BACKEND=memory` and in tests.

use crate::db::collections;
use crate::db::memory::MemoryStore;
use crate::error::AppError;
use crate::models::{
    AiRecommendation, Comment, Follow, Like, Post, Trip, User, WishlistItem,
};
use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use firestore::errors::FirestoreError;
use std::collections::HashMap;
use std::time::Duration;

const MAX_CONCURRENT_DB_OPS: usize = 50;
const TRANSACTION_ATTEMPTS: u32 = 5;
const TRANSACTION_RETRY_BASE: Duration = Duration::from_millis(50);

/// Contention (aborted transactions) and transient unavailability.
fn is_retryable(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DatabaseError(e) if e.retry_possible)
}

async fn retry_pause(collection: &str, id: &str, attempt: u32, err: &FirestoreError) {
    tracing::warn!(
        collection,
        document_id = id,
        attempt,
        error = %err,
        "Transaction conflict, retrying"
    );
    tokio::time::sleep(TRANSACTION_RETRY_BASE * attempt).await;
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(MemoryStore),
}

/// Document database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a client backed by an in-process store (local development and tests).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::new()),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    // ─── Generic Document Operations ─────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store.get(collection, id),
        }
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => store.set(collection, id, doc),
        }
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.delete(collection, id);
                Ok(())
            }
        }
    }

    /// All documents in `collection` whose `field` equals `value`.
    async fn query_eq<T, V>(&self, collection: &str, field: &str, value: V) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Send,
        V: Into<firestore::FirestoreValue> + Serialize + Clone + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collection)
                .filter(|q| q.for_all([q.field(field).eq(value.clone())]))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store.find_eq(collection, field, &value),
        }
    }

    /// Begin a transaction and return it together with a client whose reads
    /// run inside it.
    async fn transaction_with_reader(
        client: &firestore::FirestoreDb,
    ) -> Result<(firestore::FirestoreTransaction<'_>, firestore::FirestoreDb), AppError> {
        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let reader = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );
        Ok((transaction, reader))
    }

    /// Delete the document if it exists, otherwise create it from `doc`.
    ///
    /// Returns true when the document exists afterwards. The read and the
    /// write happen in one transaction, so two racing toggles cannot both
    /// create the document.
    async fn toggle_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<bool, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let client = match &self.backend {
            Backend::Firestore(client) => client,
            Backend::Memory(store) => return store.toggle(collection, id, doc),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut transaction, reader) = Self::transaction_with_reader(client).await?;

            let read = reader
                .fluent()
                .select()
                .by_id_in(collection)
                .obj::<T>()
                .one(id)
                .await;
            let existing: Option<T> = match read {
                Ok(existing) => existing,
                Err(e) if is_retryable(&e) && attempt < TRANSACTION_ATTEMPTS => {
                    let _ = transaction.rollback().await;
                    retry_pause(collection, id, attempt, &e).await;
                    continue;
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Database(format!(
                        "Failed to read {} in transaction: {}",
                        collection, e
                    )));
                }
            };

            let present = if existing.is_some() {
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add deletion to transaction: {}", e))
                    })?;
                false
            } else {
                client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(id)
                    .object(doc)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add write to transaction: {}", e))
                    })?;
                true
            };

            match transaction.commit().await {
                Ok(_) => return Ok(present),
                Err(e) if is_retryable(&e) && attempt < TRANSACTION_ATTEMPTS => {
                    retry_pause(collection, id, attempt, &e).await;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Transaction commit failed: {}", e)))
                }
            }
        }
    }

    /// Read a document, apply `f`, and write it back atomically.
    ///
    /// Returns None when the document does not exist. If `f` fails nothing
    /// is written and its error is returned. `f` runs again on the fresh
    /// document when a commit loses to a concurrent writer.
    async fn modify_doc<T, F>(&self, collection: &str, id: &str, f: F) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn(&mut T) -> Result<(), AppError> + Send + Sync,
    {
        let client = match &self.backend {
            Backend::Firestore(client) => client,
            Backend::Memory(store) => return store.update(collection, id, f),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut transaction, reader) = Self::transaction_with_reader(client).await?;

            let read = reader
                .fluent()
                .select()
                .by_id_in(collection)
                .obj::<T>()
                .one(id)
                .await;
            let current: Option<T> = match read {
                Ok(current) => current,
                Err(e) if is_retryable(&e) && attempt < TRANSACTION_ATTEMPTS => {
                    let _ = transaction.rollback().await;
                    retry_pause(collection, id, attempt, &e).await;
                    continue;
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Database(format!(
                        "Failed to read {} in transaction: {}",
                        collection, e
                    )));
                }
            };

            let Some(mut doc) = current else {
                let _ = transaction.rollback().await;
                return Ok(None);
            };

            if let Err(e) = f(&mut doc) {
                let _ = transaction.rollback().await;
                return Err(e);
            }

            client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(id)
                .object(&doc)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add write to transaction: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => return Ok(Some(doc)),
                Err(e) if is_retryable(&e) && attempt < TRANSACTION_ATTEMPTS => {
                    retry_pause(collection, id, attempt, &e).await;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Transaction commit failed: {}", e)))
                }
            }
        }
    }

    /// Create a document only if no document with this ID exists.
    ///
    /// Returns false, without writing, when the ID is already taken.
    async fn create_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<bool, AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        match &self.backend {
            Backend::Firestore(client) => {
                let result: Result<T, _> = client
                    .fluent()
                    .insert()
                    .into(collection)
                    .document_id(id)
                    .object(doc)
                    .execute()
                    .await;
                match result {
                    Ok(_) => Ok(true),
                    Err(FirestoreError::DataConflictError(_)) => Ok(false),
                    Err(e) => Err(AppError::Database(e.to_string())),
                }
            }
            Backend::Memory(store) => store.create(collection, id, doc),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let mut users: Vec<User> = self
            .query_eq(collections::USERS, "email", email.to_string())
            .await?;
        Ok(users.pop())
    }

    pub async fn set_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id, user).await
    }

    /// Fetch several users at once, keyed by ID. Unknown IDs are skipped.
    pub async fn get_users(&self, user_ids: &[String]) -> Result<HashMap<String, User>, AppError> {
        let mut ids = user_ids.to_vec();
        ids.sort();
        ids.dedup();

        let users = stream::iter(ids)
            .map(|id| async move { self.get_user(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<User>>, AppError>>()?;

        Ok(users
            .into_iter()
            .flatten()
            .map(|user| (user.id.clone(), user))
            .collect())
    }

    // ─── Trip Operations ─────────────────────────────────────────

    pub async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>, AppError> {
        self.get_doc(collections::TRIPS, trip_id).await
    }

    pub async fn set_trip(&self, trip: &Trip) -> Result<(), AppError> {
        self.set_doc(collections::TRIPS, &trip.id, trip).await
    }

    /// Atomically modify a trip. Returns None if the trip does not exist.
    pub async fn update_trip<F>(&self, trip_id: &str, f: F) -> Result<Option<Trip>, AppError>
    where
        F: Fn(&mut Trip) -> Result<(), AppError> + Send + Sync,
    {
        self.modify_doc(collections::TRIPS, trip_id, f).await
    }

    /// Trips owned by a user, newest first.
    pub async fn list_trips_for_user(&self, user_id: &str) -> Result<Vec<Trip>, AppError> {
        let mut trips: Vec<Trip> = self
            .query_eq(collections::TRIPS, "userId", user_id.to_string())
            .await?;
        trips.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(trips)
    }

    /// All public trips, newest first.
    pub async fn list_public_trips(&self) -> Result<Vec<Trip>, AppError> {
        let mut trips: Vec<Trip> = self.query_eq(collections::TRIPS, "isPublic", true).await?;
        trips.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(trips)
    }

    /// Fetch several trips at once, keyed by ID. Unknown IDs are skipped.
    pub async fn get_trips(&self, trip_ids: &[String]) -> Result<HashMap<String, Trip>, AppError> {
        let mut ids = trip_ids.to_vec();
        ids.sort();
        ids.dedup();

        let trips = stream::iter(ids)
            .map(|id| async move { self.get_trip(&id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Trip>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Trip>>, AppError>>()?;

        Ok(trips
            .into_iter()
            .flatten()
            .map(|trip| (trip.id.clone(), trip))
            .collect())
    }

    // ─── Post Operations ─────────────────────────────────────────

    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        self.get_doc(collections::POSTS, post_id).await
    }

    pub async fn set_post(&self, post: &Post) -> Result<(), AppError> {
        self.set_doc(collections::POSTS, &post.id, post).await
    }

    /// Every post, newest first.
    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .from(collections::POSTS)
                .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?,
            Backend::Memory(store) => store.list(collections::POSTS)?,
        };
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Posts by one author, newest first.
    pub async fn list_posts_for_user(&self, user_id: &str) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = self
            .query_eq(collections::POSTS, "userId", user_id.to_string())
            .await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    // ─── Comment Operations ──────────────────────────────────────

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>, AppError> {
        self.get_doc(collections::COMMENTS, comment_id).await
    }

    pub async fn set_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.set_doc(collections::COMMENTS, &comment.id, comment)
            .await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::COMMENTS, comment_id).await
    }

    /// Comments on a post, oldest first.
    pub async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let mut comments: Vec<Comment> = self
            .query_eq(collections::COMMENTS, "postId", post_id.to_string())
            .await?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    // ─── Like Operations ─────────────────────────────────────────

    /// Like or unlike. Returns true if the post is liked afterwards.
    pub async fn toggle_like(&self, like: &Like) -> Result<bool, AppError> {
        self.toggle_doc(collections::LIKES, &like.id, like).await
    }

    pub async fn get_like(&self, like_id: &str) -> Result<Option<Like>, AppError> {
        self.get_doc(collections::LIKES, like_id).await
    }

    pub async fn list_likes_for_post(&self, post_id: &str) -> Result<Vec<Like>, AppError> {
        let mut likes: Vec<Like> = self
            .query_eq(collections::LIKES, "postId", post_id.to_string())
            .await?;
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    // ─── Follow Operations ───────────────────────────────────────

    /// Follow or unfollow. Returns true if following afterwards.
    pub async fn toggle_follow(&self, follow: &Follow) -> Result<bool, AppError> {
        self.toggle_doc(collections::FOLLOWS, &follow.id, follow)
            .await
    }

    pub async fn get_follow(&self, follow_id: &str) -> Result<Option<Follow>, AppError> {
        self.get_doc(collections::FOLLOWS, follow_id).await
    }

    /// Relations where `user_id` is being followed.
    pub async fn list_followers(&self, user_id: &str) -> Result<Vec<Follow>, AppError> {
        let mut follows: Vec<Follow> = self
            .query_eq(collections::FOLLOWS, "followingId", user_id.to_string())
            .await?;
        follows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(follows)
    }

    /// Relations where `user_id` is the follower.
    pub async fn list_following(&self, user_id: &str) -> Result<Vec<Follow>, AppError> {
        let mut follows: Vec<Follow> = self
            .query_eq(collections::FOLLOWS, "followerId", user_id.to_string())
            .await?;
        follows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(follows)
    }

    // ─── Wishlist Operations ─────────────────────────────────────

    pub async fn get_wishlist_item(&self, item_id: &str) -> Result<Option<WishlistItem>, AppError> {
        self.get_doc(collections::WISHLISTS, item_id).await
    }

    pub async fn set_wishlist_item(&self, item: &WishlistItem) -> Result<(), AppError> {
        self.set_doc(collections::WISHLISTS, &item.id, item).await
    }

    /// Store a new wishlist item. Returns false if the user already saved
    /// this place.
    pub async fn create_wishlist_item(&self, item: &WishlistItem) -> Result<bool, AppError> {
        self.create_doc(collections::WISHLISTS, &item.id, item).await
    }

    /// Atomically modify a wishlist item. Returns None if it does not exist.
    pub async fn update_wishlist_item<F>(
        &self,
        item_id: &str,
        f: F,
    ) -> Result<Option<WishlistItem>, AppError>
    where
        F: Fn(&mut WishlistItem) -> Result<(), AppError> + Send + Sync,
    {
        self.modify_doc(collections::WISHLISTS, item_id, f).await
    }

    pub async fn delete_wishlist_item(&self, item_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::WISHLISTS, item_id).await
    }

    /// A user's wishlist, newest first.
    pub async fn list_wishlist_for_user(&self, user_id: &str) -> Result<Vec<WishlistItem>, AppError> {
        let mut items: Vec<WishlistItem> = self
            .query_eq(collections::WISHLISTS, "userId", user_id.to_string())
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    // ─── AI Recommendation Operations ────────────────────────────

    pub async fn save_recommendation(&self, record: &AiRecommendation) -> Result<(), AppError> {
        self.set_doc(collections::AI_RECOMMENDATIONS, &record.id, record)
            .await
    }

    pub async fn get_recommendation(
        &self,
        record_id: &str,
    ) -> Result<Option<AiRecommendation>, AppError> {
        self.get_doc(collections::AI_RECOMMENDATIONS, record_id)
            .await
    }
}
