//! Post-commit hooks for mutation handlers.
//!
//! A successful durable write triggers two side effects: the tenant's cached
//! reads are invalidated, and an envelope is published for fan-out. The two
//! hooks are independent and non-transactional; either may fail without
//! affecting the mutation's outcome or the other hook. Callers run the
//! matching method after the write commits and before returning success.

use bugle_core::{Envelope, Event};
use serde_json::Value;
use tracing::warn;

use crate::cache;
use crate::client::RedisPool;
use crate::publisher::EventPublisher;

/// Fail-open side effects of entity mutations.
#[derive(Clone)]
pub struct PostCommitHooks {
    pool: RedisPool,
    publisher: EventPublisher,
}

impl PostCommitHooks {
    pub fn new(pool: RedisPool) -> Self {
        let publisher = EventPublisher::new(pool.clone());
        Self { pool, publisher }
    }

    pub async fn bug_created(&self, organization_id: &str, bug: Value) {
        self.invalidate_lists(organization_id).await;
        self.publish(organization_id, Event::BugCreated(bug)).await;
    }

    pub async fn bug_updated(&self, organization_id: &str, bug_id: &str, bug: Value) {
        self.invalidate_entity(bug_id).await;
        self.invalidate_lists(organization_id).await;
        self.publish(organization_id, Event::BugUpdated(bug)).await;
    }

    pub async fn bug_deleted(&self, organization_id: &str, bug_id: &str) {
        self.invalidate_entity(bug_id).await;
        self.invalidate_lists(organization_id).await;
        self.publish(
            organization_id,
            Event::BugDeleted {
                id: bug_id.to_string(),
            },
        )
        .await;
    }

    pub async fn comment_added(&self, organization_id: &str, bug_id: &str, comment: Value) {
        self.invalidate_entity(bug_id).await;
        self.publish(organization_id, Event::CommentAdded(comment))
            .await;
    }

    pub async fn comment_deleted(&self, organization_id: &str, bug_id: &str, comment_id: &str) {
        self.invalidate_entity(bug_id).await;
        self.publish(
            organization_id,
            Event::CommentDeleted {
                bug_id: bug_id.to_string(),
                comment_id: comment_id.to_string(),
            },
        )
        .await;
    }

    async fn invalidate_lists(&self, organization_id: &str) {
        let pattern = cache::organization_pattern("bugs", organization_id);
        if let Err(e) = cache::delete_pattern(&self.pool, &pattern).await {
            warn!(
                error = %e,
                pattern = %pattern,
                "cache invalidation failed, stale entries expire with their TTL"
            );
        }
    }

    async fn invalidate_entity(&self, bug_id: &str) {
        let key = cache::entity_key(bug_id);
        if let Err(e) = cache::delete(&self.pool, &key).await {
            warn!(
                error = %e,
                key = %key,
                "cache invalidation failed, stale entry expires with its TTL"
            );
        }
    }

    async fn publish(&self, organization_id: &str, event: Event) {
        self.publisher
            .publish(&Envelope {
                organization_id: Some(organization_id.to_string()),
                event,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const REDIS_URL: &str = "redis://127.0.0.1:6379";

    #[tokio::test]
    #[ignore = "Requires Redis server"]
    async fn mutation_invalidates_cached_lists() {
        let pool = crate::client::init_pool(REDIS_URL).await.unwrap();
        let key = cache::list_key("org-5", "hooks-itest");
        cache::put(&pool, &key, "[]", Duration::from_secs(60))
            .await
            .unwrap();

        let hooks = PostCommitHooks::new(pool.clone());
        hooks
            .bug_created("org-5", serde_json::json!({"id": "bug-1"}))
            .await;

        assert_eq!(cache::get(&pool, &key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "Requires Redis server"]
    async fn comment_mutations_invalidate_the_entity_key() {
        let pool = crate::client::init_pool(REDIS_URL).await.unwrap();
        let key = cache::entity_key("bug-77");
        cache::put(&pool, &key, "{}", Duration::from_secs(60))
            .await
            .unwrap();

        let hooks = PostCommitHooks::new(pool.clone());
        hooks.comment_deleted("org-5", "bug-77", "c-1").await;

        assert_eq!(cache::get(&pool, &key).await.unwrap(), None);
    }
}
