//! Read-through cache helpers.
//!
//! Key families are shared between the read path (population) and the write
//! path (invalidation):
//!
//! * `bugs:<org>:<fingerprint>` for filtered list queries
//! * `bug:<id>` for single-entity reads
//!
//! Pattern invalidation walks the keyspace with SCAN rather than KEYS so a
//! large instance is never stalled. These helpers return errors; deciding to
//! swallow them (the mutation path does) happens in `hooks.rs`.

use std::time::Duration;

use redis::AsyncCommands;

use crate::client::{RedisPool, RedisResult};

/// Key for a tenant-scoped list query; `fingerprint` encodes the filter set.
pub fn list_key(organization_id: &str, fingerprint: &str) -> String {
    format!("bugs:{organization_id}:{fingerprint}")
}

/// Key for a single bug.
pub fn entity_key(bug_id: &str) -> String {
    format!("bug:{bug_id}")
}

/// Pattern matching every cached key of `family` for one organization.
pub fn organization_pattern(family: &str, organization_id: &str) -> String {
    format!("{family}:*{organization_id}*")
}

/// Fetch a cached value.
pub async fn get(pool: &RedisPool, key: &str) -> RedisResult<Option<String>> {
    let mut conn = pool.clone();
    let value: Option<String> = conn.get(key).await?;
    Ok(value)
}

/// Store a value under `key` for `ttl`.
pub async fn put(pool: &RedisPool, key: &str, value: &str, ttl: Duration) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
    Ok(())
}

/// Delete one exact key. Deleting a missing key is a no-op.
pub async fn delete(pool: &RedisPool, key: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.del::<_, ()>(key).await?;
    Ok(())
}

/// Delete every key matching `pattern`. Returns how many were removed.
pub async fn delete_pattern(pool: &RedisPool, pattern: &str) -> RedisResult<usize> {
    let mut conn = pool.clone();
    let mut keys = Vec::new();
    {
        let mut scan: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
        while let Some(key) = scan.next_item().await {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        return Ok(0);
    }
    let mut conn = pool.clone();
    conn.del::<_, ()>(&keys).await?;
    Ok(keys.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_scheme_is_consistent_between_paths() {
        // The invalidation pattern must cover every key the read path writes.
        let key = list_key("org-5", "open:high:all");
        let pattern = organization_pattern("bugs", "org-5");
        assert_eq!(key, "bugs:org-5:open:high:all");
        assert_eq!(pattern, "bugs:*org-5*");
        assert!(glob_matches(&pattern, &key));
    }

    #[test]
    fn entity_keys_are_not_tenant_scoped() {
        assert_eq!(entity_key("bug-12"), "bug:bug-12");
        assert!(!glob_matches(
            &organization_pattern("bugs", "org-5"),
            &entity_key("bug-12")
        ));
    }

    /// Minimal `*`-only glob, mirroring how the broker matches patterns.
    fn glob_matches(pattern: &str, input: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        let mut rest = input;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            match rest.find(part) {
                Some(pos) => {
                    if i == 0 && pos != 0 {
                        return false;
                    }
                    rest = &rest[pos + part.len()..];
                }
                None => return false,
            }
        }
        pattern.ends_with('*') || rest.is_empty()
    }

    mod integration {
        //! Round trips against a live instance; run with `--ignored`.

        use super::super::*;
        use crate::client::init_pool;

        const REDIS_URL: &str = "redis://127.0.0.1:6379";

        #[tokio::test]
        #[ignore = "Requires Redis server"]
        async fn invalidation_forces_a_cache_miss() {
            let pool = init_pool(REDIS_URL).await.unwrap();
            let key = list_key("org-5", "itest");
            put(&pool, &key, r#"[{"id":"bug-1"}]"#, Duration::from_secs(60))
                .await
                .unwrap();
            assert!(get(&pool, &key).await.unwrap().is_some());

            let removed = delete_pattern(&pool, &organization_pattern("bugs", "org-5"))
                .await
                .unwrap();
            assert!(removed >= 1);
            assert_eq!(get(&pool, &key).await.unwrap(), None);
        }

        #[tokio::test]
        #[ignore = "Requires Redis server"]
        async fn deleting_a_missing_key_is_a_no_op() {
            let pool = init_pool(REDIS_URL).await.unwrap();
            delete(&pool, "bug:does-not-exist").await.unwrap();
        }
    }
}
