use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Client, CustomRedisError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRedisCall {
    pub op: String,
    pub key: String,
}

/// In-memory stand-in for `RedisClient`. Keys without a configured return value
/// behave like absent keys.
#[derive(Clone, Default)]
pub struct MockRedisClient {
    get_ret: HashMap<String, Result<String, CustomRedisError>>,
    calls: Arc<Mutex<Vec<MockRedisCall>>>,
}

impl MockRedisClient {
    pub fn new() -> Self {
        Self::default()
    }

    // Helper method to safely lock the calls mutex
    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<MockRedisCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get_ret(&mut self, key: &str, ret: Result<String, CustomRedisError>) -> Self {
        self.get_ret.insert(key.to_owned(), ret);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<MockRedisCall> {
        self.lock_calls().clone()
    }
}

#[async_trait]
impl Client for MockRedisClient {
    async fn get(&self, k: String) -> Result<String, CustomRedisError> {
        self.lock_calls().push(MockRedisCall {
            op: "get".to_string(),
            key: k.clone(),
        });

        match self.get_ret.get(&k) {
            Some(ret) => ret.clone(),
            None => Err(CustomRedisError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_and_defaults_to_not_found() {
        let client = MockRedisClient::new().get_ret("tg1:meter1:ia", Ok("12.5".to_string()));

        assert_eq!(client.get("tg1:meter1:ia".to_string()).await.unwrap(), "12.5");
        assert!(client
            .get("tg1:meter1:ib".to_string())
            .await
            .unwrap_err()
            .is_not_found());

        let keys: Vec<String> = client.get_calls().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["tg1:meter1:ia", "tg1:meter1:ib"]);
    }
}
