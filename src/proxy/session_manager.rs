use rand::Rng;
use tokio::sync::Mutex;

/// deviceId 随机段字母表 (不含 '-')
const DEVICE_ID_ALPHABET: &[u8] = b"useandom26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";
const DEVICE_ID_RANDOM_LEN: usize = 20;

#[derive(Debug, Clone)]
struct Session {
    device_id: String,
    conversation_id: Option<String>,
    conversation_count: u32,
}

/// Identifiers handed to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIds {
    pub device_id: String,
    pub conversation_id: Option<String>,
}

/// Owns the upstream device identity and rotates it after
/// `max_conversation_count` requests.
///
/// One instance per server, shared through `AppState`. All reads and writes of
/// the session go through a single mutex, so the rotation decision and the
/// counter update happen atomically for each request.
pub struct SessionManager {
    session: Mutex<Option<Session>>,
    max_conversation_count: u32,
}

impl SessionManager {
    pub fn new(max_conversation_count: u32) -> Self {
        Self {
            session: Mutex::new(None),
            max_conversation_count,
        }
    }

    /// Return the current ids, minting a fresh device id when forced, on first
    /// use, or once the rolling count reached the limit.
    pub async fn get_or_create_ids(&self, force_new: bool) -> SessionIds {
        let mut guard = self.session.lock().await;

        if let Some(s) = guard.as_mut() {
            if !force_new && s.conversation_count < self.max_conversation_count {
                s.conversation_count += 1;
                return SessionIds {
                    device_id: s.device_id.clone(),
                    conversation_id: s.conversation_id.clone(),
                };
            }
        }

        let device_id = generate_device_id();
        let action_msg = if force_new { "Force rotate" } else { "Rotate" };
        tracing::info!(device_id = %device_id, "{} device identity", action_msg);
        *guard = Some(Session {
            device_id: device_id.clone(),
            conversation_id: None,
            conversation_count: 0,
        });

        SessionIds {
            device_id,
            conversation_id: None,
        }
    }

    /// Remember the conversation opened for `device_id`. Ignored if the
    /// session rotated in the meantime.
    pub async fn record_conversation(&self, device_id: &str, conversation_id: &str) {
        let mut guard = self.session.lock().await;
        if let Some(s) = guard.as_mut() {
            if s.device_id == device_id {
                s.conversation_id = Some(conversation_id.to_string());
            }
        }
    }

    pub async fn conversation_count(&self) -> Option<u32> {
        self.session.lock().await.as_ref().map(|s| s.conversation_count)
    }

    pub fn max_conversation_count(&self) -> u32 {
        self.max_conversation_count
    }
}

/// `<uuid without hyphens>_<20 random alphabet chars>`
pub fn generate_device_id() -> String {
    let mut bytes = [0u8; DEVICE_ID_RANDOM_LEN];
    rand::thread_rng().fill(&mut bytes[..]);

    let suffix: String = bytes
        .iter()
        .map(|b| DEVICE_ID_ALPHABET[*b as usize % DEVICE_ID_ALPHABET.len()] as char)
        .collect();

    format!("{}_{}", uuid::Uuid::new_v4().simple(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_shape() {
        let id = generate_device_id();
        let (uuid_part, suffix) = id.split_once('_').unwrap();
        assert_eq!(uuid_part.len(), 32);
        assert!(uuid_part.chars().all(|c| c.is_ascii_hexdigit()));
        // the alphabet itself contains '_', so only the length is fixed
        assert_eq!(id.len(), 32 + 1 + DEVICE_ID_RANDOM_LEN);
        assert!(suffix
            .bytes()
            .all(|b| DEVICE_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_device_ids_differ() {
        assert_ne!(generate_device_id(), generate_device_id());
    }

    #[tokio::test]
    async fn test_reuses_ids_until_limit() {
        let manager = SessionManager::new(50);

        let first = manager.get_or_create_ids(false).await;
        assert_eq!(first.conversation_id, None);
        assert_eq!(manager.conversation_count().await, Some(0));

        for i in 1..=50 {
            let ids = manager.get_or_create_ids(false).await;
            assert_eq!(ids.device_id, first.device_id);
            assert_eq!(manager.conversation_count().await, Some(i));
        }

        // counter has reached the limit: next call rotates
        let rotated = manager.get_or_create_ids(false).await;
        assert_ne!(rotated.device_id, first.device_id);
        assert_eq!(manager.conversation_count().await, Some(0));
    }

    #[tokio::test]
    async fn test_force_new_rotates_and_clears_conversation() {
        let manager = SessionManager::new(50);
        let first = manager.get_or_create_ids(false).await;
        manager.record_conversation(&first.device_id, "conv-1").await;

        let again = manager.get_or_create_ids(false).await;
        assert_eq!(again.conversation_id.as_deref(), Some("conv-1"));

        let forced = manager.get_or_create_ids(true).await;
        assert_ne!(forced.device_id, first.device_id);
        assert_eq!(forced.conversation_id, None);
        assert_eq!(manager.conversation_count().await, Some(0));
    }

    #[tokio::test]
    async fn test_record_conversation_ignores_stale_device() {
        let manager = SessionManager::new(50);
        let first = manager.get_or_create_ids(false).await;
        let _ = manager.get_or_create_ids(true).await;

        manager.record_conversation(&first.device_id, "stale").await;
        let ids = manager.get_or_create_ids(false).await;
        assert_eq!(ids.conversation_id, None);
    }

    #[tokio::test]
    async fn test_concurrent_requests_count_exactly() {
        let manager = std::sync::Arc::new(SessionManager::new(1000));
        manager.get_or_create_ids(false).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let m = manager.clone();
            handles.push(tokio::spawn(async move {
                m.get_or_create_ids(false).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(manager.conversation_count().await, Some(20));
    }
}
