//! Streams broker: ready (FIFO list), retry (time-scored zset), dead-letter
//! (FIFO list).

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::{StreamError, StreamResult};

/// Default cap on the number of retry entries promoted per scheduler tick.
pub const DEFAULT_PROMOTE_BATCH_CAP: usize = 10;

/// `ZRANGEBYSCORE retry 0 now LIMIT 0 batch_cap` selects the due members,
/// `ZREM` removes exactly those members, `RPUSH` appends them to ready in
/// the order selected. All three steps run inside one `EVAL`, so no other
/// broker client can observe a partially-promoted batch.
const PROMOTE_DUE_SCRIPT: &str = r#"
local retry_key = KEYS[1]
local ready_key = KEYS[2]
local now = ARGV[1]
local batch_cap = ARGV[2]

local due = redis.call('ZRANGEBYSCORE', retry_key, '-inf', now, 'LIMIT', 0, batch_cap)
if #due == 0 then
    return 0
end

redis.call('ZREM', retry_key, unpack(due))
redis.call('RPUSH', ready_key, unpack(due))
return #due
"#;

/// The three broker-hosted collections the core depends on.
#[derive(Clone)]
pub struct Streams {
    conn: ConnectionManager,
    ready_key: String,
    retry_key: String,
    dead_letter_key: String,
    promote_due_script: redis::Script,
}

impl Streams {
    pub fn new(
        conn: ConnectionManager,
        ready_key: impl Into<String>,
        retry_key: impl Into<String>,
        dead_letter_key: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            ready_key: ready_key.into(),
            retry_key: retry_key.into(),
            dead_letter_key: dead_letter_key.into(),
            promote_due_script: redis::Script::new(PROMOTE_DUE_SCRIPT),
        }
    }

    /// Non-blocking head removal from the ready stream.
    pub async fn ready_pop(&self) -> StreamResult<Option<Uuid>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.lpop(&self.ready_key, None).await?;
        parse_entry(raw)
    }

    /// Tail append to the ready stream.
    pub async fn ready_push(&self, id: Uuid) -> StreamResult<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.ready_key, id.to_string())
            .await?;
        Ok(())
    }

    /// Idempotent insert/update into the retry set, scored by `due_at`
    /// (epoch seconds).
    pub async fn retry_add(&self, id: Uuid, due_at: i64) -> StreamResult<()> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(&self.retry_key, id.to_string(), due_at)
            .await?;
        Ok(())
    }

    /// Atomically promote every retry entry due at or before `now` (capped
    /// at `batch_cap`) to the ready stream. Returns the number promoted.
    pub async fn promote_due(&self, now: i64, batch_cap: usize) -> StreamResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = self
            .promote_due_script
            .key(&self.retry_key)
            .key(&self.ready_key)
            .arg(now)
            .arg(batch_cap)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    /// Tail append to the dead-letter stream. Never popped by the core.
    pub async fn dead_letter_push(&self, id: Uuid) -> StreamResult<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(&self.dead_letter_key, id.to_string())
            .await?;
        Ok(())
    }

    /// Current length of the ready stream, for the health/metrics surface.
    pub async fn ready_depth(&self) -> StreamResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(&self.ready_key).await?)
    }

    /// Current cardinality of the retry set.
    pub async fn retry_depth(&self) -> StreamResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.zcard(&self.retry_key).await?)
    }

    /// Current length of the dead-letter stream.
    pub async fn dead_letter_depth(&self) -> StreamResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(&self.dead_letter_key).await?)
    }
}

fn parse_entry(raw: Option<String>) -> StreamResult<Option<Uuid>> {
    match raw {
        None => Ok(None),
        Some(s) => Uuid::parse_str(&s)
            .map(Some)
            .map_err(|_| StreamError::MalformedEntry(s)),
    }
}
