use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};
use stayline_core::repository::FlowStore;
use stayline_core::BoxError;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    // Hash operations for booking-flow sessions, key flow:{reference}

    pub async fn hset_flow_field(
        &self,
        reference: &str,
        field: &str,
        value: &str,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("flow:{}", reference);
        conn.hset(key, field, value).await
    }

    pub async fn hget_flow_field(
        &self,
        reference: &str,
        field: &str,
    ) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("flow:{}", reference);
        conn.hget(key, field).await
    }

    pub async fn hdel_flow_field(&self, reference: &str, field: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("flow:{}", reference);
        conn.hdel(key, field).await
    }

    pub async fn del_flow_key(&self, reference: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("flow:{}", reference);
        conn.del(key).await
    }

    pub async fn exp_flow_key(&self, reference: &str, ttl_seconds: u64) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("flow:{}", reference);
        conn.expire(key, ttl_seconds as i64).await
    }

    /// SET NX confirmation lock; only the first caller within the TTL gets
    /// true. This is what makes the final booking call single-shot.
    pub async fn acquire_confirm_lock(
        &self,
        reference: &str,
        ttl_seconds: u64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("confirm_lock:{}", reference);

        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    pub async fn set_order_binding(
        &self,
        order_ref: &str,
        reference: &str,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("order:{}", order_ref);
        conn.set_ex::<_, _, ()>(key, reference, ttl_seconds).await
    }

    pub async fn get_order_binding(&self, order_ref: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("order:{}", order_ref);
        conn.get(key).await
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[async_trait]
impl FlowStore for RedisClient {
    async fn set_field(&self, reference: &str, field: &str, value: &str) -> Result<(), BoxError> {
        Ok(self.hset_flow_field(reference, field, value).await?)
    }

    async fn get_field(
        &self,
        reference: &str,
        field: &str,
    ) -> Result<Option<String>, BoxError> {
        Ok(self.hget_flow_field(reference, field).await?)
    }

    async fn remove_field(&self, reference: &str, field: &str) -> Result<(), BoxError> {
        Ok(self.hdel_flow_field(reference, field).await?)
    }

    async fn delete(&self, reference: &str) -> Result<(), BoxError> {
        Ok(self.del_flow_key(reference).await?)
    }

    async fn expire(&self, reference: &str, ttl_seconds: u64) -> Result<(), BoxError> {
        Ok(self.exp_flow_key(reference, ttl_seconds).await?)
    }

    async fn acquire_confirm_lock(
        &self,
        reference: &str,
        ttl_seconds: u64,
    ) -> Result<bool, BoxError> {
        Ok(RedisClient::acquire_confirm_lock(self, reference, ttl_seconds).await?)
    }

    async fn bind_order_ref(
        &self,
        order_ref: &str,
        reference: &str,
        ttl_seconds: u64,
    ) -> Result<(), BoxError> {
        Ok(self.set_order_binding(order_ref, reference, ttl_seconds).await?)
    }

    async fn lookup_order_ref(&self, order_ref: &str) -> Result<Option<String>, BoxError> {
        Ok(self.get_order_binding(order_ref).await?)
    }
}
