use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stayline_core::repository::{
    CustomerRecord, CustomerRepository, WishlistEntry, WishlistRepository,
};
use stayline_core::BoxError;
use stayline_shared::pii::Masked;
use uuid::Uuid;

pub struct StoreCustomerRepository {
    pool: PgPool,
}

impl StoreCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    customer_id: String,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for CustomerRecord {
    fn from(row: CustomerRow) -> Self {
        CustomerRecord {
            customer_id: row.customer_id,
            email: Masked(row.email),
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone.map(Masked),
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CustomerRepository for StoreCustomerRepository {
    async fn create(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<CustomerRecord, BoxError> {
        let customer_id = Uuid::new_v4().to_string();

        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (customer_id, email, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING customer_id, email, first_name, last_name, phone, created_at
            "#,
        )
        .bind(&customer_id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, BoxError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT customer_id, email, first_name, last_name, phone, created_at
             FROM customers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerRecord::from))
    }

    async fn find_by_id(&self, customer_id: &str) -> Result<Option<CustomerRecord>, BoxError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT customer_id, email, first_name, last_name, phone, created_at
             FROM customers WHERE customer_id = $1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerRecord::from))
    }

    async fn update_profile(
        &self,
        customer_id: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE customers SET first_name = $2, last_name = $3, phone = $4
             WHERE customer_id = $1",
        )
        .bind(customer_id)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct StoreWishlistRepository {
    pool: PgPool,
}

impl StoreWishlistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    customer_id: String,
    hotel_code: String,
    hotel_name: Option<String>,
    city_code: Option<String>,
    added_at: DateTime<Utc>,
}

#[async_trait]
impl WishlistRepository for StoreWishlistRepository {
    async fn add(&self, entry: &WishlistEntry) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO wishlist (customer_id, hotel_code, hotel_name, city_code)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_id, hotel_code) DO NOTHING
            "#,
        )
        .bind(&entry.customer_id)
        .bind(&entry.hotel_code)
        .bind(&entry.hotel_name)
        .bind(&entry.city_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, customer_id: &str) -> Result<Vec<WishlistEntry>, BoxError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            "SELECT customer_id, hotel_code, hotel_name, city_code, added_at
             FROM wishlist WHERE customer_id = $1 ORDER BY added_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| WishlistEntry {
                customer_id: row.customer_id,
                hotel_code: row.hotel_code,
                hotel_name: row.hotel_name,
                city_code: row.city_code,
                added_at: row.added_at,
            })
            .collect())
    }

    async fn remove(&self, customer_id: &str, hotel_code: &str) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "DELETE FROM wishlist WHERE customer_id = $1 AND hotel_code = $2",
        )
        .bind(customer_id)
        .bind(hotel_code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
