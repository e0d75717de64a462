use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stayline_core::repository::{BookingRecord, BookingRepository};
use stayline_core::BoxError;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_reference_id: String,
    confirmation_number: String,
    client_reference_id: String,
    customer_id: String,
    hotel_code: String,
    hotel_name: Option<String>,
    check_in: chrono::NaiveDate,
    check_out: chrono::NaiveDate,
    booking_date: DateTime<Utc>,
    status: String,
    payment_status: String,
    total_fare: f64,
    currency: String,
    no_of_rooms: i32,
    invoice_number: String,
}

impl From<BookingRow> for BookingRecord {
    fn from(row: BookingRow) -> Self {
        BookingRecord {
            booking_reference_id: row.booking_reference_id,
            confirmation_number: row.confirmation_number,
            client_reference_id: row.client_reference_id,
            customer_id: row.customer_id,
            hotel_code: row.hotel_code,
            hotel_name: row.hotel_name,
            check_in: row.check_in,
            check_out: row.check_out,
            booking_date: row.booking_date,
            status: row.status,
            payment_status: row.payment_status,
            total_fare: row.total_fare,
            currency: row.currency,
            no_of_rooms: row.no_of_rooms,
            invoice_number: row.invoice_number,
        }
    }
}

const SELECT_BOOKING: &str = r#"
SELECT booking_reference_id, confirmation_number, client_reference_id, customer_id,
       hotel_code, hotel_name, check_in, check_out, booking_date, status,
       payment_status, total_fare, currency, no_of_rooms, invoice_number
FROM bookings
"#;

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn insert_booking(&self, record: &BookingRecord) -> Result<(), BoxError> {
        // Replays of the mirror write must not duplicate the row.
        sqlx::query(
            r#"
            INSERT INTO bookings (
                booking_reference_id, confirmation_number, client_reference_id,
                customer_id, hotel_code, hotel_name, check_in, check_out,
                booking_date, status, payment_status, total_fare, currency,
                no_of_rooms, invoice_number
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (booking_reference_id) DO NOTHING
            "#,
        )
        .bind(&record.booking_reference_id)
        .bind(&record.confirmation_number)
        .bind(&record.client_reference_id)
        .bind(&record.customer_id)
        .bind(&record.hotel_code)
        .bind(&record.hotel_name)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.booking_date)
        .bind(&record.status)
        .bind(&record.payment_status)
        .bind(record.total_fare)
        .bind(&record.currency)
        .bind(record.no_of_rooms)
        .bind(&record.invoice_number)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_reference(
        &self,
        booking_reference_id: &str,
    ) -> Result<Option<BookingRecord>, BoxError> {
        let row = sqlx::query_as::<_, BookingRow>(
            &format!("{} WHERE booking_reference_id = $1", SELECT_BOOKING),
        )
        .bind(booking_reference_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BookingRecord::from))
    }

    async fn list_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<BookingRecord>, BoxError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            &format!(
                "{} WHERE customer_id = $1 ORDER BY booking_date DESC",
                SELECT_BOOKING
            ),
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BookingRecord::from).collect())
    }

    async fn update_status(
        &self,
        booking_reference_id: &str,
        status: &str,
    ) -> Result<(), BoxError> {
        sqlx::query(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE booking_reference_id = $1",
        )
        .bind(booking_reference_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookingRecord>, BoxError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            &format!(
                "{} WHERE payment_status = 'Pending' AND status = 'Confirmed' AND booking_date < $1",
                SELECT_BOOKING
            ),
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BookingRecord::from).collect())
    }

    async fn add_event(
        &self,
        booking_reference_id: &str,
        event_type: &str,
        detail: Option<serde_json::Value>,
    ) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO booking_events (booking_reference_id, event_type, detail) VALUES ($1, $2, $3)",
        )
        .bind(booking_reference_id)
        .bind(event_type)
        .bind(detail)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
