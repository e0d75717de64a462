use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use stayline_core::repository::BookingRepository;
use stayline_core::supplier::HotelSupplier;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Background sweep for pay-later bookings whose payment never arrived.
/// Confirmed bookings with payment still pending past the configured window
/// are cancelled with the supplier and marked in the mirror.
pub async fn start_expiry_worker(
    bookings: Arc<dyn BookingRepository>,
    supplier: Arc<dyn HotelSupplier>,
    unpaid_cancel_after_hours: i64,
    sweep_seconds: u64,
) {
    info!(
        "Unpaid-booking expiry worker started (window {}h, sweep every {}s)",
        unpaid_cancel_after_hours, sweep_seconds
    );

    loop {
        sleep(Duration::from_secs(sweep_seconds)).await;

        let cutoff = Utc::now() - ChronoDuration::hours(unpaid_cancel_after_hours);
        let stale = match bookings.find_stale_pending(cutoff).await {
            Ok(stale) => stale,
            Err(e) => {
                error!("Expiry sweep query failed: {}", e);
                continue;
            }
        };

        if stale.is_empty() {
            continue;
        }
        info!("Expiry sweep found {} unpaid bookings", stale.len());

        for record in stale {
            let reference = record.booking_reference_id.clone();

            match supplier.cancel(&record.confirmation_number).await {
                Ok(response) => {
                    let code = response
                        .pointer("/Status/Code")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    if code != "200" && code != "201" {
                        warn!(
                            "Supplier refused auto-cancel for {}: {:?}",
                            reference,
                            response.pointer("/Status/Description")
                        );
                        continue;
                    }
                }
                Err(e) => {
                    // Left pending; the next sweep retries.
                    warn!("Auto-cancel call failed for {}: {}", reference, e);
                    continue;
                }
            }

            if let Err(e) = bookings.update_status(&reference, "Cancelled").await {
                error!("Failed to mark {} cancelled: {}", reference, e);
                continue;
            }
            let _ = bookings
                .add_event(
                    &reference,
                    "AUTO_CANCELLED_UNPAID",
                    Some(json!({ "cutoff": cutoff })),
                )
                .await;

            info!("Auto-cancelled unpaid booking {}", reference);
        }
    }
}
