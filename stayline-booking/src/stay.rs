use chrono::NaiveDate;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StayError {
    #[error("Check-out must be after check-in")]
    NotPositive,

    #[error("Stay duration is {nights} nights. Maximum allowed is {max} nights")]
    TooLong { nights: i64, max: i64 },
}

pub fn stay_nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// A stay must be at least one night and no longer than the configured
/// maximum (30 by default).
pub fn validate_stay(check_in: NaiveDate, check_out: NaiveDate, max_nights: i64) -> Result<i64, StayError> {
    let nights = stay_nights(check_in, check_out);
    if nights <= 0 {
        return Err(StayError::NotPositive);
    }
    if nights > max_nights {
        return Err(StayError::TooLong {
            nights,
            max: max_nights,
        });
    }
    Ok(nights)
}
