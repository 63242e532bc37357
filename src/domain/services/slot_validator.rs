use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use crate::domain::models::booking::Booking;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotRejection {
    #[error("Booking time must be within salon's open hours: {} to {}", .open.format("%H:%M"), .close.format("%H:%M"))]
    OutsideOpeningHours { open: NaiveTime, close: NaiveTime },
    #[error("Time slot is not available")]
    Unavailable,
}

impl From<SlotRejection> for AppError {
    fn from(rejection: SlotRejection) -> Self {
        AppError::Validation(rejection.to_string())
    }
}

/// Checks `[start, end)` against the salon's hours and every booking already
/// held by the salon.
///
/// Hours are evaluated on the calendar date of `start` in the salon's
/// timezone; a slot running past midnight is therefore always rejected.
/// Any existing booking blocks, whatever its status. Besides plain interval
/// overlap, a shared start or a shared end also counts as a conflict.
pub fn validate_slot(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    hours: &OpeningHours,
    existing: &[Booking],
) -> Result<(), SlotRejection> {
    let local_start = start.with_timezone(&hours.timezone).naive_local();
    let local_end = end.with_timezone(&hours.timezone).naive_local();
    let day = local_start.date();

    if local_start < day.and_time(hours.open) || local_end > day.and_time(hours.close) {
        return Err(SlotRejection::OutsideOpeningHours { open: hours.open, close: hours.close });
    }

    let conflict = existing.iter().any(|e| {
        (start < e.end_time && end > e.start_time) || start == e.start_time || end == e.end_time
    });

    if conflict {
        return Err(SlotRejection::Unavailable);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking::{BookingStatus, NewBookingParams};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn hours(tz: Tz) -> OpeningHours {
        OpeningHours {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            timezone: tz,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 4, h, m, 0).unwrap()
    }

    fn existing(start: DateTime<Utc>, minutes: i64, status: BookingStatus) -> Booking {
        let mut b = Booking::new(NewBookingParams {
            salon_id: "salon-1".into(),
            customer_user_id: "someone".into(),
            start,
            duration_min: minutes,
            service_ids: vec!["svc".into()],
            total_price: Decimal::ONE,
        }).unwrap();
        b.status = status;
        b
    }

    #[test]
    fn overlap_and_shared_boundaries_are_rejected() {
        let taken = vec![existing(at(10, 0), 30, BookingStatus::Confirmed)];
        let h = hours(chrono_tz::UTC);

        assert_eq!(validate_slot(at(10, 15), at(10, 45), &h, &taken), Err(SlotRejection::Unavailable));
        // Touches the end of the existing booking without overlapping it.
        assert_eq!(validate_slot(at(10, 30), at(11, 0), &h, &taken), Err(SlotRejection::Unavailable));
        assert_eq!(validate_slot(at(10, 31), at(11, 0), &h, &taken), Ok(()));
    }

    #[test]
    fn shared_start_or_end_is_a_conflict() {
        let taken = vec![existing(at(12, 0), 60, BookingStatus::Pending)];
        let h = hours(chrono_tz::UTC);

        assert!(validate_slot(at(12, 0), at(12, 15), &h, &taken).is_err());
        assert!(validate_slot(at(11, 30), at(13, 0), &h, &taken).is_err());
        assert_eq!(validate_slot(at(13, 0), at(13, 30), &h, &taken), Err(SlotRejection::Unavailable));
        assert_eq!(validate_slot(at(13, 1), at(13, 30), &h, &taken), Ok(()));
    }

    #[test]
    fn cancelled_bookings_still_block() {
        let taken = vec![existing(at(15, 0), 30, BookingStatus::Cancelled)];
        assert_eq!(
            validate_slot(at(15, 0), at(15, 30), &hours(chrono_tz::UTC), &taken),
            Err(SlotRejection::Unavailable)
        );
    }

    #[test]
    fn outside_opening_hours() {
        let h = hours(chrono_tz::UTC);
        assert!(matches!(
            validate_slot(at(8, 30), at(9, 30), &h, &[]),
            Err(SlotRejection::OutsideOpeningHours { .. })
        ));
        assert!(matches!(
            validate_slot(at(17, 30), at(18, 15), &h, &[]),
            Err(SlotRejection::OutsideOpeningHours { .. })
        ));
        assert_eq!(validate_slot(at(17, 0), at(18, 0), &h, &[]), Ok(()));
        assert_eq!(validate_slot(at(9, 0), at(9, 45), &h, &[]), Ok(()));
    }

    #[test]
    fn hours_are_read_in_salon_timezone() {
        let h = hours(chrono_tz::Europe::Berlin);
        // 08:30 UTC is 09:30 in Berlin during winter time.
        assert_eq!(validate_slot(at(8, 30), at(9, 0), &h, &[]), Ok(()));
        // Ends at 18:15 local.
        assert!(validate_slot(at(16, 30), at(16, 30) + Duration::minutes(45), &h, &[]).is_err());
    }

    #[test]
    fn rejection_message_names_the_hours() {
        let err = validate_slot(at(7, 0), at(7, 30), &hours(chrono_tz::UTC), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Booking time must be within salon's open hours: 09:00 to 18:00");
    }
}
