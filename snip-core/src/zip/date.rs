//! Legacy DOS date/time packing used by zip entry headers.

use time::OffsetDateTime;

/// 16-bit date + 16-bit time, as stored in local and central headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DosDateTime {
    pub date: u16,
    pub time: u16,
}

/// Pack a timestamp into the DOS representation: year offset from 1980
/// clamped into [1980, 2107], seconds truncated to 2-second resolution.
pub fn to_dos_datetime(t: OffsetDateTime) -> DosDateTime {
    let year = t.year().clamp(1980, 2107) as u16;
    let month = u8::from(t.month()) as u16;
    let day = t.day() as u16;
    let hours = t.hour() as u16;
    let minutes = t.minute() as u16;
    let seconds = (t.second() / 2) as u16;

    DosDateTime {
        date: ((year - 1980) << 9) | (month << 5) | day,
        time: (hours << 11) | (minutes << 5) | seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn packs_fields() {
        let dt = to_dos_datetime(datetime!(2024-03-15 10:30:45 UTC));
        assert_eq!(dt.date, ((2024 - 1980) << 9) | (3 << 5) | 15);
        // 45 s truncates to 22 two-second units.
        assert_eq!(dt.time, (10 << 11) | (30 << 5) | 22);
    }

    #[test]
    fn clamps_year_low_and_high() {
        let dt = to_dos_datetime(datetime!(1975-06-01 00:00:00 UTC));
        assert_eq!(dt.date >> 9, 0);
        let dt = to_dos_datetime(datetime!(2150-06-01 00:00:00 UTC));
        assert_eq!(dt.date >> 9, 2107 - 1980);
    }
}
