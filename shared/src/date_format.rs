//! CMS timestamps and their pt-BR display form.

use chrono::{DateTime, Datelike, Utc};

/// Abbreviated month names used by the pt-BR locale.
const PT_BR_SHORT_MONTHS: [&str; 12] =
    ["jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez"];

/// Parse a CMS timestamp. The CMS emits offsets without a colon
/// (`2021-03-25T19:25:28+0000`), which RFC 3339 parsing rejects.
pub fn parse_cms_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// `dd MMM yyyy` in pt-BR, e.g. `25 mar 2021`.
pub fn format_post_date(date: &DateTime<Utc>) -> String {
    format!("{:02} {} {}", date.day(), PT_BR_SHORT_MONTHS[date.month0() as usize], date.year())
}

/// [`format_post_date`], or an empty string for unpublished documents.
pub fn format_optional_post_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(format_post_date).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn formats_fixed_timestamp_in_pt_br() {
        let date = Utc
            .with_ymd_and_hms(2021, 3, 25, 19, 25, 28)
            .single()
            .expect("valid date");
        assert_eq!(format_post_date(&date), "25 mar 2021");
    }

    #[test]
    fn pads_day_and_uses_portuguese_months() {
        let date = Utc
            .with_ymd_and_hms(2020, 2, 5, 0, 0, 0)
            .single()
            .expect("valid date");
        assert_eq!(format_post_date(&date), "05 fev 2020");

        let date = Utc
            .with_ymd_and_hms(2021, 9, 1, 12, 0, 0)
            .single()
            .expect("valid date");
        assert_eq!(format_post_date(&date), "01 set 2021");
    }

    #[test]
    fn parses_cms_offset_without_colon() {
        let parsed = parse_cms_timestamp("2021-03-25T19:25:28+0000").expect("parse");
        assert_eq!(format_post_date(&parsed), "25 mar 2021");
    }

    #[test]
    fn parses_rfc3339_and_normalises_to_utc() {
        let parsed = parse_cms_timestamp("2021-04-01T01:30:00+03:00").expect("parse");
        assert_eq!(format_post_date(&parsed), "31 mar 2021");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_cms_timestamp("yesterday").is_none());
        assert_eq!(format_optional_post_date(None), "");
    }
}
