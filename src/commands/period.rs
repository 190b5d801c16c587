use crate::args::PeriodArgs;
use crate::commands::{Out, CUSTOM_RANGE_NOT_READY};
use crate::format::format_date;
use crate::model::DateRange;
use chrono::NaiveDate;

/// Resolves the selected period against `today`. An unresolvable custom range is reported in the
/// message rather than as an error.
pub fn period(args: &PeriodArgs, today: NaiveDate) -> Out<DateRange> {
    let period = args.period();
    match period.resolve(Some(&args.custom()), today) {
        Some(range) => Out::new(
            format!(
                "{}: {} to {} ({} days)",
                period.label(),
                format_date(range.start()),
                format_date(range.end()),
                range.days()
            ),
            range,
        ),
        None => CUSTOM_RANGE_NOT_READY.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_financial_year_message() {
        let args = PeriodArgs::new(Period::FinancialYear, None, None);
        let out = period(&args, day(2024, 2, 10));
        assert_eq!(
            out.message(),
            "Financial Year: 01 Apr 2023 to 31 Mar 2024 (366 days)"
        );
        assert_eq!(out.structure().unwrap().start(), day(2023, 4, 1));
    }

    #[test]
    fn test_custom_not_ready() {
        let args = PeriodArgs::new(
            Period::Custom,
            Some("2024-02-01".into()),
            Some("2024-01-01".into()),
        );
        let out = period(&args, day(2024, 6, 15));
        assert_eq!(out.message(), CUSTOM_RANGE_NOT_READY);
        assert!(out.structure().is_none());

        let args = PeriodArgs::new(Period::Custom, Some("2024-02-01".into()), None);
        assert!(period(&args, day(2024, 6, 15)).structure().is_none());
    }

    #[test]
    fn test_previous_month_in_january() {
        let args = PeriodArgs::new(Period::PreviousMonth, None, None);
        let range = *period(&args, day(2024, 1, 20)).structure().unwrap();
        assert_eq!(range.start(), day(2023, 12, 1));
        assert_eq!(range.end(), day(2023, 12, 31));
    }
}
