use chrono::{Datelike, NaiveDate};

/// Whole years elapsed between `birth` and `today`.
///
/// A birthday counts once the calendar reaches the same month and day, so a
/// Feb 29 birth date rolls over on Mar 1 in non-leap years. Birth dates in the
/// future yield 0.
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> u32 {
    if today <= birth {
        return 0;
    }

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// True once strictly more than `years` have elapsed since `birth`, i.e. the
/// day after the birthday on which the applicant turned `years`.
pub fn is_older_than(birth: NaiveDate, today: NaiveDate, years: u32) -> bool {
    today > birth
        && today
            .pred_opt()
            .map(|yesterday| age_in_years(birth, yesterday) >= years)
            .unwrap_or(false)
}
