use chrono::NaiveDate;

pub fn usd(price: &i64) -> ::askama::Result<String> {
    Ok(format!("${price}"))
}

// "2026-08-10" -> "Monday, August 10, 2026"; unparseable input passes through.
pub fn long_date(value: &str) -> ::askama::Result<String> {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Ok(date.format("%A, %B %-d, %Y").to_string()),
        Err(_) => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_render_in_dollars() {
        assert_eq!(usd(&85).unwrap(), "$85");
    }

    #[test]
    fn dates_render_long_form() {
        assert_eq!(long_date("2026-08-10").unwrap(), "Monday, August 10, 2026");
        assert_eq!(long_date("whenever").unwrap(), "whenever");
    }
}
