// src/math.rs

pub const WEEKS_PER_YEAR: f64 = 52.0;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Annualized fee APR (percent) from a trailing week of fee revenue.
/// Zero TVL yields 0 instead of a division fault.
pub fn weekly_fee_apr(weekly_fees_usd: f64, tvl_usd: f64) -> f64 {
    if tvl_usd <= 0.0 {
        return 0.0;
    }
    weekly_fees_usd * WEEKS_PER_YEAR / tvl_usd * 100.0
}

/// Fee APR (percent) from one day of ticker volume.
///
/// `target_volume` is denominated in the target currency and converted to USD
/// with `last_price`; `fee_tier_percent` is the pool fee in percent (0.02 = 0.02%).
/// The result is rounded to 2 decimals.
pub fn daily_volume_apr(
    target_volume: f64,
    last_price: f64,
    fee_tier_percent: f64,
    liquidity_usd: f64,
) -> f64 {
    if liquidity_usd <= 0.0 {
        return 0.0;
    }
    let daily_volume_usd = target_volume * last_price;
    let daily_fees = daily_volume_usd * (fee_tier_percent / 100.0);
    let annualized_fees = daily_fees * DAYS_PER_YEAR;
    round2(annualized_fees / liquidity_usd * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a displayed percentage such as `"12.34%"` or `" 0.5 % "`
pub fn parse_percent(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let value: f64 = number.replace(',', "").parse().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_fee_apr() {
        // 7 x $100 on $36.4k TVL
        assert_eq!(weekly_fee_apr(700.0, 36_400.0), 100.0);
    }

    #[test]
    fn test_weekly_fee_apr_zero_tvl() {
        assert_eq!(weekly_fee_apr(1_000_000.0, 0.0), 0.0);
        assert_eq!(weekly_fee_apr(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_daily_volume_apr() {
        // 10 * 2000 * 0.0002 = $4/day -> $1460/yr on $1M
        assert_eq!(daily_volume_apr(10.0, 2000.0, 0.02, 1_000_000.0), 0.15);
    }

    #[test]
    fn test_daily_volume_apr_zero_liquidity() {
        assert_eq!(daily_volume_apr(10.0, 2000.0, 0.02, 0.0), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.146), 0.15);
        assert_eq!(round2(12.344), 12.34);
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("12.34%"), Some(12.34));
        assert_eq!(parse_percent(" 0.5 % "), Some(0.5));
        assert_eq!(parse_percent("7"), Some(7.0));
        assert_eq!(parse_percent("1,234.5%"), Some(1234.5));
        assert_eq!(parse_percent("-"), None);
        assert_eq!(parse_percent(""), None);
        assert_eq!(parse_percent("NaN%"), None);
    }
}
