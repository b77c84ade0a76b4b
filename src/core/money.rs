//! Fixed-point money and quantity arithmetic.
//!
//! All monetary amounts inside the core are non-negative `i64` values in
//! grosze (1/100 PLN); quantities are `i64` milli-units (1/1000). Parsing
//! accepts `,` or `.` as the decimal separator. Rounding is half-up on
//! non-negative integers: `(n + d/2) / d`.

use super::error::{CoreError, CoreResult};
use super::types::VatRate;

/// Net/VAT/gross amounts of a single invoice line, in grosze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub net_grosze: i64,
    pub vat_grosze: i64,
    pub gross_grosze: i64,
}

/// Invoice-level sums, in grosze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal_grosze: i64,
    pub tax_grosze: i64,
    pub total_grosze: i64,
}

/// Parse a money amount into grosze.
///
/// Accepts `D+`, `D+.D` or `D+.DD` (comma allowed in place of the dot);
/// one fractional digit is padded to two. Signs, more than two fractional
/// digits, and empty input are rejected.
pub fn parse_money(input: &str) -> CoreResult<i64> {
    let (int_part, frac_part) = split_decimal(input, 2, "amount")?;
    let grosze = int_part
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(|| CoreError::validation("amount too large"))?;
    Ok(grosze)
}

/// Format grosze as `Z.GG`: always two fractional digits, no grouping.
pub fn format_money(grosze: i64) -> String {
    format!("{}.{:02}", grosze / 100, grosze % 100)
}

/// Parse a quantity into milli-units. Up to three fractional digits;
/// the result must be strictly positive.
pub fn parse_quantity(input: &str) -> CoreResult<i64> {
    let (int_part, frac_part) = split_decimal(input, 3, "quantity")?;
    let milli = int_part
        .checked_mul(1000)
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(|| CoreError::validation("quantity too large"))?;
    if milli <= 0 {
        return Err(CoreError::validation("quantity must be > 0"));
    }
    Ok(milli)
}

/// Canonicalise a quantity string: one-or-more integer digits without
/// leading zeros, fractional part without trailing zeros, no trailing
/// separator. `"02,500"` becomes `"2.5"`.
pub fn normalise_quantity(input: &str) -> CoreResult<String> {
    let milli = parse_quantity(input)?;
    let int = milli / 1000;
    let frac = milli % 1000;
    if frac == 0 {
        return Ok(int.to_string());
    }
    let mut frac_str = format!("{frac:03}");
    while frac_str.ends_with('0') {
        frac_str.pop();
    }
    Ok(format!("{int}.{frac_str}"))
}

/// Half-up division on non-negative integers.
pub fn round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(numerator >= 0 && denominator > 0);
    (numerator + denominator / 2) / denominator
}

/// Compute a line's net, VAT and gross amounts.
///
/// `net = half_up(price × qty, 1000)`; numeric rates take
/// `vat = half_up(net × rate, 100)`, ZW/NP lines carry zero VAT.
pub fn line_amounts(
    unit_price_grosze: i64,
    quantity_milli: i64,
    vat_rate: VatRate,
) -> CoreResult<LineAmounts> {
    if unit_price_grosze < 0 {
        return Err(CoreError::validation("unit price must not be negative"));
    }
    if quantity_milli <= 0 {
        return Err(CoreError::validation("quantity must be > 0"));
    }

    let net = round_half_up(unit_price_grosze as i128 * quantity_milli as i128, 1000);
    let vat = match vat_rate.percent() {
        Some(rate) => round_half_up(net * rate as i128, 100),
        None => 0,
    };
    let gross = net + vat;

    Ok(LineAmounts {
        net_grosze: to_i64(net)?,
        vat_grosze: to_i64(vat)?,
        gross_grosze: to_i64(gross)?,
    })
}

/// Sum per-line amounts into invoice totals. Each column is summed
/// independently; `total == subtotal + tax` holds by construction.
pub fn invoice_totals(lines: &[LineAmounts]) -> CoreResult<InvoiceTotals> {
    let mut subtotal: i64 = 0;
    let mut tax: i64 = 0;
    let mut total: i64 = 0;
    for line in lines {
        subtotal = checked_sum(subtotal, line.net_grosze)?;
        tax = checked_sum(tax, line.vat_grosze)?;
        total = checked_sum(total, line.gross_grosze)?;
    }
    Ok(InvoiceTotals {
        subtotal_grosze: subtotal,
        tax_grosze: tax,
        total_grosze: total,
    })
}

fn checked_sum(acc: i64, value: i64) -> CoreResult<i64> {
    acc.checked_add(value)
        .ok_or_else(|| CoreError::Internal("invoice totals overflow".into()))
}

fn to_i64(value: i128) -> CoreResult<i64> {
    i64::try_from(value).map_err(|_| CoreError::Internal("line amount overflow".into()))
}

/// Split a decimal string into (integer part, fractional part scaled to
/// `max_frac` digits). Shared by money (2) and quantity (3) parsing.
fn split_decimal(input: &str, max_frac: u32, what: &str) -> CoreResult<(i64, i64)> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("invalid {what} format: empty")));
    }
    let normalized = trimmed.replace(',', ".");

    let (int_str, frac_str) = match normalized.split_once('.') {
        Some((i, f)) => (i, f),
        None => (normalized.as_str(), ""),
    };

    if int_str.is_empty() || !int_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::validation(format!(
            "invalid {what} format: '{trimmed}'"
        )));
    }
    if normalized.contains('.') && frac_str.is_empty() {
        return Err(CoreError::validation(format!(
            "invalid {what} format: '{trimmed}'"
        )));
    }
    if frac_str.len() > max_frac as usize || !frac_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::validation(format!(
            "invalid {what} format: '{trimmed}'"
        )));
    }

    let int_part: i64 = int_str
        .parse()
        .map_err(|_| CoreError::validation(format!("{what} too large")))?;
    let mut frac_part: i64 = if frac_str.is_empty() {
        0
    } else {
        // Short fractional strings parse fine; the length cap above
        // keeps this under four digits.
        frac_str.parse().unwrap_or(0)
    };
    for _ in frac_str.len()..max_frac as usize {
        frac_part *= 10;
    }
    Ok((int_part, frac_part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_money_pads_fraction() {
        assert_eq!(parse_money("100").unwrap(), 10000);
        assert_eq!(parse_money("100.5").unwrap(), 10050);
        assert_eq!(parse_money("100.50").unwrap(), 10050);
        assert_eq!(parse_money("100,50").unwrap(), 10050);
        assert_eq!(parse_money(" 0.01 ").unwrap(), 1);
    }

    #[test]
    fn parse_money_rejects_malformed() {
        for bad in ["", "-1", "+1", "1.234", "1.", ".5", "1,2,3", "abc", "1 2"] {
            assert!(parse_money(bad).is_err(), "expected rejection of {bad:?}");
        }
    }

    #[test]
    fn parse_money_overflow() {
        let err = parse_money("99999999999999999999").unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn format_money_two_digits() {
        assert_eq!(format_money(0), "0.00");
        assert_eq!(format_money(1), "0.01");
        assert_eq!(format_money(10050), "100.50");
        assert_eq!(format_money(12300), "123.00");
    }

    #[test]
    fn money_round_trip() {
        for s in ["0.00", "0.01", "1.00", "123.45", "99999.99"] {
            assert_eq!(format_money(parse_money(s).unwrap()), s);
        }
    }

    #[test]
    fn parse_quantity_three_digits() {
        assert_eq!(parse_quantity("1").unwrap(), 1000);
        assert_eq!(parse_quantity("2.5").unwrap(), 2500);
        assert_eq!(parse_quantity("0.125").unwrap(), 125);
        assert_eq!(parse_quantity("0,4").unwrap(), 400);
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("0.0000").is_err());
        assert!(parse_quantity("1.2345").is_err());
    }

    #[test]
    fn normalise_quantity_canonical() {
        assert_eq!(normalise_quantity("02,500").unwrap(), "2.5");
        assert_eq!(normalise_quantity("1.000").unwrap(), "1");
        assert_eq!(normalise_quantity("0.125").unwrap(), "0.125");
        assert_eq!(normalise_quantity("10").unwrap(), "10");
    }

    #[test]
    fn line_amounts_standard_rate() {
        // 100.00 zł × 1 at 23%
        let amounts = line_amounts(10000, 1000, VatRate::Standard).unwrap();
        assert_eq!(amounts.net_grosze, 10000);
        assert_eq!(amounts.vat_grosze, 2300);
        assert_eq!(amounts.gross_grosze, 12300);
    }

    #[test]
    fn line_amounts_exempt_no_vat() {
        let amounts = line_amounts(5000, 3000, VatRate::Exempt).unwrap();
        assert_eq!(amounts.net_grosze, 15000);
        assert_eq!(amounts.vat_grosze, 0);
        assert_eq!(amounts.gross_grosze, 15000);
    }

    #[test]
    fn half_up_boundary() {
        // 1 grosz × 0.5: net = (1*500 + 500)/1000 = 1; vat = (23 + 50)/100 = 0
        let amounts = line_amounts(1, 500, VatRate::Standard).unwrap();
        assert_eq!(amounts.net_grosze, 1);
        assert_eq!(amounts.vat_grosze, 0);
        assert_eq!(amounts.gross_grosze, 1);

        // 1 grosz × 0.4 rounds all the way down
        let amounts = line_amounts(1, 400, VatRate::Standard).unwrap();
        assert_eq!(amounts.net_grosze, 0);
        assert_eq!(amounts.vat_grosze, 0);
        assert_eq!(amounts.gross_grosze, 0);
    }

    #[test]
    fn totals_sum_independently() {
        let lines = [
            line_amounts(10000, 1000, VatRate::Standard).unwrap(),
            line_amounts(8000, 2500, VatRate::Reduced8).unwrap(),
        ];
        let totals = invoice_totals(&lines).unwrap();
        assert_eq!(totals.subtotal_grosze, 30000);
        assert_eq!(totals.tax_grosze, 3900);
        assert_eq!(totals.total_grosze, 33900);
        assert_eq!(
            totals.total_grosze,
            totals.subtotal_grosze + totals.tax_grosze
        );
    }
}
