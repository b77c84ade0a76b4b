//! Property-based tests for the money and quantity arithmetic.

use fakturka::{
    LineAmounts, VatRate, format_money, invoice_totals, line_amounts, normalise_quantity,
    parse_money, parse_quantity, round_half_up,
};
use proptest::prelude::*;

fn arb_vat_rate() -> impl Strategy<Value = VatRate> {
    prop_oneof![
        Just(VatRate::Standard),
        Just(VatRate::Reduced8),
        Just(VatRate::Reduced5),
        Just(VatRate::Zero),
        Just(VatRate::Exempt),
        Just(VatRate::NotSubject),
    ]
}

proptest! {
    // format(parse(s)) equals s canonicalised to two fractional digits
    #[test]
    fn money_round_trips(int in 0u64..1_000_000_000_000, frac in 0u32..100) {
        let canonical = format!("{int}.{frac:02}");
        let grosze = parse_money(&canonical).unwrap();
        prop_assert_eq!(format_money(grosze), canonical);
    }

    #[test]
    fn money_padding_is_canonicalisation(int in 0u64..1_000_000_000, frac in 0u32..10) {
        // one fractional digit pads to two; no fraction pads to ".00"
        let one_digit = format!("{int}.{frac}");
        prop_assert_eq!(
            format_money(parse_money(&one_digit).unwrap()),
            format!("{int}.{frac}0")
        );
        let bare = int.to_string();
        prop_assert_eq!(format_money(parse_money(&bare).unwrap()), format!("{int}.00"));
    }

    #[test]
    fn comma_and_dot_parse_identically(int in 0u64..1_000_000, frac in 0u32..100) {
        let with_dot = format!("{int}.{frac:02}");
        let with_comma = format!("{int},{frac:02}");
        prop_assert_eq!(
            parse_money(&with_dot).unwrap(),
            parse_money(&with_comma).unwrap()
        );
    }

    // gross == net + vat; ZW/NP carry zero VAT; numeric rates follow half-up
    #[test]
    fn line_amounts_are_consistent(
        price in 0i64..10_000_000,
        qty_milli in 1i64..1_000_000,
        rate in arb_vat_rate(),
    ) {
        let amounts = line_amounts(price, qty_milli, rate).unwrap();
        prop_assert_eq!(
            amounts.gross_grosze,
            amounts.net_grosze + amounts.vat_grosze
        );
        prop_assert!(amounts.net_grosze >= 0);
        match rate.percent() {
            None => prop_assert_eq!(amounts.vat_grosze, 0),
            Some(pct) => {
                let expected =
                    round_half_up(amounts.net_grosze as i128 * pct as i128, 100) as i64;
                prop_assert_eq!(amounts.vat_grosze, expected);
            }
        }
    }

    // totals are independent column sums and stay additive
    #[test]
    fn totals_are_additive(
        lines in prop::collection::vec(
            (0i64..1_000_000, 1i64..100_000, arb_vat_rate()),
            1..20,
        ),
    ) {
        let amounts: Vec<LineAmounts> = lines
            .iter()
            .map(|(price, qty, rate)| line_amounts(*price, *qty, *rate).unwrap())
            .collect();
        let totals = invoice_totals(&amounts).unwrap();

        let net: i64 = amounts.iter().map(|a| a.net_grosze).sum();
        let vat: i64 = amounts.iter().map(|a| a.vat_grosze).sum();
        let gross: i64 = amounts.iter().map(|a| a.gross_grosze).sum();
        prop_assert_eq!(totals.subtotal_grosze, net);
        prop_assert_eq!(totals.tax_grosze, vat);
        prop_assert_eq!(totals.total_grosze, gross);
        prop_assert_eq!(totals.total_grosze, totals.subtotal_grosze + totals.tax_grosze);
    }

    // canonicalisation preserves the parsed value
    #[test]
    fn quantity_canonical_form_is_stable(int in 0u64..1_000_000, frac in 0u32..1000) {
        let raw = format!("{int}.{frac:03}");
        if let Ok(milli) = parse_quantity(&raw) {
            let canonical = normalise_quantity(&raw).unwrap();
            prop_assert_eq!(parse_quantity(&canonical).unwrap(), milli);
            // canonical form is a fixed point of normalisation
            prop_assert_eq!(normalise_quantity(&canonical).unwrap(), canonical);
        }
    }
}
