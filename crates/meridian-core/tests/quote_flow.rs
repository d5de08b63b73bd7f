//! End-to-end quote flows: snapshot in, payload out.

use std::collections::BTreeMap;

use meridian_core::cart::CartCharges;
use meridian_core::money::{Money, Rate};
use meridian_core::quotation::{assemble, QuoteFormValues, QuoteOverview};
use meridian_core::seller::{group, overall_summary, PricingEntry, PricingSource};
use meridian_core::snapshot::{recompute, QuoteSnapshot};
use meridian_core::types::{
    HsnDetails, Ident, LineItem, ProductTaxDetail, TaxComponent, TaxSchedule, VolumeDiscountObj,
    VolumeDiscountTier,
};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn pct(n: i64) -> Rate {
    Rate::from_percent(Decimal::from(n))
}

fn inter_hsn(rate: i64) -> HsnDetails {
    HsnDetails {
        hsn_code: Some("8471".into()),
        tax: pct(rate),
        inter_tax: Some(TaxSchedule {
            total_tax: pct(rate),
            taxes: vec![TaxComponent {
                tax_name: "IGST".into(),
                rate: pct(rate),
                compound: false,
            }],
        }),
        intra_tax: Some(TaxSchedule {
            total_tax: pct(rate),
            taxes: vec![
                TaxComponent { tax_name: "CESS".into(), rate: pct(1), compound: true },
                TaxComponent { tax_name: "CGST".into(), rate: pct(rate / 2), compound: false },
                TaxComponent { tax_name: "SGST".into(), rate: pct(rate / 2), compound: false },
            ],
        }),
    }
}

/// One seller, one line: 10 × 100 with 10% tax and a P&F base of 50.
fn reference_snapshot() -> QuoteSnapshot {
    let line = LineItem::new(1, Decimal::TEN, Money::from_major(100))
        .with_seller("s1")
        .with_hsn(inter_hsn(10));

    let mut tiers = BTreeMap::new();
    tiers.insert(
        "s1".to_string(),
        vec![VolumeDiscountTier {
            product_id: Some(Ident::Number(1)),
            applied_discount: pct(10),
            ..Default::default()
        }],
    );
    let mut charges = BTreeMap::new();
    charges.insert(
        "s1".to_string(),
        CartCharges {
            pf_rate_base: Money::from_major(50),
            ..Default::default()
        },
    );

    QuoteSnapshot {
        lines: vec![line],
        is_inter: true,
        volume_discount_tiers: tiers,
        charges,
        ..Default::default()
    }
}

fn payload_json(snapshot: &QuoteSnapshot) -> String {
    let result = recompute(snapshot);
    let form = result.form_values(&snapshot.form, snapshot);
    let payload = assemble(&form, &snapshot.overview, snapshot.previous.as_ref()).unwrap();
    serde_json::to_string(&payload).unwrap()
}

#[test]
fn tiered_reference_scenario() {
    let snapshot = reference_snapshot();
    let result = recompute(&snapshot);

    let vd = result.vd_summary.expect("volume discount should run");
    assert!(result.vd_applied);
    assert_eq!(vd.sub_total, Money::from_major(1000));
    assert_eq!(vd.sub_total_volume, Money::from_major(900));
    assert_eq!(vd.volume_discount_applied, Money::from_major(100));
    assert_eq!(vd.pf_rate, Money::from_major(45));
    assert_eq!(vd.overall_tax, Money::new(dec("94.5")));
    assert_eq!(vd.grand_total, Money::new(dec("1039.5")));

    let line = &result.lines[0];
    assert_eq!(line.unit_price, Money::from_major(90));
    assert_eq!(line.total_price, Money::from_major(900));
    assert_eq!(line.pf_rate, Money::from_major(45));
    assert!(line.volume_discount_applied);
}

#[test]
fn feeding_priced_lines_back_keeps_the_savings() {
    let snapshot = reference_snapshot();
    let first = recompute(&snapshot);

    let mut again = snapshot.clone();
    again.lines = first.lines.clone();
    let second = recompute(&again);

    let vd = second.vd_summary.expect("volume discount should run");
    assert_eq!(vd.sub_total, Money::from_major(1000));
    assert_eq!(vd.volume_discount_applied, Money::from_major(100));
    assert_eq!(vd.grand_total, Money::new(dec("1039.5")));
    assert_eq!(second.vd_summary, first.vd_summary);
    assert_eq!(second.summary, first.summary);
    assert_eq!(second.lines[0].unit_price, Money::from_major(90));
}

#[test]
fn oversized_amounts_price_to_zero_without_panicking() {
    let mut snapshot = reference_snapshot();
    snapshot.lines[0].unit_list_price = Money::new(dec("100000000000000000000"));
    snapshot.lines[0].unit_price = snapshot.lines[0].unit_list_price;
    snapshot.lines[0].quantity = dec("1000000000");

    let result = recompute(&snapshot);
    let line = &result.lines[0];
    assert!(line.total_price.is_zero());
    assert!(result.summary.total_value.is_zero());
    assert_eq!(result.vd_summary.map(|v| v.sub_total), Some(Money::ZERO));
}

#[test]
fn total_price_is_rounded_quantity_times_unit_price() {
    let mut fractional = LineItem::new(2, dec("2.5"), Money::new(dec("3.333"))).with_seller("s1");
    fractional.volume_discount_obj = Some(VolumeDiscountObj {
        percentage: Rate::from_percent(dec("7.5")),
        ..Default::default()
    });
    let plain = LineItem::new(3, dec("1.5"), Money::new(dec("9.99"))).with_seller("s2");

    let snapshot = QuoteSnapshot {
        lines: vec![fractional, plain],
        ..Default::default()
    };
    let result = recompute(&snapshot);

    for line in &result.lines {
        let expected = line.unit_price.times(line.quantity).round_dp(2);
        assert_eq!(line.total_price, expected, "product {}", line.product_id);
    }
}

#[test]
fn zero_discount_keeps_list_price() {
    let mut snapshot = reference_snapshot();
    snapshot.lines.push(
        LineItem::new(9, Decimal::ONE, Money::new(dec("12.34")))
            .with_seller("s1")
            .with_hsn(inter_hsn(10)),
    );
    let result = recompute(&snapshot);

    let untiered = result
        .lines
        .iter()
        .find(|l| l.product_id.same_as(&Ident::Number(9)))
        .unwrap();
    assert!(untiered.applied_discount.is_zero());
    assert_eq!(untiered.unit_price, untiered.unit_list_price);
    assert!(!untiered.volume_discount_applied);
}

#[test]
fn compound_taxes_are_listed_last() {
    let snapshot = QuoteSnapshot {
        lines: vec![LineItem::new(1, Decimal::ONE, Money::from_major(100))],
        product_tax_details: vec![ProductTaxDetail {
            product_id: Ident::from("1"),
            hsn_details: Some(inter_hsn(18)),
        }],
        is_inter: false,
        ..Default::default()
    };
    let result = recompute(&snapshot);

    let names: Vec<&str> = result.lines[0]
        .intra_tax_breakup
        .iter()
        .map(|e| e.tax_name.as_str())
        .collect();
    assert_eq!(names, vec!["CGST", "SGST", "CESS"]);
    let first_compound = result.lines[0]
        .intra_tax_breakup
        .iter()
        .position(|e| e.compound)
        .unwrap();
    assert!(result.lines[0].intra_tax_breakup[first_compound..]
        .iter()
        .all(|e| e.compound));
}

#[test]
fn tax_exempt_quote_zeroes_every_rate() {
    let mut snapshot = reference_snapshot();
    snapshot.tax_exemption = true;
    snapshot.tax_rate_percent = pct(12);
    snapshot.lines.push(LineItem::new(5, Decimal::ONE, Money::from_major(10)).with_hsn(inter_hsn(28)));

    let result = recompute(&snapshot);
    for line in &result.lines {
        assert!(line.tax.is_zero());
        assert!(line.total_inter_tax.is_zero());
        assert!(line.total_intra_tax.is_zero());
        assert!(line.inter_tax_breakup.iter().all(|e| e.tax_percentage.is_zero()));
        assert_eq!(line.inter_tax_breakup[0].tax_name, "IGST");
    }
    assert!(result.summary.total_tax.is_zero());
    assert_eq!(result.vd_summary.map(|v| v.overall_tax), Some(Money::ZERO));
}

#[test]
fn grouping_keeps_every_line_once() {
    let lines: Vec<LineItem> = (1..=7)
        .map(|n| {
            let line = LineItem::new(n, Decimal::ONE, Money::from_major(n));
            match n % 3 {
                0 => line.with_seller("s1"),
                1 => LineItem {
                    vendor_id: Some(Ident::from("v1")),
                    ..line
                },
                _ => line,
            }
        })
        .collect();

    let groups = group(&lines);
    let count: u32 = groups.values().map(|g| g.item_count).sum();
    assert_eq!(count as usize, lines.len());

    let mut seen: Vec<String> = groups
        .values()
        .flat_map(|g| g.items.iter().map(|l| l.product_id.key()))
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), lines.len());
}

#[test]
fn payload_grand_total_follows_vd_flag() {
    let snapshot = reference_snapshot();
    let result = recompute(&snapshot);
    let form = result.form_values(&snapshot.form, &snapshot);
    let payload = assemble(&form, &snapshot.overview, None).unwrap();

    assert!(payload.vd_applied);
    assert_eq!(payload.totals.grand_total, result.vd_summary.unwrap().grand_total);
    assert_eq!(payload.totals.sub_total_with_vd, Some(Money::from_major(900)));

    let mut plain = reference_snapshot();
    plain.volume_discount_tiers.clear();
    let result = recompute(&plain);
    let form = result.form_values(&plain.form, &plain);
    let payload = assemble(&form, &plain.overview, None).unwrap();

    assert!(!payload.vd_applied);
    assert_eq!(payload.totals.grand_total, result.summary.grand_total);
    assert!(payload.totals.sub_total_with_vd.is_none());
}

#[test]
fn assembling_twice_gives_identical_bytes() {
    let mut snapshot = reference_snapshot();
    snapshot.overview = QuoteOverview {
        quotation_id: Some(77),
        quote_name: Some("  Spring order ".into()),
        ..Default::default()
    };
    snapshot.form = QuoteFormValues {
        comment: Some("rush".into()),
        ..Default::default()
    };

    assert_eq!(payload_json(&snapshot), payload_json(&snapshot));
}

#[test]
fn pricing_falls_back_to_no_seller_rows() {
    let mut table = BTreeMap::new();
    table.insert(
        "no-seller-id".to_string(),
        vec![PricingEntry {
            product_id: Ident::Number(1),
            base_price: Some(Money::from_major(95)),
            ..Default::default()
        }],
    );

    let snapshot = QuoteSnapshot {
        lines: vec![
            LineItem::new(1, Decimal::ONE, Money::from_major(100)).with_seller("s1"),
            LineItem::new(2, Decimal::ONE, Money::from_major(100)).with_seller("s1"),
        ],
        pricing_table: table,
        ..Default::default()
    };
    let report = recompute(&snapshot).pricing_report;

    let found = &report.resolved["1"];
    assert_eq!(found.source, PricingSource::NoSellerId);
    assert_eq!(found.price, Money::from_major(95));

    assert!(!report.resolved.contains_key("2"));
    assert_eq!(report.products_without_pricing.len(), 1);
    assert!(report.products_without_pricing[0].product_id.same_as(&Ident::Number(2)));
    assert!(report.ensure_orderable().is_err());
}

#[test]
fn empty_cart_prices_to_zero() {
    let snapshot = QuoteSnapshot::default();
    let result = recompute(&snapshot);

    assert_eq!(result.summary, Default::default());
    assert_eq!(overall_summary(&BTreeMap::new()), Default::default());
    assert!(result.vd_summary.is_none());

    let form = result.form_values(&snapshot.form, &snapshot);
    let payload = assemble(&form, &snapshot.overview, None).unwrap();
    assert!(payload.quotation_details.is_empty());
    assert!(payload.totals.grand_total.is_zero());
}

#[test]
fn json_snapshot_drives_the_whole_flow() {
    let text = r#"{
        "lines": [
            { "productId": "1", "askedQuantity": "10", "unitListPrice": 100, "sellerId": "s1",
              "hsnDetails": { "tax": 10, "interTax": { "totalTax": 10, "taxes": [] } } },
            { "productId": 2, "quantity": "abc", "unitListPrice": "5", "new": "true" }
        ],
        "isInter": true,
        "volumeDiscountTiers": { "s1": [{ "productId": 1, "appliedDiscount": 10 }] },
        "charges": { "s1": { "pfRateBase": 50 } },
        "overview": { "version": 3 }
    }"#;

    let snapshot = QuoteSnapshot::from_json_str(text).unwrap();
    assert_eq!(snapshot.lines.len(), 2);
    assert!(snapshot.lines[1].quantity.is_zero());

    let value: serde_json::Value = serde_json::from_str(&payload_json(&snapshot)).unwrap();
    assert_eq!(value["version"], 3);
    assert_eq!(value["VDapplied"], true);
    assert_eq!(value["subTotalWithVD"], 900.0);
    assert_eq!(value["grandTotal"], 1039.5);
    assert!(value["quotationDetails"][1]["lineNo"].is_null());
}
