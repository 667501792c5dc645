use super::*;
use crate::roll::table::{format_number, read_records_from, write_records_to};

fn tables() -> TaxTables {
    TaxTables::default()
}

fn pipeline() -> RollPipeline {
    RollPipeline::new(&tables()).expect("pipeline builds")
}

fn extractor() -> FieldExtractor {
    FieldExtractor::new(&tables()).expect("extractor builds")
}

#[test]
fn tokenizer_splits_around_the_parcel_identifier() {
    let tokenizer = LineTokenizer::new().expect("tokenizer builds");

    let tokenized = tokenizer
        .split("Malvikvegen 12, 1/23/4/0 3 718 000 70% 200000 2402600 1,9‰ 4565 Nei")
        .expect("property line");

    assert_eq!(tokenized.address, "Malvikvegen 12");
    assert_eq!(tokenized.parcel_id, "1/23/4/0");
    assert_eq!(
        tokenized.rest,
        "3 718 000 70% 200000 2402600 1,9‰ 4565 Nei"
    );
}

#[test]
fn tokenizer_skips_lines_without_a_parcel_identifier() {
    let tokenizer = LineTokenizer::new().expect("tokenizer builds");

    assert!(tokenizer.split("Side 3 av 120").is_none());
    assert!(tokenizer.split("Eiendomsskatteliste Malvik kommune 2025").is_none());
    assert!(tokenizer.split("").is_none());
}

#[test]
fn tokenizer_splits_at_the_first_parcel_shaped_token() {
    let tokenizer = LineTokenizer::new().expect("tokenizer builds");

    // An address containing a parcel-shaped sequence mis-splits there; the
    // layout convention assumes identifiers never appear in addresses.
    let tokenized = tokenizer
        .split("Felt 1/2/3/4 vest, 10/20/30/40 900 000 70% 0 630000 1,9‰ 1197 Nei")
        .expect("property line");

    assert_eq!(tokenized.address, "Felt");
    assert_eq!(tokenized.parcel_id, "1/2/3/4");
}

#[test]
fn extractor_populates_every_field_on_a_well_formed_line() {
    let extraction = extractor().extract("3 718 000 70% 200000 2402600 1,9‰ 4565 Nei");

    let Extraction::Complete(fields) = extraction else {
        panic!("expected complete extraction");
    };
    assert_eq!(fields.assessed_value, "3 718 000");
    assert_eq!(fields.tax_level_pct, "70");
    assert_eq!(fields.deduction, "200000");
    assert_eq!(fields.tax_base, "2402600");
    assert_eq!(fields.rate_per_mille, "1,9‰");
    assert_eq!(fields.tax_due, "4565");
    assert_eq!(fields.exemption, "Nei");
}

#[test]
fn extractor_matches_known_deduction_split_by_column_justification() {
    let extraction = extractor().extract("2 500 000 70% 200 000 1550000 1,9‰ 2945 Nei");

    let Extraction::Complete(fields) = extraction else {
        panic!("expected complete extraction");
    };
    assert_eq!(fields.deduction, "200000");
    assert_eq!(fields.tax_base, "1550000");
}

#[test]
fn extractor_accepts_a_zero_deduction() {
    let extraction = extractor().extract("2 079 000 70% 0 1455300 2,5‰ 3638 Nei");

    let Extraction::Complete(fields) = extraction else {
        panic!("expected complete extraction");
    };
    assert_eq!(fields.deduction, "0");
    assert_eq!(fields.tax_base, "1455300");
    assert_eq!(fields.rate_per_mille, "2,5‰");
}

#[test]
fn extractor_reports_missing_tax_level() {
    let extraction = extractor().extract("ukjent takst, ingen sats");

    let Extraction::Partial { fields, category } = extraction else {
        panic!("expected partial extraction");
    };
    assert_eq!(category, IssueCategory::NoTaxLevel);
    assert_eq!(fields, RawFields::default());
}

#[test]
fn extractor_reports_missing_rate_after_known_deduction() {
    let extraction = extractor().extract("2 100 000 70% 200000 1270000 4565 Nei");

    let Extraction::Partial { fields, category } = extraction else {
        panic!("expected partial extraction");
    };
    assert_eq!(category, IssueCategory::NoRateAfterDeduction);
    assert_eq!(fields.assessed_value, "2 100 000");
    assert_eq!(fields.tax_level_pct, "70");
    assert_eq!(fields.deduction, "200000");
    assert_eq!(fields.tax_base, "");
    assert_eq!(fields.tax_due, "");
}

#[test]
fn positional_fallback_takes_the_first_three_digit_runs() {
    // No configured deduction value occurs in this tail (no zeros at all),
    // so the positional fallback runs. Digit runs merge across single
    // spaces, and the rate is found by its own token independent of the
    // positional scan.
    let extraction = extractor().extract("955 111 70% 151515 515151 2,5‰ 1288 Nei");

    let Extraction::Complete(fields) = extraction else {
        panic!("expected complete extraction");
    };
    assert_eq!(fields.deduction, "151515 515151");
    assert_eq!(fields.tax_base, "2");
    assert_eq!(fields.tax_due, "5");
    assert_eq!(fields.rate_per_mille, "2,5‰");
}

#[test]
fn extractor_reports_too_few_amounts_in_the_tail() {
    let extraction = extractor().extract("fritatt 70% fritatt eigedom");

    let Extraction::Partial { category, .. } = extraction else {
        panic!("expected partial extraction");
    };
    assert_eq!(category, IssueCategory::TooFewAmounts);
}

#[test]
fn normalize_amount_strips_spaces_and_maps_decimal_comma() {
    assert_eq!(normalize_amount("3 718 000").value, 3_718_000.0);
    assert_eq!(normalize_amount("1 234,56").value, 1_234.56);
    assert_eq!(normalize_amount("4940,").value, 4_940.0);
}

#[test]
fn normalize_amount_defaults_unusable_text_to_zero() {
    let unusable = normalize_amount("ukjent");
    assert_eq!(unusable.value, 0.0);
    assert!(unusable.defaulted);

    let empty = normalize_amount("");
    assert_eq!(empty.value, 0.0);
    assert!(!empty.defaulted);
}

#[test]
fn normalize_amount_round_trips_to_two_decimals() {
    let cases = [
        ("1 234,56", "1234.56"),
        ("200000", "200000.00"),
        ("4,9", "4.90"),
    ];

    for (raw, expected) in cases {
        let normalized = normalize_amount(raw);
        assert_eq!(format!("{:.2}", normalized.value), expected);
    }
}

#[test]
fn normalize_rate_strips_the_per_mille_sign() {
    assert_eq!(normalize_rate("1,9‰").value, 1.9);
    assert_eq!(normalize_rate("4‰").value, 4.0);
    assert_eq!(normalize_rate("2.5 ‰").value, 2.5);
}

#[test]
fn normalize_exemption_lowercases_and_trims() {
    assert_eq!(normalize_exemption(" Nei "), "nei");
    assert_eq!(normalize_exemption("Delvis Fritak"), "delvis fritak");
}

#[test]
fn parse_roll_emits_records_and_skips_noise_lines() {
    let lines = [
        "Eiendomsskatteliste Malvik kommune 2025",
        "Malvikvegen 12, 1/23/4/0 3 718 000 70% 200000 2402600 1,9‰ 4565 Nei",
        "Side 1 av 120",
        "Naustvegen 8, 3/4/5/6 2 079 000 70% 0 1455300 2,5‰ 3638 Nei",
    ];

    let parsed = pipeline().parse_roll(lines);

    assert_eq!(parsed.counts.lines_seen, 4);
    assert_eq!(parsed.counts.lines_without_parcel_id, 2);
    assert_eq!(parsed.counts.records_emitted, 2);
    assert_eq!(parsed.counts.complete_records, 2);
    assert_eq!(parsed.counts.partial_records, 0);
    assert!(parsed.issues.is_empty());

    let first = &parsed.records[0];
    assert_eq!(first.address, "Malvikvegen 12");
    assert_eq!(first.parcel_id, "1/23/4/0");
    assert_eq!(first.assessed_value, 3_718_000.0);
    assert_eq!(first.tax_level_pct, 70.0);
    assert_eq!(first.deduction, 200_000.0);
    assert_eq!(first.tax_base, 2_402_600.0);
    assert_eq!(first.rate_per_mille, 1.9);
    assert_eq!(first.tax_due, 4_565.0);
    assert_eq!(first.exemption, "nei");
}

#[test]
fn parse_roll_retains_failed_lines_as_empty_records() {
    let lines = ["Granholtvegen 4, 11/22/33/44 takst manglar"];

    let parsed = pipeline().parse_roll(lines);

    assert_eq!(parsed.counts.records_emitted, 1);
    assert_eq!(parsed.counts.partial_records, 1);
    assert_eq!(parsed.counts.no_tax_level_count, 1);
    assert_eq!(parsed.issues.len(), 1);
    assert_eq!(parsed.issues[0].category, IssueCategory::NoTaxLevel);

    let record = &parsed.records[0];
    assert_eq!(record.address, "Granholtvegen 4");
    assert_eq!(record.parcel_id, "11/22/33/44");
    assert_eq!(record.assessed_value, 0.0);
    assert_eq!(record.tax_due, 0.0);
    assert_eq!(record.exemption, "");
}

#[test]
fn parse_roll_counts_coerced_fields() {
    // The deduction matches and the rate token follows, but the tax-base
    // column holds unusable residue rather than a number.
    let lines = ["Lia 9, 5/6/7/8 1 000 000 70% 200000 — 1,9‰ 488 Nei"];

    let parsed = pipeline().parse_roll(lines);

    assert_eq!(parsed.counts.records_emitted, 1);
    assert_eq!(parsed.counts.complete_records, 1);
    assert_eq!(parsed.records[0].tax_base, 0.0);
    assert_eq!(parsed.records[0].tax_due, 488.0);
    assert_eq!(parsed.counts.coerced_field_count, 1);
}

#[test]
fn table_round_trips_clean_rows() {
    let parsed = pipeline().parse_roll([
        "Malvikvegen 12, 1/23/4/0 3 718 000 70% 200000 2402600 1,9‰ 4565 Nei",
        "Naustvegen 8, 3/4/5/6 2 079 000 70% 0 1455300 2,5‰ 3638 Nei",
    ]);

    let mut buffer = Vec::new();
    write_records_to(&mut buffer, &parsed.records).expect("write succeeds");
    let read_back = read_records_from(buffer.as_slice()).expect("read succeeds");

    assert_eq!(read_back, parsed.records);
}

#[test]
fn table_rejects_a_header_with_the_wrong_column_count() {
    let data = "address,parcel_id,assessed_value\nA,1/2/3/4,100";

    assert!(read_records_from(data.as_bytes()).is_err());
}

#[test]
fn format_number_prints_whole_units_without_decimals() {
    assert_eq!(format_number(2_600_000.0), "2600000");
    assert_eq!(format_number(1.9), "1.9");
    assert_eq!(format_number(0.0), "0");
}
