//! End-to-end tests: parse and encode against compiled specs, incremental
//! resume, stop handling, and the round-trip law.

use binspec::{
    compile, Data, EncodeError, Encoder, Endianness, Incomplete, IntSpec, IntWidth, Parser, Spec,
    AUTO,
};
use std::collections::HashMap;

fn hex(s: &str) -> Vec<u8> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    assert!(compact.len() % 2 == 0, "odd hex string: {s}");
    (0..compact.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&compact[i..i + 2], 16).expect("hex digit"))
        .collect()
}

fn parse_one(format: &str, input: &[u8]) -> Data {
    let spec = compile(format).expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(input.to_vec());
    parser.next().expect("complete parse")
}

fn ints(values: &[u64]) -> Data {
    Data::Seq(values.iter().map(|v| Data::Integer(*v)).collect())
}

// ==================== Parse scenarios ====================

#[test]
fn big_endian_tower() {
    let data = parse_one(">BHIQ", &hex("12 1234 12345678 123456789ABCDEF0"));
    assert_eq!(
        data,
        ints(&[0x12, 0x1234, 0x1234_5678, 0x1234_5678_9abc_def0])
    );
}

#[test]
fn length_prefixed_bytes() {
    let data = parse_one("<%Is", &hex("04000000 ABCDEFFF"));
    assert_eq!(
        data,
        Data::Seq(vec![Data::Integer(4), Data::from(hex("ABCDEFFF"))])
    );
}

#[test]
fn until_with_fixed_budget_swallows_residue() {
    let spec = compile("<%B(I)").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("0D 12345578 0000314A A893A385 92 1BC359"));
    let data = parser.next().expect("complete");
    assert_eq!(
        data,
        Data::Seq(vec![
            Data::Integer(13),
            ints(&[0x7855_3412, 0x4a31_0000, 0x85a3_93a8]),
        ])
    );
    // The 13th budget byte (0x92) was swallowed; the tail is untouched.
    assert_eq!(parser.remaining().to_vec(), hex("1BC359"));
}

#[test]
fn switch_dispatches_on_tag() {
    let spec = compile("<%B{0=B,1=H,2=I,3=Q,*=H}").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("01 3456"));
    parser.supply(hex("02 22990000"));
    parser.supply(hex("00 03"));
    parser.supply(hex("03 1122334455667788"));
    parser.supply(hex("62 6D39"));
    let records = parser.parse_all();
    assert_eq!(
        records,
        vec![
            ints(&[1, 0x5634]),
            ints(&[2, 0x9922]),
            ints(&[0, 0x03]),
            ints(&[3, 0x8877_6655_4433_2211]),
            ints(&[0x62, 0x396d]),
        ]
    );
    assert!(parser.remaining().is_empty());
}

#[test]
fn nested_unbounded_until_is_budget_bounded() {
    let spec = compile("<%B(I*(B))").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("09 11223344 9091929394 55667788"));
    let data = parser.next().expect("complete");
    assert_eq!(
        data,
        Data::Seq(vec![
            Data::Integer(9),
            Data::Seq(vec![Data::Seq(vec![
                Data::Integer(0x4433_2211),
                ints(&[0x90, 0x91, 0x92, 0x93, 0x94]),
            ])]),
        ])
    );
    assert_eq!(parser.remaining().to_vec(), hex("55667788"));
}

#[test]
fn unbounded_bytes_take_everything_supplied() {
    let data = parse_one("*s", b"anything at all");
    assert_eq!(data, Data::from(&b"anything at all"[..]));
}

#[test]
fn seed_variables_survive_reset() {
    let spec = Spec::bytes(Some("len"));
    let mut vars = HashMap::new();
    vars.insert("len".to_owned(), 3);
    let mut parser = Parser::with_vars(spec, vars);
    parser.supply(&b"abcdef"[..]);
    assert_eq!(parser.next().expect("first"), Data::from("abc"));
    parser.reset();
    assert_eq!(parser.next().expect("second"), Data::from("def"));
}

#[test]
fn data_accessors_and_conversions() {
    let data = parse_one("<%Is", &hex("02000000 4142"));
    let items = data.as_seq().expect("seq");
    assert_eq!(items[0].as_int(), Some(2));
    assert_eq!(items[1].as_bytes().expect("bytes").to_vec(), b"AB");
    assert!(!data.is_stop());
    // Signed conversions keep the source width's bit pattern.
    assert_eq!(Data::from(-1i16), Data::Integer(0xffff));
    assert_eq!(Data::from(-1i64), Data::Integer(u64::MAX));
    assert_eq!(Data::from(7u8), Data::Integer(7));
}

#[test]
fn repeat_parses_exact_count() {
    let spec = Spec::Seq(vec![
        Spec::variable(IntSpec::new(IntWidth::One, Endianness::Big), "n", 0),
        Spec::repeat("n", Spec::Integer(IntSpec::new(IntWidth::Two, Endianness::Big))),
    ]);
    let mut parser = Parser::new(spec);
    parser.supply(hex("03 0001 0002 0003"));
    assert_eq!(
        parser.next().expect("complete"),
        Data::Seq(vec![Data::Integer(3), ints(&[1, 2, 3])])
    );
}

// ==================== Incremental behavior ====================

#[test]
fn split_point_does_not_change_the_result() {
    let spec = compile("<%B(I)").expect("compile");
    let input = hex("0D 12345578 0000314A A893A385 92 1BC359");
    let full = {
        let mut parser = Parser::new(spec.clone());
        parser.supply(input.clone());
        parser.next().expect("complete")
    };
    for cut in 0..=input.len() {
        let mut parser = Parser::new(spec.clone());
        parser.supply(input[..cut].to_vec());
        let early = parser.next();
        parser.supply(input[cut..].to_vec());
        let late = parser.next().unwrap_or_else(|_| panic!("cut at {cut}"));
        assert_eq!(late, full, "cut at {cut}");
        if let Ok(early) = early {
            assert_eq!(early, late, "early result at cut {cut}");
        }
    }
}

#[test]
fn incomplete_reports_shrinking_deficit() {
    let spec = compile(">Q").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("0102"));
    assert_eq!(parser.next(), Err(Incomplete(6)));
    parser.supply(hex("03"));
    assert_eq!(parser.next(), Err(Incomplete(5)));
    parser.supply(hex("0405060708"));
    assert_eq!(parser.next(), Ok(Data::Integer(0x0102_0304_0506_0708)));
}

#[test]
fn deficit_is_for_the_innermost_step() {
    let spec = compile("<%Is").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("05000000 AA"));
    // The length field parsed; the payload needs 4 of its 5 bytes.
    assert_eq!(parser.next(), Err(Incomplete(4)));
    parser.supply(hex("BBCCDDEE"));
    assert_eq!(
        parser.next().expect("complete"),
        Data::Seq(vec![Data::Integer(5), Data::from(hex("AABBCCDDEE"))])
    );
}

#[test]
fn completed_parse_is_cached_until_reset() {
    let spec = compile(">H").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("1234 5678"));
    assert_eq!(parser.next(), Ok(Data::Integer(0x1234)));
    assert_eq!(parser.next(), Ok(Data::Integer(0x1234)));
    parser.reset();
    assert_eq!(parser.next(), Ok(Data::Integer(0x5678)));
}

#[test]
fn parse_all_caps_zero_byte_rounds() {
    let spec = compile("2x").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("00000000"));
    assert_eq!(parser.parse_all(), vec![Data::Empty, Data::Empty]);

    let mut parser = Parser::new(Spec::Skip(0));
    assert_eq!(parser.parse_all(), vec![Data::Empty]);
}

// ==================== Stop semantics ====================

#[test]
fn unknown_tag_outside_until_halts_the_parse() {
    let spec = compile("<%B{0=B}").expect("compile");
    let mut parser = Parser::new(spec);
    parser.supply(hex("07 AABB"));
    let stop = parser.next().expect("stop is a value, not an error");
    match &stop {
        Data::Stop(spec, selector) => {
            assert!(matches!(**spec, Spec::Switch { .. }));
            assert_eq!(*selector, 7);
        }
        other => panic!("expected stop, got {other:?}"),
    }
    // Cached until reset, and never appended by parse_all.
    assert_eq!(parser.next().expect("cached"), stop);
    assert_eq!(parser.parse_all(), Vec::<Data>::new());
}

#[test]
fn until_swallows_stop_and_parsing_continues() {
    let spec = compile("<%B(%B{1=B})H").expect("compile");
    let mut parser = Parser::new(spec);
    // Budget of 5: two good records, then tag 7 stops the sub-parse and the
    // stop record's consumed byte exhausts the budget.
    parser.supply(hex("05 01AA 01BB 07 3412"));
    let data = parser.next().expect("complete");
    assert_eq!(
        data,
        Data::Seq(vec![
            Data::Integer(5),
            Data::Seq(vec![ints(&[1, 0xaa]), ints(&[1, 0xbb])]),
            Data::Integer(0x1234),
        ])
    );
    assert!(parser.remaining().is_empty());
}

#[test]
fn bare_stop_surfaces_from_inside_a_seq() {
    let spec = Spec::Seq(vec![
        Spec::Integer(IntSpec::new(IntWidth::One, Endianness::Big)),
        Spec::Stop,
    ]);
    let mut parser = Parser::new(spec);
    parser.supply(hex("AA BB"));
    let data = parser.next().expect("stop value");
    assert_eq!(data, Data::Stop(Box::new(Spec::Stop), 0));
}

// ==================== Encoding ====================

#[test]
fn auto_sized_encode_back_patches_lengths() {
    let spec = compile("<%-6I%+10Is(H)").expect("compile");
    let data = Data::Seq(vec![
        Data::Integer(AUTO),
        Data::Integer(AUTO),
        Data::from(&b"DEFGH"[..]),
        ints(&[1, 2, 3, 4, 5, 6]),
    ]);
    let encoded = Encoder::new(spec.clone()).encode(&data).expect("encode");
    // 11 = payload length 5 minus offset -6; 2 = budget 12 minus offset +10.
    assert_eq!(
        encoded,
        hex("0B000000 02000000 4445464748 010002000300040005000600")
    );

    // Round-trip: parsing the encoding yields the tree with AUTO resolved.
    let mut parser = Parser::new(spec);
    parser.supply(encoded);
    assert_eq!(
        parser.next().expect("complete"),
        Data::Seq(vec![
            Data::Integer(5),
            Data::Integer(12),
            Data::from(&b"DEFGH"[..]),
            ints(&[1, 2, 3, 4, 5, 6]),
        ])
    );
}

#[test]
fn round_trip_length_prefixed_records() {
    let spec = compile("<%I(%Bs)").expect("compile");
    let data = Data::Seq(vec![
        Data::Integer(AUTO),
        Data::Seq(vec![
            Data::Seq(vec![Data::Integer(3), Data::from("abc")]),
            Data::Seq(vec![Data::Integer(2), Data::from("xy")]),
        ]),
    ]);
    let encoded = Encoder::new(spec.clone()).encode(&data).expect("encode");
    assert_eq!(encoded, hex("07000000 03 616263 02 7879"));

    let mut parser = Parser::new(spec);
    parser.supply(encoded);
    let parsed = parser.next().expect("complete");
    assert_eq!(
        parsed,
        Data::Seq(vec![
            Data::Integer(7),
            Data::Seq(vec![
                Data::Seq(vec![Data::Integer(3), Data::from("abc")]),
                Data::Seq(vec![Data::Integer(2), Data::from("xy")]),
            ]),
        ])
    );
}

#[test]
fn repeat_count_is_auto_patched() {
    let spec = Spec::Seq(vec![
        Spec::variable(IntSpec::new(IntWidth::One, Endianness::Big), "n", 0),
        Spec::repeat("n", Spec::Integer(IntSpec::new(IntWidth::Two, Endianness::Big))),
    ]);
    let data = Data::Seq(vec![Data::Integer(AUTO), ints(&[10, 20])]);
    let encoded = Encoder::new(spec).encode(&data).expect("encode");
    assert_eq!(encoded, hex("02 000A 0014"));
}

#[test]
fn fixed_budget_until_pads_and_truncates() {
    let spec = compile("<%B(H)").expect("compile");
    let padded = Encoder::new(spec.clone())
        .encode(&Data::Seq(vec![Data::Integer(6), ints(&[1, 2])]))
        .expect("encode");
    assert_eq!(padded, hex("06 0100 0200 0000"));

    let truncated = Encoder::new(spec)
        .encode(&Data::Seq(vec![Data::Integer(3), ints(&[1, 2])]))
        .expect("encode");
    assert_eq!(truncated, hex("03 0100 02"));
}

#[test]
fn switch_encodes_the_selected_case() {
    let spec = compile("<%B{0=B,1=H,*=I}").expect("compile");
    let encoder = Encoder::new(spec);
    assert_eq!(
        encoder.encode(&ints(&[1, 0x5634])).expect("encode"),
        hex("01 3456")
    );
    assert_eq!(
        encoder.encode(&ints(&[9, 0x1122_3344])).expect("encode"),
        hex("09 44332211")
    );
}

#[test]
fn skip_encodes_zeroes() {
    let spec = compile("2xB").expect("compile");
    let encoded = Encoder::new(spec)
        .encode(&Data::Seq(vec![Data::Empty, Data::Integer(0xaa)]))
        .expect("encode");
    assert_eq!(encoded, hex("0000 AA"));
}

// ==================== Encoding failure modes ====================

#[test]
fn encode_shape_mismatch_fails() {
    let spec = compile(">H").expect("compile");
    let err = Encoder::new(spec).encode(&Data::from("oops")).unwrap_err();
    assert!(matches!(err, EncodeError::ShapeMismatch { .. }));
}

#[test]
fn encode_seq_length_mismatch_fails() {
    let spec = compile(">BB").expect("compile");
    let err = Encoder::new(spec).encode(&ints(&[1])).unwrap_err();
    assert!(matches!(
        err,
        EncodeError::SeqLength {
            expected: 2,
            actual: 1
        }
    ));
}

#[test]
fn encode_declared_length_disagreement_fails() {
    let spec = compile("<%Is").expect("compile");
    let err = Encoder::new(spec)
        .encode(&Data::Seq(vec![Data::Integer(3), Data::from("abcd")]))
        .unwrap_err();
    assert!(matches!(err, EncodeError::ValueMismatch { .. }));
}

#[test]
fn encode_undeclared_variable_fails() {
    let spec = Spec::bytes(Some("nope"));
    let err = Encoder::new(spec).encode(&Data::from("x")).unwrap_err();
    assert!(matches!(err, EncodeError::Undeclared(_)));
}

#[test]
fn encode_stop_default_fails() {
    let spec = compile("<%B{0=B}").expect("compile");
    let err = Encoder::new(spec).encode(&ints(&[9, 1])).unwrap_err();
    assert!(matches!(err, EncodeError::Halted));
}

#[test]
fn auto_cannot_resolve_across_an_until_scope() {
    let spec = Spec::Seq(vec![
        Spec::variable(IntSpec::new(IntWidth::One, Endianness::Big), "L", 0),
        Spec::until(None, Spec::bytes(Some("L"))),
    ]);
    let data = Data::Seq(vec![
        Data::Integer(AUTO),
        Data::Seq(vec![Data::from("abc")]),
    ]);
    let err = Encoder::new(spec).encode(&data).unwrap_err();
    assert!(matches!(err, EncodeError::AutoOutOfScope(_)));
}
