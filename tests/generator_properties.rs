//! Generator behavior through the public API

use camo_prefix::generator::{Builtins, Generator, parse};
use camo_prefix::{FaultKind, RandomSource};

fn print_builtins() -> Builtins {
    Builtins::new()
        .with("printB", |_, _| Ok(vec![b'B']))
        .with("printC", |_, _| Ok(vec![b'C']))
        .with("printBinaryFF", |_, _| Ok(vec![0xff]))
        .with("returnError", |_, _| Err("returnError always fails".to_string()))
}

fn generate_with(text: &str, builtins: &Builtins) -> camo_prefix::Result<Vec<u8>> {
    let generator = Generator::with_builtins(text, builtins, RandomSource::from_seed(7))?;
    Ok(generator.generate()?.to_vec())
}

#[test]
fn test_literal_programs_repeat() {
    let programs = [
        ("v1.0 ", ""),
        ("v1.0 abc", "abc"),
        ("v1.0 cost: $5", "cost: $5"),
        ("v1.0 GET / HTTP/1.1\r\n\r\n", "GET / HTTP/1.1\r\n\r\n"),
    ];
    for (text, expected) in programs {
        let generator = Generator::new(text).unwrap();
        assert!(generator.program().is_static(), "{}", text);
        for _ in 0..5 {
            assert_eq!(&generator.generate().unwrap()[..], expected.as_bytes(), "{}", text);
        }
    }
}

#[test]
fn test_builtin_output_is_spliced_in_order() {
    let builtins = print_builtins();
    assert_eq!(generate_with("v1.0 $printB()$printC()", &builtins).unwrap(), b"BC");
    assert_eq!(generate_with("v1.0 a$printB()b$printC()c", &builtins).unwrap(), b"aBbCc");
    assert_eq!(
        generate_with("v1.0 \n$printB()\n$printBinaryFF()\r\n", &builtins).unwrap(),
        vec![b'\n', b'B', b'\n', 0xff, b'\r', b'\n']
    );
}

#[test]
fn test_random_bytes_length_bounds() {
    let generator = Generator::new("v1.0 $random_bytes(4, 12)").unwrap();
    let mut lengths = std::collections::HashSet::new();
    for _ in 0..500 {
        let prefix = generator.generate().unwrap();
        assert!((4..=12).contains(&prefix.len()));
        lengths.insert(prefix.len());
    }
    assert!(lengths.len() > 1);
}

#[test]
fn test_seeded_generators_agree() {
    let text = "v1.0 GET /$random_string(8, 16) HTTP/1.1";
    let a = Generator::with_builtins(text, Builtins::standard(), RandomSource::from_seed(42)).unwrap();
    let b = Generator::with_builtins(text, Builtins::standard(), RandomSource::from_seed(42)).unwrap();
    for _ in 0..10 {
        assert_eq!(a.generate().unwrap(), b.generate().unwrap());
    }
}

#[test]
fn test_parse_rejects() {
    let builtins = print_builtins();
    let rejects = [
        "",
        "abc",
        "v1.0",
        "v2.0 abc",
        "vx.0 abc",
        "v1.0 $unknown()",
        "v1.0 $printB(",
        "v1.0 $printB($printC())",
    ];
    for text in rejects {
        let err = parse(text, &builtins).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Parse, "{:?}", text);
    }
}

#[test]
fn test_runtime_fault_yields_nothing() {
    let builtins = print_builtins();
    let err = generate_with("v1.0 $printB()$returnError()$printC()", &builtins).unwrap_err();
    assert_eq!(err.kind(), FaultKind::Runtime);
    assert!(err.to_string().contains("returnError"));

    let err = Generator::new("v1.0 $random_bytes(9, 2)")
        .unwrap()
        .generate()
        .unwrap_err();
    assert_eq!(err.kind(), FaultKind::Runtime);
}
