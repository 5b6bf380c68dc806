//! A registry is built once and shared read-only between decoders

use std::io::{BufReader, Cursor};
use std::sync::Arc;
use std::thread;

use s100gml::profiles::s125_registry;
use s100gml::{DecodeOptions, Decoder, Document, Encoder, Error, Limits};

const DATASET: &str = include_str!("fixtures/s125_dataset.xml");

#[test]
fn test_shared_registry_across_threads() {
    let registry = Arc::new(s125_registry().unwrap());
    let expected = Decoder::new(&registry).decode_str(DATASET).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || -> Document {
                let document = Decoder::new(&registry).decode_str(DATASET).unwrap();
                if i % 2 == 0 {
                    let encoded = Encoder::new(&registry).encode(&document).unwrap();
                    return Decoder::new(&registry).decode_str(&encoded).unwrap();
                }
                document
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_decode_from_reader() {
    let registry = s125_registry().unwrap();
    let reader = BufReader::new(Cursor::new(DATASET.as_bytes().to_vec()));
    let document = Decoder::new(&registry).decode(reader).unwrap();
    assert_eq!(document, Decoder::new(&registry).decode_str(DATASET).unwrap());
}

#[test]
fn test_limits_are_enforced() {
    let registry = s125_registry().unwrap();
    let decode = |limits: Limits| {
        Decoder::new(&registry)
            .with_options(DecodeOptions::new().with_limits(limits))
            .decode_str(DATASET)
    };

    assert!(decode(Limits::default()).is_ok());
    for limits in [
        Limits { max_xml_size: 1024, ..Limits::default() },
        Limits { max_xml_depth: 3, ..Limits::default() },
        Limits { max_attributes: 2, ..Limits::default() },
        Limits { max_instances: 4, ..Limits::default() },
    ] {
        assert!(matches!(decode(limits), Err(Error::LimitExceeded(_))));
    }
}
