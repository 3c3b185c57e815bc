#![cfg(all(feature = "std", target_endian = "little"))]

use std::path::Path;

use bluefile::{
    avec::{self, Error, FileKind, Options, ReadSource},
    sans::{
        extended::{KeywordForm, Keywords, Value},
        format::Scalar,
        header::Adjunct,
        view::{DataView, Indexed, ViewError},
    },
};
use csv::ReaderBuilder;

#[test]
fn decode_cosine() {
    const PATH: &str = "fixtures/sin.tmp";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    let header = d.header();
    assert_eq!(header.kind, FileKind::Bluefile);
    assert_eq!(header.version, "BLUE");
    assert!(header.head_little_endian && header.data_little_endian);
    assert_eq!(header.format.to_string(), "SD");
    assert_eq!(header.type_code, 1000);
    assert_eq!((header.data_start, header.data_size), (512, 32768));
    assert_eq!((header.ext_start, header.ext_size), (65, 128));
    assert_eq!(d.element_count(), 4096);
    assert_eq!(d.data().value(0), Some(Scalar::F64(1.0)));
    assert_eq!(d.unix_time(), 1.7e9);
    assert_eq!(d.x_at(1000), Some(1.0));
    assert_eq!(d.x_units(), Some(("Time", "sec")));

    assert_eq!(
        header.keywords.get("IO"),
        Some(&Value::Text("X-Midas".into()))
    );

    let ext = header.ext_header.as_ref().unwrap();
    assert_eq!(ext.len(), 5);
    assert_eq!(ext.get("RF_FREQ"), Some(&Value::Scalar(Scalar::F64(1.5e9))));
    assert_eq!(ext.get("GAIN"), Some(&Value::Scalar(Scalar::I32(3))));
    assert_eq!(
        ext.get("COMMENT2"),
        Some(&Value::Text("Second comment".into()))
    );
    assert_eq!(
        ext.get("TAPS"),
        Some(&Value::Sequence(
            [0.25, 0.5, 0.25].map(Scalar::F32).to_vec()
        ))
    );

    Validator::new(PATH).validate(d.data());
}

#[test]
fn decode_complex_floats() {
    const PATH: &str = "fixtures/pulse.tmp";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    assert_eq!(d.header().data_size, 1600);
    assert_eq!(d.element_count(), 200);
    assert_eq!(d.layout().bytes_per_element(), 8.0);
    assert_eq!(d.x_at(4), Some(12.0));
    assert_eq!(d.header().ext_header, None);

    Validator::new(PATH).validate(d.data());
}

#[test]
fn decode_bits() {
    const PATH: &str = "fixtures/bits.tmp";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    assert_eq!(d.element_count(), 8192);
    assert_eq!(d.layout().bytes_per_element(), 0.125);

    Validator::new(PATH).validate(d.data());
}

#[test]
fn decode_frames() {
    const PATH: &str = "fixtures/raster.tmp";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    assert_eq!(d.class(), 2);
    assert_eq!(d.element_count(), 8);
    assert_eq!(d.data().scalars_per_element(), 16);
    assert_eq!(d.y_at(4), Some(12.0));
    assert_eq!(d.x_at(3), Some(6.0));
    assert_eq!(d.y_units(), Some(("Time", "sec")));
    assert!(matches!(
        d.header().adjunct,
        Adjunct::TwoDimensional { subsize: 16, .. }
    ));

    Validator::new(PATH).validate(d.data());
}

#[test]
fn decode_keywords_as_mapping() {
    let data = std::fs::read("fixtures/keywords.tmp").unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();
    let ext = d.header().ext_header.as_ref().unwrap();

    // 100 text records, three repeats collapsed into distinct keys, two
    // numeric records, and one skipped record.
    assert_eq!(ext.len(), 105);
    for n in 0..100 {
        assert_eq!(
            ext.get(&format!("TAG_{n:03}")),
            Some(&Value::Text(format!("value {n}  "))),
            "TAG_{n:03}"
        );
    }
    assert_eq!(ext.get("B_TEST"), Some(&Value::Scalar(Scalar::I16(-1))));
    assert_eq!(ext.get("B_TEST2"), Some(&Value::Scalar(Scalar::I16(2))));
    assert_eq!(ext.get("B_TEST3"), Some(&Value::Scalar(Scalar::I16(3))));
    assert_eq!(
        ext.get("SEQ"),
        Some(&Value::Sequence([1, 2, 3, 4].map(Scalar::I32).to_vec()))
    );
    assert_eq!(ext.get("BIG"), Some(&Value::Scalar(Scalar::I64(1 << 40))));
    assert_eq!(ext.get("ODD"), None);
}

#[test]
fn decode_keywords_as_list() {
    let data = std::fs::read("fixtures/keywords.tmp").unwrap();
    let o = Options::new("list".parse().unwrap());
    let d = avec::decode(&data, &o).unwrap();

    let Some(Keywords::List(list)) = &d.header().ext_header else {
        panic!("expected a list of keywords");
    };

    assert_eq!(list.len(), 105);
    assert_eq!(list[0].tag, "TAG_000");
    assert_eq!(list[99].tag, "TAG_099");

    let repeats: Vec<_> = list
        .iter()
        .filter(|k| k.tag == "B_TEST")
        .map(|k| k.value.clone())
        .collect();
    assert_eq!(repeats, [-1, 2, 3].map(|x| Value::Scalar(Scalar::I16(x))));
}

#[test]
fn list_and_mapping_agree() {
    let data = std::fs::read("fixtures/keywords.tmp").unwrap();

    let d = avec::decode(&data, &Options::new(KeywordForm::List)).unwrap();
    let Some(Keywords::List(list)) = d.header().ext_header.clone() else {
        panic!("expected a list of keywords");
    };

    let d = avec::decode(&data, &Options::new(KeywordForm::Mapping)).unwrap();
    let mapping = d.header().ext_header.clone().unwrap();

    assert_eq!(Keywords::collect(KeywordForm::Mapping, list), mapping);
}

#[test]
fn decode_big_endian_bytes() {
    const PATH: &str = "fixtures/big_endian.tmp";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    let header = d.header();
    assert!(!header.head_little_endian && !header.data_little_endian);
    assert_eq!(header.data_size, 64);
    assert_eq!(header.timecode, 1.0e9);
    assert_eq!(d.x_at(2), Some(5.5));

    let ext = header.ext_header.as_ref().unwrap();
    assert_eq!(ext.get("GAIN"), Some(&Value::Scalar(Scalar::I32(7))));
    assert_eq!(ext.get("NAME"), Some(&Value::Text("be".into())));

    Validator::new(PATH).validate(d.data());
}

#[test]
fn refuse_big_endian_doubles() {
    let data = std::fs::read("fixtures/big_endian_double.tmp").unwrap();
    assert_eq!(
        avec::decode(&data, &Options::default()).unwrap_err(),
        Error::UnsupportedView(ViewError::UnsupportedEndianness {
            width: 8,
            data_little_endian: false
        })
    );
}

#[test]
fn decode_mat_vector() {
    const PATH: &str = "fixtures/ramp.mat";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    assert_eq!(d.header().kind, FileKind::MatFile);
    assert_eq!(d.header().type_code, 1000);
    assert_eq!(d.element_count(), 100);
    assert_eq!(
        d.header().keywords.get("NAME"),
        Some(&Value::Text("ramp".into()))
    );

    Validator::new(PATH).validate(d.data());
}

#[test]
fn decode_mat_matrix() {
    const PATH: &str = "fixtures/grid.mat";
    let data = std::fs::read(PATH).unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    assert_eq!(d.header().type_code, 2000);
    assert_eq!(d.header().format.to_string(), "SI");
    assert_eq!(d.header().adjunct.subsize(), Some(4));
    assert_eq!(d.element_count(), 6);

    Validator::new(PATH).validate(d.data());
}

#[test]
fn decode_mat_complex() {
    let data = std::fs::read("fixtures/complex.mat").unwrap();
    let d = avec::decode(&data, &Options::default()).unwrap();

    assert_eq!(d.header().format.to_string(), "SF");
    let real: Vec<_> = d.data().scalars().iter().collect();
    let imaginary: Vec<_> = d.imaginary().unwrap().scalars().iter().collect();
    assert_eq!(real, [1.0, 2.0, 3.0, 4.0].map(Scalar::F32));
    assert_eq!(imaginary, [-1.0, -2.0, -3.0, -4.0].map(Scalar::F32));
}

#[test]
fn decode_from_path() {
    let n = avec::decode_from_source("fixtures/pulse.tmp", &Options::default(), |d| {
        d.map(|d| d.element_count())
    });
    assert_eq!(n, Some(200));
}

#[test]
fn decode_from_reader() {
    let file = std::fs::File::open("fixtures/raster.tmp").unwrap();
    let o = Options::new(KeywordForm::List);
    let frames = avec::decode_from_source(ReadSource(file), &o, |d| {
        d.map(|d| d.data().elements().count())
    });
    assert_eq!(frames, Some(8));
}

#[test]
fn decode_from_missing_path() {
    let found = avec::decode_from_source("fixtures/missing.tmp", &Options::default(), |d| {
        d.is_some()
    });
    assert!(!found);
}

/// Expected elements, one row per element, read from a neighbouring csv file.
struct Validator(Vec<Vec<f64>>);

impl Validator {
    fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().with_extension("csv");

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .unwrap();

        let expected = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.parse().unwrap()).collect())
            .collect();

        Self(expected)
    }

    fn validate(&self, view: &DataView) {
        assert_eq!(view.len(), self.0.len());

        for (i, (element, expected)) in view.elements().zip(&self.0).enumerate() {
            let found: Vec<f64> = element.iter().map(Scalar::to_f64).collect();
            assert_eq!(&found, expected, "element {i}");
        }
    }
}
