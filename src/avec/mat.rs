//! MAT-file decoder implementation.
//!
//! The first numeric array of a level 5 MAT-file is presented as a Bluefile
//! would present it: vectors as type 1000 data, and matrices as type 2000
//! frames, one frame per column.

use alloc::{format, string::String};

use log::debug;

use crate::sans::{
    extended::{Keyword, Keywords, Value},
    header::{Adjunct, HeaderError},
    matfile::{self, MatHeader},
};

use super::{Descriptor, Error, FileKind, FormatReader, Header, Options};

/// Reader of level 5 MAT-files.
#[derive(Debug, Default, Clone, Copy)]
pub struct MatFile;

impl FormatReader for MatFile {
    fn accepts(&self, r: &[u8]) -> bool {
        MatHeader::sniff(r)
    }

    fn read<'a>(&self, r: &'a [u8], o: &Options) -> Result<Descriptor<'a>, Error> {
        let header = MatHeader::decode(r)?;
        let variable = matfile::first_variable(r, &header)?;

        debug!(
            "Found MAT-file array {:?} of dimensions {:?}.",
            variable.name, variable.dimensions
        );

        let (type_code, adjunct) = if variable.is_vector() {
            let adjunct = Adjunct::OneDimensional {
                xstart: 0.0,
                xdelta: 1.0,
                xunits: 0,
            };

            (1000, adjunct)
        } else {
            let subsize = i32::try_from(variable.rows())
                .map_err(|_| HeaderError::Invalid { field: "subsize" })?;

            let adjunct = Adjunct::TwoDimensional {
                xstart: 0.0,
                xdelta: 1.0,
                xunits: 0,
                subsize,
                ystart: 0.0,
                ydelta: 1.0,
                yunits: 0,
            };

            (2000, adjunct)
        };

        let keywords = Keywords::collect(
            o.ext_header,
            [
                ("NAME", variable.name.clone()),
                ("DESCRIPTION", header.text.clone()),
            ]
            .map(|(tag, text)| Keyword {
                tag: tag.into(),
                value: Value::Text(text),
            }),
        );

        let header = Header {
            kind: FileKind::MatFile,
            version: version(header.version),
            head_little_endian: header.little_endian,
            data_little_endian: header.little_endian,
            ext_start: 0,
            ext_size: 0,
            type_code,
            format: variable.format(),
            timecode: 0.0,
            data_start: variable.real.start,
            data_size: variable.real.len(),
            adjunct,
            keywords,
            ext_header: None,
        };

        Descriptor::assemble(r, header, variable.imaginary)
    }
}

fn version(v: u16) -> String {
    format!("{:#06x}", v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        avec::decode,
        sans::{format::Scalar, matfile::MatError, view::Indexed},
    };

    const HOST_LE: bool = cfg!(target_endian = "little");

    fn tagged(data_type: u32, data: &[u8]) -> Vec<u8> {
        let mut r = Vec::new();
        r.extend(data_type.to_ne_bytes());
        r.extend((data.len() as u32).to_ne_bytes());
        r.extend(data);
        r.resize(r.len().next_multiple_of(8), 0);
        r
    }

    fn file(class: u32, name: &[u8], dims: &[i32], real: &[f64], imaginary: Option<&[f64]>) -> Vec<u8> {
        let mut r = b"MATLAB 5.0 MAT-file, test".to_vec();
        r.resize(116, b' ');
        r.resize(124, 0);
        r.extend(0x0100u16.to_ne_bytes());
        r.extend(if HOST_LE { b"IM" } else { b"MI" });

        let flags = class | if imaginary.is_some() { 1 << 11 } else { 0 };

        let mut body = tagged(6, &[flags.to_ne_bytes(), [0; 4]].concat());
        body.extend(tagged(5, &dims.iter().flat_map(|d| d.to_ne_bytes()).collect::<Vec<_>>()));
        body.extend(tagged(1, name));
        body.extend(tagged(9, &real.iter().flat_map(|x| x.to_ne_bytes()).collect::<Vec<_>>()));
        if let Some(imaginary) = imaginary {
            body.extend(tagged(9, &imaginary.iter().flat_map(|x| x.to_ne_bytes()).collect::<Vec<_>>()));
        }

        r.extend(tagged(14, &body));
        r
    }

    #[test]
    fn vector() {
        let r = file(6, b"signal", &[1, 4], &[1.0, 2.0, 3.0, 4.0], None);
        let d = decode(&r, &Options::default()).unwrap();

        assert_eq!(d.header().kind, FileKind::MatFile);
        assert_eq!(d.header().version, "0x0100");
        assert_eq!(d.header().type_code, 1000);
        assert_eq!(d.header().format.to_string(), "SD");
        assert_eq!(d.element_count(), 4);
        assert_eq!(d.data().value(2), Some(Scalar::F64(3.0)));
        assert_eq!(d.header().keywords.get("NAME"), Some(&Value::Text("signal".into())));
        assert_eq!(
            d.header().keywords.get("DESCRIPTION"),
            Some(&Value::Text("MATLAB 5.0 MAT-file, test".into()))
        );
        assert!(d.imaginary().is_none());
    }

    #[test]
    fn matrix_columns() {
        let real: Vec<f64> = (0..6).map(f64::from).collect();
        let r = file(6, b"m", &[2, 3], &real, None);
        let d = decode(&r, &Options::default()).unwrap();

        assert_eq!(d.class(), 2);
        assert_eq!(d.header().adjunct.subsize(), Some(2));
        assert_eq!(d.element_count(), 3);
        let column: Vec<_> = d.data().element(1).unwrap().iter().collect();
        assert_eq!(column, [2.0, 3.0].map(Scalar::F64));
        assert_eq!(d.y_at(1), Some(1.0));
    }

    #[test]
    fn complex_vector() {
        let r = file(6, b"z", &[3, 1], &[1.0, 2.0, 3.0], Some(&[-1.0, -2.0, -3.0]));
        let d = decode(&r, &Options::default()).unwrap();

        let imaginary = d.imaginary().unwrap();
        assert_eq!(imaginary.len(), 3);
        assert_eq!(imaginary.value(1), Some(Scalar::F64(-2.0)));
        assert_eq!(d.data().value(1), Some(Scalar::F64(2.0)));
    }

    #[test]
    fn compressed_only() {
        let mut r = file(6, b"x", &[1, 1], &[0.0], None);
        r.truncate(128);
        r.extend(tagged(15, &[0; 16]));

        assert_eq!(
            decode(&r, &Options::default()).unwrap_err(),
            Error::MalformedMatFile(MatError::Compressed)
        );
    }
}
