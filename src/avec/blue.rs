//! Bluefile decoder implementation.

use log::debug;

use crate::sans::{extended, header::BlueHeader};

use super::{Descriptor, Error, FileKind, FormatReader, Header, Options, region};

/// Reader of Bluefiles (type 1000 and 2000).
///
/// This reader is also used by [`super::decode`] for unrecognised buffers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bluefile;

impl FormatReader for Bluefile {
    fn accepts(&self, r: &[u8]) -> bool {
        r.starts_with(&BlueHeader::VERSION)
    }

    fn read<'a>(&self, r: &'a [u8], o: &Options) -> Result<Descriptor<'a>, Error> {
        let header = BlueHeader::decode(r, o.ext_header)?;

        let ext_header = match header.ext_region()? {
            Some(range) => {
                let ext = region(r, range, "extended header")?;
                let keywords = extended::unpack(ext, header.head_little_endian, o.ext_header);
                debug!("Decoded {} extended header keywords.", keywords.len());
                Some(keywords)
            }
            None => None,
        };

        // Validated finite and non-negative by the header decoder.
        let data_start = header.data_start as usize;
        let data_size = header.data_size as usize;

        let header = Header {
            kind: FileKind::Bluefile,
            version: header.version.iter().map(|b| *b as char).collect(),
            head_little_endian: header.head_little_endian,
            data_little_endian: header.data_little_endian,
            ext_start: header.ext_start,
            ext_size: header.ext_size,
            type_code: header.type_code,
            format: header.format,
            timecode: header.timecode,
            data_start,
            data_size,
            adjunct: header.adjunct,
            keywords: header.keywords,
            ext_header,
        };

        Descriptor::assemble(r, header, None)
    }
}
