use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{Error, Result};

/// Decompress a raw (headerless) DEFLATE stream, the encoding ZIP uses for
/// entry bodies, distinct from the zlib/gzip wrapped variants.
///
/// `size_hint` seeds the output buffer and should normally be the entry's
/// declared uncompressed size. It is advisory only: when the buffer fills
/// before the stream ends it grows by x1.5 and decompression continues, so
/// inconsistent archive metadata cannot truncate the result.
pub fn inflate_raw(data: &[u8], size_hint: usize, entry: &str) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(size_hint.max(32));

    loop {
        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| Error::DataFormat {
                entry: entry.to_string(),
                detail: e.to_string(),
            })?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                if out.len() == out.capacity() {
                    // Hint was too small; grow and keep going.
                    out.reserve(out.capacity() / 2 + 1);
                } else if inflater.total_in() as usize >= data.len() && out.len() == produced {
                    // No input left and no progress: the stream is cut off.
                    return Err(Error::DataFormat {
                        entry: entry.to_string(),
                        detail: "truncated deflate stream".to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn deflate(payload: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn round_trip_with_exact_hint() {
        let payload = b"hello nested world".repeat(100);
        let compressed = deflate(&payload);
        let out = inflate_raw(&compressed, payload.len(), "t").unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn hint_smaller_than_payload_still_recovers_everything() {
        let payload: Vec<u8> = (0..u8::MAX).cycle().take(50_000).collect();
        let compressed = deflate(&payload);
        // A wildly wrong hint forces several buffer growths.
        let out = inflate_raw(&compressed, 7, "t").unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn hint_larger_than_payload_is_harmless() {
        let payload = b"tiny";
        let compressed = deflate(payload);
        let out = inflate_raw(&compressed, 4096, "t").unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn truncated_stream_is_a_data_format_error() {
        let payload = b"some payload that compresses to more than a few bytes".repeat(20);
        let mut compressed = deflate(&payload);
        compressed.truncate(compressed.len() / 2);
        let err = inflate_raw(&compressed, payload.len(), "broken").unwrap_err();
        assert!(matches!(err, Error::DataFormat { .. }));
    }

    #[test]
    fn garbage_input_is_a_data_format_error() {
        let err = inflate_raw(&[0xde, 0xad, 0xbe, 0xef, 0x99, 0x12], 64, "junk").unwrap_err();
        assert!(matches!(err, Error::DataFormat { .. }));
    }
}
