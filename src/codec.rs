use bytes::{Buf, Bytes, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Re-encodes a non-UTF-8 upload (latin-1, UTF-16, ...) as UTF-8 chunks.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
    finished: bool,
}

impl Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_with_bom_removal(),
            finished: false,
        }
    }

    fn convert(&mut self, src: &mut BytesMut, last: bool) -> Option<Bytes> {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 16);
        let mut out = String::with_capacity(capacity);
        let (_result, read, _replaced) = self.decoder.decode_to_string(src, &mut out, last);
        src.advance(read);
        (!out.is_empty()).then(|| Bytes::from(out))
    }
}

impl Decoder for Transcoder {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // a split multi-byte sequence is buffered inside the decoder
        Ok(self.convert(src, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            buf.clear();
            return Ok(None);
        }
        self.finished = true;
        let out = self.convert(buf, true);
        buf.clear();
        Ok(out)
    }
}
