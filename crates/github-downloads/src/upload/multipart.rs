//! Hand-built `multipart/form-data` envelope for the storage endpoint.
//!
//! The storage endpoint is sensitive to part order, so the envelope is framed
//! by hand rather than through a generic form builder. Only the file part is
//! streamed; everything around it is buffered up front so the total length is
//! known before the request starts.

use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;

/// Alphabet the boundary is drawn from.
pub const BOUNDARY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a generated boundary.
pub const BOUNDARY_LEN: usize = 64;

/// Draws a fresh boundary for one upload.
pub fn generate_boundary() -> String {
    let mut rng = rand::thread_rng();
    (0..BOUNDARY_LEN)
        .map(|_| char::from(BOUNDARY_ALPHABET[rng.gen_range(0..BOUNDARY_ALPHABET.len())]))
        .collect()
}

/// Framing bytes around the streamed file part.
#[derive(Debug, Clone)]
pub struct Envelope {
    boundary: String,
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl Envelope {
    /// Frames `fields` in order, followed by the header of the `file` part.
    ///
    /// Field values are written as their UTF-8 bytes without validation.
    pub fn new(boundary: impl Into<String>, fields: &[(&str, &str)], content_type: &str) -> Self {
        let boundary = boundary.into();

        let mut head = String::new();
        for (name, value) in fields {
            head.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        head.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"\r\nContent-Type: {content_type}\r\n\r\n"
        ));

        let tail = format!("\r\n--{boundary}--").into_bytes();

        Self {
            boundary,
            head: head.into_bytes(),
            tail,
        }
    }

    /// Returns the boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value of the request `Content-Type` header.
    pub fn content_type_header(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Total envelope length for a file part of `body_len` bytes.
    pub fn len(&self, body_len: u64) -> u64 {
        self.head.len() as u64 + body_len + self.tail.len() as u64
    }

    /// Chains the framing around `body` into one reader.
    pub fn into_reader<R>(self, body: R) -> impl Read + Send + 'static
    where
        R: Read + Send + 'static,
    {
        Cursor::new(self.head).chain(body).chain(Cursor::new(self.tail))
    }
}

#[derive(Debug, Default)]
struct BodyState {
    failure: Option<io::Error>,
    finished: bool,
}

/// Shared view of how far the caller's reader got.
#[derive(Debug, Clone, Default)]
pub struct BodyProgress(Arc<Mutex<BodyState>>);

impl BodyProgress {
    fn update(&self, f: impl FnOnce(&mut BodyState)) {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Takes the first error raised while reading, if any.
    pub fn take_failure(&self) -> Option<io::Error> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failure
            .take()
    }

    /// Check if the reader delivered exactly its declared length and ended.
    pub fn is_finished(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).finished
    }
}

/// Reader that holds the caller's source to its declared length.
///
/// Errors surface on the transport side as generic request failures, so the
/// caller's reader is wrapped to tell a broken source apart from a broken
/// connection. A source that ends early or keeps going past its declared
/// length fails here as well, instead of truncating or stalling the envelope.
pub struct TrackedReader<R> {
    inner: R,
    declared: u64,
    remaining: u64,
    progress: BodyProgress,
}

impl<R: Read> TrackedReader<R> {
    /// Wraps `inner`, which must yield exactly `declared` bytes.
    pub fn new(inner: R, declared: u64, progress: BodyProgress) -> Self {
        Self {
            inner,
            declared,
            remaining: declared,
            progress,
        }
    }

    fn read_bounded(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.remaining == 0 {
            let mut extra = [0u8; 1];
            return match self.inner.read(&mut extra)? {
                0 => {
                    self.progress.update(|state| state.finished = true);
                    Ok(0)
                }
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("upload body is longer than its declared {} bytes", self.declared),
                )),
            };
        }

        let limit = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let read = self.inner.read(&mut buf[..limit])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "upload body ended {} bytes short of its declared {} bytes",
                    self.remaining, self.declared
                ),
            ));
        }

        self.remaining -= read as u64;
        Ok(read)
    }
}

impl<R: Read> Read for TrackedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_bounded(buf) {
            Err(err) if err.kind() != io::ErrorKind::Interrupted => {
                let recorded = io::Error::new(err.kind(), err.to_string());
                self.progress.update(|state| {
                    state.failure.get_or_insert(recorded);
                });
                Err(err)
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk gone"))
        }
    }

    #[test]
    fn test_boundary() {
        let boundary = generate_boundary();
        assert_eq!(boundary.len(), BOUNDARY_LEN);
        assert!(boundary.bytes().all(|b| BOUNDARY_ALPHABET.contains(&b)));
        assert_ne!(boundary, generate_boundary());
    }

    #[test]
    fn test_envelope_layout() {
        let envelope = Envelope::new("xyz", &[("Filename", "a.txt"), ("key", "pre/a.txt")], "text/plain");
        assert_eq!(envelope.content_type_header(), "multipart/form-data; boundary=xyz");

        let mut bytes = Vec::new();
        envelope.clone().into_reader(&b"hello"[..]).read_to_end(&mut bytes).unwrap();

        let expected = "--xyz\r\nContent-Disposition: form-data; name=\"Filename\"\r\n\r\na.txt\r\n\
            --xyz\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\npre/a.txt\r\n\
            --xyz\r\nContent-Disposition: form-data; name=\"file\"\r\nContent-Type: text/plain\r\n\r\n\
            hello\r\n--xyz--";
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
        assert_eq!(envelope.len(5), expected.len() as u64);
    }

    #[test]
    fn test_empty_body() {
        let envelope = Envelope::new("b", &[], "application/octet-stream");
        let mut bytes = Vec::new();
        envelope.clone().into_reader(io::empty()).read_to_end(&mut bytes).unwrap();

        assert_eq!(bytes.len() as u64, envelope.len(0));
        assert!(bytes.ends_with(b"\r\n\r\n\r\n--b--"));
    }

    fn drain(reader: &mut impl Read) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    #[test]
    fn test_tracked_reader_records_failure() {
        let progress = BodyProgress::default();
        let mut reader = TrackedReader::new(Failing, 8, progress.clone());

        let mut buf = [0u8; 8];
        assert!(reader.read(&mut buf).is_err());

        let recorded = progress.take_failure().unwrap();
        assert_eq!(recorded.to_string(), "disk gone");
        assert!(progress.take_failure().is_none());
        assert!(!progress.is_finished());
    }

    #[test]
    fn test_tracked_reader_passes_declared_length() {
        let progress = BodyProgress::default();
        let mut reader = TrackedReader::new(&b"abc"[..], 3, progress.clone());

        assert_eq!(drain(&mut reader).unwrap(), b"abc");
        assert!(progress.take_failure().is_none());
        assert!(progress.is_finished());
    }

    #[test]
    fn test_tracked_reader_rejects_longer_source() {
        let progress = BodyProgress::default();
        let mut reader = TrackedReader::new(&b"hello world"[..], 5, progress.clone());

        let error = drain(&mut reader).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert_eq!(
            progress.take_failure().unwrap().kind(),
            io::ErrorKind::InvalidData
        );
        assert!(!progress.is_finished());
    }

    #[test]
    fn test_tracked_reader_rejects_shorter_source() {
        let progress = BodyProgress::default();
        let mut reader = TrackedReader::new(&b"hi"[..], 5, progress.clone());

        let error = drain(&mut reader).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        assert!(error.to_string().contains("3 bytes short"));
        assert!(progress.take_failure().is_some());
    }

    #[test]
    fn test_envelope_never_truncates_longer_source() {
        let envelope = Envelope::new("b", &[], "text/plain");
        let progress = BodyProgress::default();
        let reader = TrackedReader::new(&b"hello world"[..], 5, progress.clone());

        // The mismatch surfaces before any tail byte is produced.
        let mut framed = envelope.into_reader(reader);
        let error = drain(&mut framed).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
