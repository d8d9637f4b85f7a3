use std::io::{self, Read};

use memchr::memmem;

const CHUNK_SIZE: usize = 8192;

/// Forward-only reader with delimiter search.
///
/// Bytes pulled from the underlying reader stay in `buf` until consumed, so a
/// search that has to wait for more data resumes where it stopped instead of
/// scanning the whole buffer again.
pub struct Cursor<R> {
    inner: R,
    buf: Vec<u8>,
    start: usize,
    eof: bool,
    position: u64,
}

impl<R: Read> Cursor<R> {
    pub fn new(inner: R) -> Cursor<R> {
        Cursor {
            inner,
            buf: Vec::with_capacity(CHUNK_SIZE),
            start: 0,
            eof: false,
            position: 0,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the bytes before `delim`, leaving the delimiter unconsumed.
    ///
    /// Returns `None` without consuming anything if the stream ends before
    /// the delimiter shows up.
    pub fn read_until(&mut self, delim: &[u8]) -> io::Result<Option<Vec<u8>>> {
        match self.find(delim)? {
            Some(idx) => {
                let data = self.buf[self.start..self.start + idx].to_vec();
                self.consume(idx);
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Like `read_until`, but the delimiter is consumed too.
    pub fn read_until_and_consume(&mut self, delim: &[u8]) -> io::Result<Option<Vec<u8>>> {
        let data = self.read_until(delim)?;
        if data.is_some() {
            self.consume(delim.len());
        }
        Ok(data)
    }

    pub fn skip(&mut self, n: usize) -> io::Result<()> {
        while self.buf.len() - self.start < n {
            if !self.fill()? {
                let available = self.buf.len() - self.start;
                self.consume(available);
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("cannot skip {} bytes, only {} left", n, available),
                ));
            }
        }
        self.consume(n);
        Ok(())
    }

    /// Drains the stream.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        while self.fill()? {}
        let data = self.buf[self.start..].to_vec();
        self.consume(data.len());
        Ok(data)
    }

    fn consume(&mut self, n: usize) {
        self.start += n;
        self.position += n as u64;
    }

    // Offset of `delim` relative to `start`.
    fn find(&mut self, delim: &[u8]) -> io::Result<Option<usize>> {
        let finder = memmem::Finder::new(delim);
        let mut from = 0;
        loop {
            let available = &self.buf[self.start..];
            if let Some(idx) = finder.find(&available[from..]) {
                return Ok(Some(from + idx));
            }
            // A delimiter may straddle the end of what we have.
            from = (available.len() + 1).saturating_sub(delim.len());
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    // Appends one chunk to the buffer, returns false at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }

        let len = self.buf.len();
        self.buf.resize(len + CHUNK_SIZE, 0);
        loop {
            match self.inner.read(&mut self.buf[len..]) {
                Ok(0) => {
                    self.buf.truncate(len);
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.truncate(len + n);
                    return Ok(true);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(len);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cursor;
    use std::io::{self, Read};

    /// Hands out one byte per read call, so every delimiter straddles a
    /// chunk boundary at some point.
    struct Trickle<'a>(&'a [u8]);

    impl<'a> Read for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    /// Fails every other call with `Interrupted`, then hands out three bytes.
    struct Flaky<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl<'a> Read for Flaky<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = self.data.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn read_until_leaves_delimiter() {
        let mut cursor = Cursor::new(&b"abc\r\nFrom def"[..]);
        assert_eq!(
            cursor.read_until(b"\r\nFrom ").unwrap(),
            Some(b"abc".to_vec())
        );
        assert_eq!(cursor.position(), 3);
        cursor.skip(2).unwrap();
        assert_eq!(cursor.read_all().unwrap(), b"From def".to_vec());
        assert_eq!(cursor.position(), 13);
    }

    #[test]
    fn read_until_and_consume_drops_delimiter() {
        let mut cursor = Cursor::new(&b"one\r\ntwo\r\n"[..]);
        assert_eq!(
            cursor.read_until_and_consume(b"\r\n").unwrap(),
            Some(b"one".to_vec())
        );
        assert_eq!(
            cursor.read_until_and_consume(b"\r\n").unwrap(),
            Some(b"two".to_vec())
        );
        assert_eq!(cursor.read_until_and_consume(b"\r\n").unwrap(), None);
        assert_eq!(cursor.read_all().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn missing_delimiter_consumes_nothing() {
        let mut cursor = Cursor::new(&b"no boundary here"[..]);
        assert_eq!(cursor.read_until(b"\r\nFrom ").unwrap(), None);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_all().unwrap(), b"no boundary here".to_vec());
    }

    #[test]
    fn delimiter_across_reads() {
        let data = b"first\r\nsecond\r\nFrom third";
        let mut cursor = Cursor::new(Trickle(&data[..]));
        assert_eq!(
            cursor.read_until(b"\r\nFrom ").unwrap(),
            Some(b"first\r\nsecond".to_vec())
        );
        cursor.skip(2).unwrap();
        assert_eq!(
            cursor.read_until_and_consume(b" ").unwrap(),
            Some(b"From".to_vec())
        );
        assert_eq!(cursor.read_all().unwrap(), b"third".to_vec());
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut cursor = Cursor::new(Flaky {
            data: b"x\r\nFrom y\r\nz",
            interrupt: false,
        });
        assert_eq!(
            cursor.read_until(b"\r\nFrom ").unwrap(),
            Some(b"x".to_vec())
        );
        cursor.skip(2).unwrap();
        assert_eq!(
            cursor.read_until_and_consume(b"\r\n").unwrap(),
            Some(b"From y".to_vec())
        );
        assert_eq!(cursor.read_all().unwrap(), b"z".to_vec());
        assert_eq!(cursor.position(), 12);
    }

    #[test]
    fn large_input_spans_many_chunks() {
        let mut data = vec![b'x'; 3 * super::CHUNK_SIZE + 17];
        data.extend_from_slice(b"\r\nFrom tail");
        let mut cursor = Cursor::new(&data[..]);
        let body = cursor.read_until(b"\r\nFrom ").unwrap().unwrap();
        assert_eq!(body.len(), 3 * super::CHUNK_SIZE + 17);
        assert_eq!(cursor.position(), body.len() as u64);
    }

    #[test]
    fn skip_past_end_fails() {
        let mut cursor = Cursor::new(&b"x"[..]);
        let err = cursor.skip(2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn io_errors_propagate() {
        let mut cursor = Cursor::new(Broken);
        let err = cursor.read_until(b"\r\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(cursor.read_all().is_err());
    }
}
