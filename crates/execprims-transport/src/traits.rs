use std::io::{Read, Write};

use crate::error::Result;

/// The controller's end of a helper channel. Implements Read + Write.
///
/// On Unix this wraps one end of a connected `socketpair(2)`; the helper
/// holds the other end as its stdin and stdout.
pub struct HelperStream {
    inner: HelperStreamInner,
}

enum HelperStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for HelperStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for HelperStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl HelperStream {
    /// Create a HelperStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: HelperStreamInner::Unix(stream),
        }
    }

    /// Create two connected streams.
    ///
    /// Used to run an in-process helper (for example a test double on a
    /// thread) against the same stream type a spawned helper would get.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()
            .map_err(crate::error::TransportError::Channel)?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
        }
    }

    /// Shut down both directions of the channel.
    ///
    /// Wakes any thread blocked reading from a clone of this stream.
    pub fn close(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

impl std::fmt::Debug for HelperStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            HelperStreamInner::Unix(_) => f
                .debug_struct("HelperStream")
                .field("type", &"socketpair")
                .finish(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::time::Duration;

    use super::*;

    #[test]
    fn pair_is_bidirectional() {
        let (mut left, mut right) = HelperStream::pair().unwrap();

        left.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        right.write_all(b"pong").unwrap();
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn dropping_peer_yields_eof() {
        let (mut left, right) = HelperStream::pair().unwrap();
        drop(right);

        let mut buf = [0u8; 8];
        assert_eq!(left.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_timeout_applies() {
        let (left, _right) = HelperStream::pair().unwrap();
        left.set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();

        let mut reader = left.try_clone().unwrap();
        let mut buf = [0u8; 1];
        let err = reader.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn close_wakes_clone_with_eof() {
        let (left, _right) = HelperStream::pair().unwrap();
        let mut clone = left.try_clone().unwrap();
        left.close().unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(clone.read(&mut buf).unwrap(), 0);
    }
}
