//! Duplex byte channel to an interactive shell.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ChannelError, Result};

/// A raw, unframed, bidirectional byte stream to a remote shell.
///
/// Implementations deliver whatever bytes are available; a single
/// `receive` may return part of a line or several lines at once.
pub trait ShellChannel: Send {
    /// Send bytes to the shell.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of at most `max_bytes` bytes.
    ///
    /// Returns [`ChannelError::Closed`] once the remote side has closed
    /// the stream; never returns an empty chunk.
    fn receive(&mut self, max_bytes: usize) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// [`ShellChannel`] over any tokio byte stream (TCP socket, pipe, test mock).
#[derive(Debug)]
pub struct StreamChannel<S> {
    stream: S,
}

impl<S> StreamChannel<S> {
    /// Wrap a stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> ShellChannel for StreamChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await.map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;
        Ok(())
    }

    async fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes.max(1)];
        let n = self.stream.read(&mut buf).await.map_err(ChannelError::Io)?;
        if n == 0 {
            return Err(ChannelError::Closed.into());
        }
        buf.truncate(n);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn test_stream_channel_roundtrip() {
        let mock = tokio_test::io::Builder::new()
            .write(b"/system identity print\r\n")
            .read(b"name: MikroTik")
            .build();
        let mut channel = StreamChannel::new(mock);

        channel.send(b"/system identity print\r\n").await.unwrap();
        let chunk = channel.receive(4096).await.unwrap();
        assert_eq!(chunk, b"name: MikroTik");
    }

    #[tokio::test]
    async fn test_receive_respects_max_bytes() {
        let mock = tokio_test::io::Builder::new().read(b"abcdef").build();
        let mut channel = StreamChannel::new(mock);

        assert_eq!(channel.receive(4).await.unwrap(), b"abcd");
        assert_eq!(channel.receive(4).await.unwrap(), b"ef");
    }

    #[tokio::test]
    async fn test_eof_is_closed() {
        let mock = tokio_test::io::Builder::new().build();
        let mut channel = StreamChannel::new(mock);

        let err = channel.receive(4096).await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }
}
