use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use tokio_serial::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::error::{Result, SynScanError};
use crate::SerialConfig;

pub const COMMAND_TERMINATOR: u8 = b'\r';
pub const REPLY_TERMINATOR: u8 = b'#';

/// One request/reply exchange on the link. Only the executor loop calls this.
pub trait Transport: Send {
    /// Send `frame` plus the command terminator and return the reply without its `#`.
    /// Any error is a fatal link failure.
    fn transmit(&mut self, frame: &[u8]) -> Result<Vec<u8>>;
}

pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    dev: String,
    exchange_timeout: Duration,
}

impl SerialChannel {
    pub fn open(dev: &str, cfg: &SerialConfig) -> Result<Self> {
        let port = tokio_serial::new(dev, cfg.baud)
            .timeout(cfg.poll_interval())
            .open()?;
        info!("mount serial open: {} @ {}", dev, cfg.baud);
        Ok(Self {
            port,
            dev: dev.to_string(),
            exchange_timeout: cfg.exchange_timeout(),
        })
    }

    fn fault(&self, what: &str, e: impl std::fmt::Display) -> SynScanError {
        SynScanError::unavailable(format!("{} on {}: {}", what, self.dev, e))
    }
}

impl Transport for SerialChannel {
    fn transmit(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        // drop anything a previous timed-out exchange left behind
        self.port.clear(ClearBuffer::Input).map_err(|e| self.fault("clear", e))?;

        let mut out = Vec::with_capacity(frame.len() + 1);
        out.extend_from_slice(frame);
        out.push(COMMAND_TERMINATOR);
        self.port.write_all(&out).map_err(|e| self.fault("write", e))?;
        self.port.flush().map_err(|e| self.fault("flush", e))?;

        let reply = read_reply(&mut self.port, self.exchange_timeout).map_err(|e| self.fault("read", e))?;
        debug!(frame = ?String::from_utf8_lossy(frame), reply_len = reply.len(), "exchange");
        Ok(reply)
    }
}

/// Collect bytes up to the reply terminator. Read timeouts are retried until
/// `exchange_timeout`; end of stream fails at once.
fn read_reply(reader: &mut impl Read, exchange_timeout: Duration) -> io::Result<Vec<u8>> {
    let started = Instant::now();
    let mut reply = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("eof after {} bytes", reply.len()),
                ))
            }
            Ok(_) if byte[0] == REPLY_TERMINATOR => return Ok(reply),
            Ok(_) => reply.push(byte[0]),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
        if started.elapsed() > exchange_timeout {
            return Err(io::Error::new(
                ErrorKind::TimedOut,
                format!("no reply terminator: {} bytes after {:?}", reply.len(), exchange_timeout),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers every read with a timeout, like an idle port.
    struct Silent;

    impl Read for Silent {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(1));
            Err(io::Error::new(ErrorKind::TimedOut, "idle"))
        }
    }

    #[test]
    fn reply_stops_at_terminator() {
        let mut wire: &[u8] = b"8000,4000#trailing";
        assert_eq!(read_reply(&mut wire, Duration::from_secs(1)).unwrap(), b"8000,4000");
        assert_eq!(wire, b"trailing");
    }

    #[test]
    fn end_of_stream_fails_without_waiting() {
        let mut wire: &[u8] = b"80";
        let started = Instant::now();
        let err = read_reply(&mut wire, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn silent_port_times_out() {
        let err = read_reply(&mut Silent, Duration::from_millis(20)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }
}
