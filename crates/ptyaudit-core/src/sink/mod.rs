//! Log sink for audit records
//!
//! The sink always writes to one descriptor number. In remote mode a TCP
//! socket is connected first and duplicated onto that number, so every caller
//! keeps writing to the same descriptor without knowing about the network.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};

use libc::{c_int, c_void, size_t, ssize_t};

use crate::config::{Destination, CONNECT_TIMEOUT};
use crate::error::AuditError;
use crate::record::Record;

/// Signature of the `write` implementation used to emit records
///
/// The preloaded shim passes the original libc `write` so that emitting a
/// record never re-enters its own interceptor.
pub type WriteFn = unsafe extern "C" fn(c_int, *const c_void, size_t) -> ssize_t;

/// Where the reserved descriptor points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Inherited from the harness, already open
    Local,
    /// A socket connected to a collector
    Remote(Destination),
}

/// Destination of audit records
#[derive(Debug)]
pub struct LogSink {
    fd: RawFd,
    write: WriteFn,
    transport: Transport,
}

impl LogSink {
    /// Sink writing to an already open descriptor
    pub fn local(fd: RawFd, write: WriteFn) -> Self {
        Self {
            fd,
            write,
            transport: Transport::Local,
        }
    }

    /// Connect to `destination` and place the socket on `fd`
    ///
    /// Any descriptor previously open under `fd` is replaced.
    pub fn remote(destination: &Destination, fd: RawFd, write: WriteFn) -> Result<Self, AuditError> {
        let stream = connect(destination).map_err(|source| AuditError::Connect {
            destination: destination.to_string(),
            source,
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to disable Nagle on log socket: {}", e);
        }

        // SAFETY: both descriptors are plain integers; dup2 validates them
        if unsafe { libc::dup2(stream.as_raw_fd(), fd) } == -1 {
            return Err(AuditError::LogChannel {
                fd,
                source: io::Error::last_os_error(),
            });
        }
        // `stream` drops here; its duplicate on `fd` stays connected

        tracing::debug!("Audit records shipped to {} via fd {}", destination, fd);
        Ok(Self {
            fd,
            write,
            transport: Transport::Remote(destination.clone()),
        })
    }

    /// Build the sink selected by `remote`
    pub fn open(remote: Option<&Destination>, fd: RawFd, write: WriteFn) -> Result<Self, AuditError> {
        match remote {
            Some(destination) => Self::remote(destination, fd, write),
            None => Ok(Self::local(fd, write)),
        }
    }

    /// Reserved descriptor the sink writes to
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Current transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Emit one record attributed to `pid`
    pub fn emit_as(&self, pid: u32, record: &Record<'_>) -> io::Result<()> {
        let line = record.render(pid);
        self.write_all(&line)
    }

    /// Emit one record attributed to the calling process
    pub fn emit(&self, record: &Record<'_>) -> io::Result<()> {
        let pid = nix::unistd::getpid().as_raw() as u32;
        self.emit_as(pid, record)
    }

    fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            // SAFETY: `buf` is a live slice for the duration of the call
            let n = unsafe { (self.write)(self.fd, buf.as_ptr().cast(), buf.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if n == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            buf = &buf[n as usize..];
        }
        Ok(())
    }
}

fn connect(destination: &Destination) -> io::Result<TcpStream> {
    let addrs = (destination.host.as_str(), destination.port).to_socket_addrs()?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Collector address {} unreachable: {}", addr, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "destination resolved to no addresses")
    }))
}
