//! Audit records and their line format
//!
//! Every record renders as a single line:
//!
//! ```text
//! <pid>: <event>: <fields>\n
//! ```
//!
//! Paths, PTY names and payloads go through [`escape`] so a line never
//! contains raw control bytes.

pub mod escape;

use std::io::Write;
use std::os::fd::RawFd;

use libc::pid_t;

pub use escape::{escape, unescape};

/// Placeholder for a PTY name the caller did not ask for
const NULL_NAME: &[u8] = b"(null)";

/// One audit event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// The multiplexer device was opened with `open`
    Open { path: &'a [u8] },
    /// The multiplexer device was opened with `openat`
    Openat { path: &'a [u8] },
    /// `getpt` returned a master
    Getpt { master: RawFd },
    /// `openpty` created a pair
    Openpty {
        master: RawFd,
        slave: RawFd,
        name: Option<&'a [u8]>,
    },
    /// `forkpty` created a pair and a child (logged in the parent)
    Forkpty {
        child: pid_t,
        master: RawFd,
        name: Option<&'a [u8]>,
    },
    /// `posix_openpt` returned a master
    PosixOpenpt { master: RawFd },
    /// Bytes written to a tracked master with `write`
    Write { fd: RawFd, chunks: &'a [&'a [u8]] },
    /// Bytes written to a tracked master with `writev`
    Writev { fd: RawFd, chunks: &'a [&'a [u8]] },
    /// `fork` succeeded (logged in the parent)
    Fork { child: pid_t },
    /// The layer is about to abort the process
    Fatal { kind: &'static str, message: &'a str },
}

impl Record<'_> {
    /// Event name used in the second field of the line
    pub fn event(&self) -> &'static str {
        match self {
            Record::Open { .. } => "open",
            Record::Openat { .. } => "openat",
            Record::Getpt { .. } => "getpt",
            Record::Openpty { .. } => "openpty",
            Record::Forkpty { .. } => "forkpty",
            Record::PosixOpenpt { .. } => "posix_openpt",
            Record::Write { .. } => "write",
            Record::Writev { .. } => "writev",
            Record::Fork { .. } => "fork",
            Record::Fatal { .. } => "fatal",
        }
    }

    /// Render the full line, including the trailing newline, into `out`
    pub fn render_into(&self, pid: u32, out: &mut Vec<u8>) {
        // Writing into a Vec cannot fail
        let _ = write!(out, "{}: {}: ", pid, self.event());
        match self {
            Record::Open { path } | Record::Openat { path } => {
                escape::escape_into(path, out);
            }
            Record::Getpt { master } | Record::PosixOpenpt { master } => {
                let _ = write!(out, "master: {}", master);
            }
            Record::Openpty {
                master,
                slave,
                name,
            } => {
                let _ = write!(out, "master: {} slave: {} name: ", master, slave);
                escape::escape_into(name.unwrap_or(NULL_NAME), out);
            }
            Record::Forkpty {
                child,
                master,
                name,
            } => {
                let _ = write!(out, "pid: {} master: {} name: ", child, master);
                escape::escape_into(name.unwrap_or(NULL_NAME), out);
            }
            Record::Write { fd, chunks } | Record::Writev { fd, chunks } => {
                let size: usize = chunks.iter().map(|c| c.len()).sum();
                let _ = write!(out, "fd: {}: size: {}: ", fd, size);
                for chunk in chunks.iter() {
                    escape::escape_into(chunk, out);
                }
            }
            Record::Fork { child } => {
                let _ = write!(out, "pid: {}", child);
            }
            Record::Fatal { kind, message } => {
                let _ = write!(out, "{}: ", kind);
                escape::escape_into(message.as_bytes(), out);
            }
        }
        out.push(b'\n');
    }

    /// Render the full line into a new buffer
    pub fn render(&self, pid: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        self.render_into(pid, &mut out);
        out
    }
}

/// A record line split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    /// Process that emitted the record
    pub pid: u32,
    /// Event name
    pub event: &'a str,
    /// Everything after the event name, without the trailing newline
    pub fields: &'a str,
}

/// Split a rendered line into pid, event and fields
pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let (pid, rest) = line.split_once(": ")?;
    let (event, fields) = rest.split_once(": ").unwrap_or((rest, ""));
    Some(ParsedLine {
        pid: pid.parse().ok()?,
        event,
        fields,
    })
}

/// Extract the byte count and decoded payload from a `write`/`writev` line
pub fn parse_payload(fields: &str) -> Option<(usize, Vec<u8>)> {
    let rest = fields.strip_prefix("fd: ")?;
    let (_fd, rest) = rest.split_once(": size: ")?;
    let (size, payload) = rest.split_once(": ")?;
    Some((size.parse().ok()?, unescape(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(record: &Record<'_>) -> String {
        String::from_utf8(record.render(4242)).unwrap()
    }

    #[test]
    fn test_open_records() {
        assert_eq!(
            line(&Record::Open { path: b"/dev/ptmx" }),
            "4242: open: /dev/ptmx\n"
        );
        assert_eq!(
            line(&Record::Openat { path: b"ptmx" }),
            "4242: openat: ptmx\n"
        );
    }

    #[test]
    fn test_master_records() {
        assert_eq!(
            line(&Record::Getpt { master: 5 }),
            "4242: getpt: master: 5\n"
        );
        assert_eq!(
            line(&Record::PosixOpenpt { master: 6 }),
            "4242: posix_openpt: master: 6\n"
        );
    }

    #[test]
    fn test_openpty_record() {
        assert_eq!(
            line(&Record::Openpty {
                master: 3,
                slave: 4,
                name: Some(b"/dev/pts/7"),
            }),
            "4242: openpty: master: 3 slave: 4 name: /dev/pts/7\n"
        );
        assert_eq!(
            line(&Record::Openpty {
                master: 3,
                slave: 4,
                name: None,
            }),
            "4242: openpty: master: 3 slave: 4 name: (null)\n"
        );
    }

    #[test]
    fn test_forkpty_and_fork_records() {
        assert_eq!(
            line(&Record::Forkpty {
                child: 900,
                master: 8,
                name: None,
            }),
            "4242: forkpty: pid: 900 master: 8 name: (null)\n"
        );
        assert_eq!(
            line(&Record::Fork { child: 901 }),
            "4242: fork: pid: 901\n"
        );
    }

    #[test]
    fn test_write_record_escapes_payload() {
        let chunks: [&[u8]; 1] = [b"ls\r"];
        assert_eq!(
            line(&Record::Write { fd: 5, chunks: &chunks }),
            "4242: write: fd: 5: size: 3: ls\\x0d\n"
        );
    }

    #[test]
    fn test_writev_record_concatenates_chunks() {
        let chunks: [&[u8]; 3] = [b"\x1b[H", b"", b"top\n"];
        assert_eq!(
            line(&Record::Writev { fd: 9, chunks: &chunks }),
            "4242: writev: fd: 9: size: 7: \\x1b[Htop\\x0a\n"
        );
    }

    #[test]
    fn test_fatal_record() {
        assert_eq!(
            line(&Record::Fatal {
                kind: "remote-connect",
                message: "connection refused",
            }),
            "4242: fatal: remote-connect: connection refused\n"
        );
    }

    #[test]
    fn test_rendered_line_has_single_newline() {
        let chunks: [&[u8]; 1] = [b"a\nb\nc\n"];
        let rendered = line(&Record::Write { fd: 5, chunks: &chunks });
        assert_eq!(rendered.matches('\n').count(), 1);
    }

    #[test]
    fn test_parse_line_and_payload() {
        let payload = b"\x03\\x41 ok\xff";
        let chunks: [&[u8]; 1] = [payload];
        let rendered = line(&Record::Write { fd: 12, chunks: &chunks });

        let parsed = parse_line(&rendered).unwrap();
        assert_eq!(parsed.pid, 4242);
        assert_eq!(parsed.event, "write");

        let (size, decoded) = parse_payload(parsed.fields).unwrap();
        assert_eq!(size, payload.len());
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_parse_payload_with_colon_space_in_data() {
        let chunks: [&[u8]; 1] = [b"key: value: x"];
        let rendered = line(&Record::Writev { fd: 1, chunks: &chunks });
        let parsed = parse_line(&rendered).unwrap();
        let (size, decoded) = parse_payload(parsed.fields).unwrap();
        assert_eq!(size, 13);
        assert_eq!(decoded, b"key: value: x");
    }
}
