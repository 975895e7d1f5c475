//! MicroPython raw REPL over any byte stream.
//!
//! Raw mode: Ctrl-A enters, Ctrl-B leaves. Each command is terminated by
//! Ctrl-D and answered with `OK`, stdout, `\x04`, stderr, `\x04`, `>`.

use anyhow::{anyhow, bail, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

const CTRL_A: u8 = 0x01;
const CTRL_B: u8 = 0x02;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

const RAW_BANNER: &[u8] = b"raw REPL; CTRL-B to exit\r\n";
/// The board's input buffer is small; larger writes get dropped.
const WRITE_CHUNK: usize = 256;
const WRITE_PAUSE: Duration = Duration::from_millis(10);

/// Error raised by code running on the board, as opposed to a link failure.
#[derive(Debug, thiserror::Error)]
#[error("board error: {}", .0.trim_end())]
pub struct BoardError(pub String);

pub struct RawRepl<T: Read + Write> {
    port: T,
    write_pause: Duration,
}

impl<T: Read + Write> RawRepl<T> {
    /// Interrupt whatever is running and switch the board into raw mode.
    pub fn enter(port: T) -> Result<Self> {
        let mut repl = Self { port, write_pause: WRITE_PAUSE };
        repl.port.write_all(&[b'\r', CTRL_C, CTRL_C])?;
        repl.port.write_all(&[b'\r', CTRL_A])?;
        repl.port.flush()?;
        repl.read_until(RAW_BANNER)
            .map_err(|e| anyhow!("board did not enter raw REPL: {e}"))?;
        Ok(repl)
    }

    #[cfg(test)]
    fn without_pauses(mut self) -> Self {
        self.write_pause = Duration::ZERO;
        self
    }

    /// Run `code` on the board and return its stdout. Output on stderr
    /// becomes a [`BoardError`].
    pub fn exec(&mut self, code: &str) -> Result<String> {
        self.read_until(b">")?;
        for chunk in code.as_bytes().chunks(WRITE_CHUNK) {
            self.port.write_all(chunk)?;
            if !self.write_pause.is_zero() {
                std::thread::sleep(self.write_pause);
            }
        }
        self.port.write_all(&[CTRL_D])?;
        self.port.flush()?;

        let mut ok = [0u8; 2];
        self.port.read_exact(&mut ok)?;
        if &ok != b"OK" {
            bail!("board rejected command: {:?}", String::from_utf8_lossy(&ok));
        }
        let out = self.read_until(&[CTRL_D])?;
        let err = self.read_until(&[CTRL_D])?;
        if !err.is_empty() {
            return Err(BoardError(String::from_utf8_lossy(&err).into_owned()).into());
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Leave raw mode and soft-reset the board so `main.py` restarts.
    pub fn exit(mut self) -> Result<T> {
        self.port.write_all(&[b'\r', CTRL_B])?;
        self.port.write_all(&[CTRL_D])?;
        self.port.flush()?;
        Ok(self.port)
    }

    /// Read until the stream ends with `marker`; returns what came before it.
    fn read_until(&mut self, marker: &[u8]) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        while !buf.ends_with(marker) {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(_) => buf.push(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        buf.truncate(buf.len() - marker.len());
        Ok(buf)
    }
}
