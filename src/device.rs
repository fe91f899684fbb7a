//! The character-device transport (spec §4.9): a thin wrapper over
//! `std::fs::File` that the event loop drives through `Read`/`Write`, kept
//! separate from the engines and codec so neither needs to know how bytes
//! actually reach the modem (mirrors the teacher's split between a driver's
//! register-level transport and its protocol logic).

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};

pub struct Device {
    file: File,
}

impl Device {
    pub fn open(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Commits any buffered filesystem state for the device fd (spec §4.7,
    /// matching the reference dialer's final `syncfs` before exit).
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for Device {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl AsRawFd for Device {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}
