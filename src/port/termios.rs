//! termios backed tty device.
//!
//! Talks to the kernel directly through `libc` rather than `serialport`,
//! because `serialport` always puts the line into raw mode and the session
//! relies on the canonical line discipline to delimit response lines.

use super::error::OpenError;
use super::traits::{BaudRate, DeviceOpener, LineSettings, TtyDevice};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Opens device paths as [`TermiosPort`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermiosOpener;

impl DeviceOpener for TermiosOpener {
    type Device = TermiosPort;

    fn open(&self, path: &Path) -> Result<TermiosPort, OpenError> {
        TermiosPort::open(path)
    }
}

/// Saved terminal attributes of a device.
#[derive(Clone, Copy)]
pub struct TermiosSnapshot(libc::termios);

impl fmt::Debug for TermiosSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermiosSnapshot")
            .field("c_iflag", &self.0.c_iflag)
            .field("c_oflag", &self.0.c_oflag)
            .field("c_cflag", &self.0.c_cflag)
            .field("c_lflag", &self.0.c_lflag)
            .finish()
    }
}

/// A tty opened read/write without becoming our controlling terminal.
#[derive(Debug)]
pub struct TermiosPort {
    file: File,
    path: PathBuf,
}

impl TermiosPort {
    /// Open `path` for simultaneous read and write.
    ///
    /// The open itself is non-blocking so a modem line without carrier
    /// cannot hang us; blocking mode is restored right after.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| OpenError::from_io(path, e))?;

        set_blocking(file.as_raw_fd()).map_err(|e| OpenError::from_io(path, e))?;

        debug!(path = %path.display(), "opened tty");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    fn get_attrs(&self) -> io::Result<libc::termios> {
        let mut attrs = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initialises `attrs` when it returns 0.
        cvt(unsafe { libc::tcgetattr(self.fd(), attrs.as_mut_ptr()) })?;
        Ok(unsafe { attrs.assume_init() })
    }

    fn set_attrs(&self, attrs: &libc::termios) -> io::Result<()> {
        // SAFETY: `attrs` is a valid termios borrowed for the call.
        cvt(unsafe { libc::tcsetattr(self.fd(), libc::TCSANOW, attrs) })?;
        Ok(())
    }
}

impl TtyDevice for TermiosPort {
    type Snapshot = TermiosSnapshot;

    fn snapshot(&mut self) -> io::Result<TermiosSnapshot> {
        self.get_attrs().map(TermiosSnapshot)
    }

    fn apply(&mut self, settings: &LineSettings) -> io::Result<()> {
        let mut attrs = self.get_attrs()?;
        let speed = speed_for(settings.baud_rate);

        // SAFETY: `attrs` is an initialised termios owned by this frame.
        unsafe {
            cvt(libc::cfsetispeed(&mut attrs, speed))?;
            cvt(libc::cfsetospeed(&mut attrs, speed))?;
        }

        // 8N1, receiver on, modem lines ignored.
        attrs.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::PARODD | libc::CSTOPB | libc::CRTSCTS);
        attrs.c_cflag |= libc::CLOCAL | libc::CREAD | libc::CS8;

        attrs.c_iflag &= !(libc::INPCK | libc::INLCR | libc::ICRNL | libc::IGNCR | libc::IMAXBEL);
        attrs.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);

        attrs.c_oflag &= !libc::OPOST;

        attrs.c_lflag &= !(libc::ECHO | libc::ECHOE | libc::ECHONL | libc::IEXTEN | libc::ISIG);
        attrs.c_lflag |= libc::ICANON;

        // VMIN/VTIME alias VEOF/VEOL on some systems and are unused in
        // canonical mode, so they are left alone.
        attrs.c_cc[libc::VEOF] = settings.eof_char;
        attrs.c_cc[libc::VEOL] = 0;
        attrs.c_cc[libc::VEOL2] = 0;

        self.set_attrs(&attrs)?;

        // tcsetattr succeeds if *any* change was applied, so read back the speed.
        let written = self.get_attrs()?;
        // SAFETY: `written` is an initialised termios.
        let actual = unsafe { libc::cfgetospeed(&written) };
        if actual != speed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("device rejected {} baud", settings.baud_rate),
            ));
        }
        Ok(())
    }

    fn restore(&mut self, snapshot: &TermiosSnapshot) -> io::Result<()> {
        self.set_attrs(&snapshot.0)
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut pollfd = libc::pollfd {
            fd: self.fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // Round up so we never wake before the budget is spent.
        let millis = timeout.as_nanos().div_ceil(1_000_000).min(i32::MAX as u128) as libc::c_int;

        // SAFETY: one valid pollfd, count 1.
        let ready = unsafe { libc::poll(&mut pollfd, 1, millis) };
        match ready {
            -1 => {
                let err = io::Error::last_os_error();
                // A signal landed mid-wait, the caller's next poll point handles it.
                if err.kind() == io::ErrorKind::Interrupted {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn drain(&mut self) -> io::Result<()> {
        loop {
            // SAFETY: plain fd syscall.
            match cvt(unsafe { libc::tcdrain(self.fd()) }) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other.map(drop),
            }
        }
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.file.read(buffer)
    }
}

fn speed_for(rate: BaudRate) -> libc::speed_t {
    match rate {
        BaudRate::B1200 => libc::B1200,
        BaudRate::B2400 => libc::B2400,
        BaudRate::B4800 => libc::B4800,
        BaudRate::B9600 => libc::B9600,
        BaudRate::B19200 => libc::B19200,
        BaudRate::B38400 => libc::B38400,
        BaudRate::B57600 => libc::B57600,
        BaudRate::B115200 => libc::B115200,
        BaudRate::B230400 => libc::B230400,
    }
}

fn set_blocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own.
    let flags = cvt(unsafe { libc::fcntl(fd, libc::F_GETFL) })?;
    cvt(unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) })?;
    Ok(())
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}
