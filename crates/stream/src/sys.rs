//! Thin libc wrappers used by the raw stream
//!
//! Every call goes straight to the descriptor, the same way the runtime's
//! stdout path bypasses std's buffered handles. Errors are captured from
//! `errno` immediately after the failing call.

use crate::error::IoError;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Permission bits for newly created files (before umask)
const CREATE_MODE: libc::c_uint = 0o666;

pub fn open(path: &Path, flags: libc::c_int) -> Result<RawFd, IoError> {
    let c_path =
        CString::new(path.as_os_str().as_bytes()).map_err(|_| IoError::Os(libc::EINVAL))?;
    loop {
        let fd = unsafe { libc::open(c_path.as_ptr(), flags | libc::O_CLOEXEC, CREATE_MODE) };
        if fd >= 0 {
            return Ok(fd);
        }
        let err = IoError::last_os_error();
        if err != IoError::Os(libc::EINTR) {
            return Err(err);
        }
    }
}

pub fn read(fd: RawFd, buf: &mut [u8]) -> Result<usize, IoError> {
    loop {
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = IoError::last_os_error();
        if err != IoError::Os(libc::EINTR) {
            return Err(err);
        }
    }
}

pub fn write(fd: RawFd, data: &[u8]) -> Result<usize, IoError> {
    loop {
        let n = unsafe { libc::write(fd, data.as_ptr() as *const libc::c_void, data.len()) };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = IoError::last_os_error();
        if err != IoError::Os(libc::EINTR) {
            return Err(err);
        }
    }
}

/// Absolute reposition; returns the new 0-based offset
pub fn seek_to(fd: RawFd, offset: u64) -> Result<u64, IoError> {
    let result = unsafe { libc::lseek(fd, offset as libc::off_t, libc::SEEK_SET) };
    if result < 0 {
        Err(IoError::last_os_error())
    } else {
        Ok(result as u64)
    }
}

/// Where the OS currently has the descriptor positioned
pub fn current_offset(fd: RawFd) -> Result<u64, IoError> {
    let result = unsafe { libc::lseek(fd, 0, libc::SEEK_CUR) };
    if result < 0 {
        Err(IoError::last_os_error())
    } else {
        Ok(result as u64)
    }
}

pub fn close(fd: RawFd) -> Result<(), IoError> {
    if unsafe { libc::close(fd) } == 0 {
        Ok(())
    } else {
        Err(IoError::last_os_error())
    }
}

/// What kind of object a descriptor or path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    CharDevice,
    BlockDevice,
    Pipe,
    Socket,
    Other,
}

impl FileKind {
    fn from_mode(mode: libc::mode_t) -> Self {
        match mode & libc::S_IFMT {
            libc::S_IFREG => FileKind::Regular,
            libc::S_IFDIR => FileKind::Directory,
            libc::S_IFCHR => FileKind::CharDevice,
            libc::S_IFBLK => FileKind::BlockDevice,
            libc::S_IFIFO => FileKind::Pipe,
            libc::S_IFSOCK => FileKind::Socket,
            _ => FileKind::Other,
        }
    }
}

/// The parts of `fstat` the stream layers care about
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub kind: FileKind,
    pub size: u64,
    pub modified: i64,
}

pub fn fstat(fd: RawFd) -> Result<FileStat, IoError> {
    let mut st = std::mem::MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd, st.as_mut_ptr()) } != 0 {
        return Err(IoError::last_os_error());
    }
    let st = unsafe { st.assume_init() };
    Ok(FileStat {
        kind: FileKind::from_mode(st.st_mode),
        size: st.st_size.max(0) as u64,
        modified: st.st_mtime as i64,
    })
}

pub fn isatty(fd: RawFd) -> bool {
    unsafe { libc::isatty(fd) == 1 }
}

/// Readable/writeable as granted by the descriptor's open flags
pub fn access_mode(fd: RawFd) -> Result<(bool, bool), IoError> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(IoError::last_os_error());
    }
    Ok(match flags & libc::O_ACCMODE {
        libc::O_RDONLY => (true, false),
        libc::O_WRONLY => (false, true),
        _ => (true, true),
    })
}

/// Broken-down local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

pub fn local_time(epoch_seconds: i64) -> Option<LocalTime> {
    let t = epoch_seconds as libc::time_t;
    let mut tm = std::mem::MaybeUninit::<libc::tm>::uninit();
    let result = unsafe { libc::localtime_r(&t, tm.as_mut_ptr()) };
    if result.is_null() {
        return None;
    }
    let tm = unsafe { tm.assume_init() };
    Some(LocalTime {
        year: tm.tm_year + 1900,
        month: (tm.tm_mon + 1) as u32,
        day: tm.tm_mday as u32,
        hour: tm.tm_hour as u32,
        minute: tm.tm_min as u32,
        second: tm.tm_sec as u32,
    })
}
