//! Output buffers the session copies results into.
//!
//! The production buffer is a POSIX shared memory object that an external
//! reader maps by name. A `SUCCESS` response is the only signal that the
//! buffer holds a complete copy; there is no other synchronization.

use crate::error::CommandError;

/// Source of output buffers for a session
pub trait BufferProvider {
    /// Buffer type; dropping it releases the buffer
    type Buffer: AsRef<[u8]> + AsMut<[u8]>;

    /// Allocate a zero-filled buffer of `size` bytes
    fn create(&mut self, size: usize) -> Result<Self::Buffer, CommandError>;
}

/// Process-private buffers, for embedding and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapProvider;

impl BufferProvider for HeapProvider {
    type Buffer = Vec<u8>;

    fn create(&mut self, size: usize) -> Result<Vec<u8>, CommandError> {
        Ok(vec![0; size])
    }
}

#[cfg(unix)]
pub use platform::{ShmBuffer, ShmProvider};

#[cfg(unix)]
mod platform {
    use super::BufferProvider;
    use crate::error::CommandError;
    use libc::{MAP_SHARED, O_CREAT, O_RDWR, PROT_READ, PROT_WRITE};
    use libc::{c_uint, c_void, mode_t, off_t};
    use libc::{close, ftruncate, mmap, munmap, shm_open, shm_unlink};
    use std::ffi::CString;
    use std::os::unix::io::RawFd;
    use std::{io, ptr, slice};
    use tracing::debug;

    /// Permissions of the shared memory object
    const SHM_MODE: mode_t = 0o664;

    /// Creates named POSIX shared memory buffers
    #[derive(Debug, Clone)]
    pub struct ShmProvider {
        name: String,
    }

    impl ShmProvider {
        /// Provider for buffers named `name` (e.g. `/yTJuDV`)
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }

        /// Shared memory name
        pub fn name(&self) -> &str {
            &self.name
        }
    }

    impl BufferProvider for ShmProvider {
        type Buffer = ShmBuffer;

        fn create(&mut self, size: usize) -> Result<ShmBuffer, CommandError> {
            ShmBuffer::create(&self.name, size)
        }
    }

    /// A mapped shared memory object, unmapped, closed and unlinked on drop
    pub struct ShmBuffer {
        fd: RawFd,
        ptr: *mut c_void,
        size: usize,
        name: CString,
    }

    impl std::fmt::Debug for ShmBuffer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ShmBuffer")
                .field("name", &self.name)
                .field("size", &self.size)
                .finish_non_exhaustive()
        }
    }

    impl ShmBuffer {
        /// Create (or reuse) the object `name`, size it to `size` bytes and
        /// map it read-write
        #[allow(unsafe_code)]
        pub fn create(name: &str, size: usize) -> Result<Self, CommandError> {
            let c_name = CString::new(name).map_err(|e| {
                CommandError::io(
                    format!("invalid shm name {name:?}"),
                    io::Error::new(io::ErrorKind::InvalidInput, e),
                )
            })?;
            let len = off_t::try_from(size).map_err(|_| {
                CommandError::io(
                    format!("shm size {size}"),
                    io::Error::from(io::ErrorKind::InvalidInput),
                )
            })?;

            let fd = unsafe { shm_open(c_name.as_ptr(), O_CREAT | O_RDWR, SHM_MODE as c_uint) };
            if fd == -1 {
                return Err(CommandError::io(
                    format!("shm_open failed for {name}"),
                    io::Error::last_os_error(),
                ));
            }

            // Truncating to zero first clears any content left in a reused object.
            if unsafe { ftruncate(fd, 0) } == -1 || unsafe { ftruncate(fd, len) } == -1 {
                let err = io::Error::last_os_error();
                unsafe {
                    close(fd);
                    shm_unlink(c_name.as_ptr());
                }
                return Err(CommandError::io(format!("ftruncate failed for {name}"), err));
            }

            let ptr = unsafe {
                mmap(
                    ptr::null_mut(),
                    size,
                    PROT_READ | PROT_WRITE,
                    MAP_SHARED,
                    fd,
                    0,
                )
            };
            if ptr == libc::MAP_FAILED {
                let err = io::Error::last_os_error();
                unsafe {
                    close(fd);
                    shm_unlink(c_name.as_ptr());
                }
                return Err(CommandError::io(format!("mmap failed for {name}"), err));
            }

            debug!(name, size, "Created shared memory buffer");
            Ok(Self {
                fd,
                ptr,
                size,
                name: c_name,
            })
        }

        /// Size of the mapped region
        pub const fn size(&self) -> usize {
            self.size
        }
    }

    impl AsRef<[u8]> for ShmBuffer {
        #[allow(unsafe_code)]
        fn as_ref(&self) -> &[u8] {
            unsafe { slice::from_raw_parts(self.ptr.cast::<u8>(), self.size) }
        }
    }

    impl AsMut<[u8]> for ShmBuffer {
        #[allow(unsafe_code)]
        fn as_mut(&mut self) -> &mut [u8] {
            unsafe { slice::from_raw_parts_mut(self.ptr.cast::<u8>(), self.size) }
        }
    }

    impl Drop for ShmBuffer {
        #[allow(unsafe_code)]
        fn drop(&mut self) {
            unsafe {
                munmap(self.ptr, self.size);
                close(self.fd);
                shm_unlink(self.name.as_ptr());
            }
            debug!(name = ?self.name, "Released shared memory buffer");
        }
    }

}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_provider() {
        let mut provider = HeapProvider;
        let buffer = provider.create(8).expect("heap buffer");
        assert_eq!(buffer, vec![0; 8]);
    }
}
