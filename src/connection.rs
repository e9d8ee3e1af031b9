use crate::{CBox, Error, Statement, error_message_from_ptr};
use libsqlite3_sys::{
    SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE, sqlite3, sqlite3_close, sqlite3_errmsg,
    sqlite3_last_insert_rowid, sqlite3_open_v2,
};
use std::{ffi::CString, path::Path, ptr, sync::Arc};

/// A single connection to the embedded engine.
///
/// Opening never fails loudly: the constructor always returns a `Connection`
/// and records the outcome in [`is_ready`](Connection::is_ready). A
/// connection that is not ready never contacts the engine again; everything
/// derived from it degrades to its own sentinel.
///
/// The native handle is shared with every [`Statement`] compiled from this
/// connection and is closed when the last holder drops, so a statement that
/// outlives its connection stays usable.
///
/// The type holds a raw engine pointer and is not `Send` or `Sync`; use it
/// from one thread, or add synchronization outside.
pub struct Connection {
    pub(crate) handle: Arc<CBox<*mut sqlite3>>,
    ready: bool,
}

impl Connection {
    /// Opens (creating if missing) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Connection {
        let path = path.as_ref();
        let mut handle = CBox::new(ptr::null_mut(), close_handle);
        let Ok(c_path) = CString::new(path.to_string_lossy().as_bytes()) else {
            log::error!("database path `{}` contains an interior NUL", path.display());
            return Self {
                handle: Arc::new(handle),
                ready: false,
            };
        };
        let rc = unsafe {
            sqlite3_open_v2(
                c_path.as_ptr(),
                &mut *handle,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                ptr::null(),
            )
        };
        let ready = rc == SQLITE_OK;
        if !ready {
            // The engine allocates a handle even on failure, to carry the
            // error message. Read it, then release the handle right away.
            let message = if handle.is_null() {
                "out of memory".into()
            } else {
                let message = unsafe { sqlite3_errmsg(*handle) };
                error_message_from_ptr(&message).to_string()
            };
            let error = Error::Open {
                path: path.display().to_string(),
                message,
            };
            log::error!("{}", error);
            handle = CBox::new(ptr::null_mut(), close_handle);
        }
        Self {
            handle: Arc::new(handle),
            ready,
        }
    }

    /// True iff the native handle was acquired. Fixed at construction, never
    /// becomes true later.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Rowid assigned by the most recent successful insert on this
    /// connection, or `-1` when the connection is not ready.
    pub fn last_insert_row_id(&self) -> i64 {
        if !self.ready {
            return -1;
        }
        unsafe { sqlite3_last_insert_rowid(**self.handle) }
    }

    /// Compiles `sql` against this connection. Always returns a statement;
    /// check [`Statement::is_valid`] before driving it.
    pub fn prepare_statement(&self, sql: &str) -> Statement {
        Statement::new(self, sql)
    }
}

fn close_handle(p: *mut sqlite3) {
    unsafe {
        sqlite3_close(p);
    }
}
