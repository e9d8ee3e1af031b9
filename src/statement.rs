use crate::{CBox, Connection, Error, Result, error_message_from_ptr};
use libsqlite3_sys::*;
use std::{
    ffi::{CString, c_char, c_int, c_void},
    ptr, slice,
    sync::Arc,
};

/// Where a valid statement stands in its step cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepState {
    Ready,
    RowAvailable,
    Done,
}

/// A statement compiled against one [`Connection`].
///
/// Compilation outcome is fixed at construction and observable through
/// [`is_valid`](Statement::is_valid); an invalid statement never contacts
/// the engine, every operation on it short-circuits. Valid statements are
/// driven with [`execute`](Statement::execute) or
/// [`next_row`](Statement::next_row) and finalize their native handle on
/// drop.
///
/// Like [`Connection`], this type is single-thread affine (`!Send`/`!Sync`).
pub struct Statement {
    statement: CBox<*mut sqlite3_stmt>,
    /// Keeps the engine connection handle open until this statement is gone.
    connection: Arc<CBox<*mut sqlite3>>,
    valid: bool,
    state: StepState,
}

impl Statement {
    pub(crate) fn new(connection: &Connection, sql: &str) -> Statement {
        let handle = connection.handle.clone();
        let mut statement = CBox::new(ptr::null_mut(), finalize_handle);
        let mut valid = false;
        if connection.is_ready() {
            match CString::new(sql.as_bytes()) {
                Ok(c_sql) => {
                    let rc = unsafe {
                        sqlite3_prepare_v2(
                            **handle,
                            c_sql.as_ptr(),
                            sql.len() as c_int,
                            &mut *statement,
                            ptr::null_mut(),
                        )
                    };
                    if rc != SQLITE_OK {
                        let message = unsafe { sqlite3_errmsg(**handle) };
                        let error = Error::Prepare {
                            message: error_message_from_ptr(&message).to_string(),
                        };
                        log::error!("{}", error);
                    }
                    // Whitespace or empty SQL compiles OK to no statement at
                    // all; treat that as invalid rather than stepping null.
                    valid = rc == SQLITE_OK && !statement.is_null();
                }
                Err(_) => {
                    log::error!("statement text contains an interior NUL");
                }
            }
        }
        Self {
            statement,
            connection: handle,
            valid,
            state: StepState::Ready,
        }
    }

    /// True iff compilation against the connection succeeded. Fixed at
    /// construction.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Runs a statement that produces no result rows (DDL, or DML without a
    /// RETURNING set).
    ///
    /// `Ok(())` iff the engine reports unambiguous completion. A statement
    /// that unexpectedly yields a row errs with [`Error::StepMismatch`]: the
    /// caller wanted [`next_row`](Statement::next_row).
    pub fn execute(&mut self) -> Result<()> {
        if !self.valid {
            return Err(Error::StatementInvalid);
        }
        loop {
            match unsafe { sqlite3_step(*self.statement) } {
                SQLITE_BUSY => continue,
                SQLITE_DONE => {
                    self.state = StepState::Done;
                    return Ok(());
                }
                SQLITE_ROW => {
                    self.state = StepState::RowAvailable;
                    return Err(Error::StepMismatch);
                }
                _ => {
                    self.state = StepState::Done;
                    return Err(self.step_error());
                }
            }
        }
    }

    /// Advances to the next result row. `Ok(true)` iff a row is now
    /// available for the column accessors; `Ok(false)` once the result set
    /// is exhausted, and on every call after that.
    pub fn next_row(&mut self) -> Result<bool> {
        if !self.valid {
            return Err(Error::StatementInvalid);
        }
        if self.state == StepState::Done {
            return Ok(false);
        }
        loop {
            match unsafe { sqlite3_step(*self.statement) } {
                SQLITE_BUSY => continue,
                SQLITE_ROW => {
                    self.state = StepState::RowAvailable;
                    return Ok(true);
                }
                SQLITE_DONE => {
                    self.state = StepState::Done;
                    return Ok(false);
                }
                _ => {
                    self.state = StepState::Done;
                    return Err(self.step_error());
                }
            }
        }
    }

    /// Text value of column `index` (zero-based) in the current row, copied
    /// into an owned `String`. `None` on an invalid statement or a NULL
    /// column.
    ///
    /// The engine coerces other storage classes to text, and a blob column
    /// can carry bytes that are not UTF-8; those are replaced rather than
    /// handed out as-is.
    pub fn text_at(&self, index: i32) -> Option<String> {
        if !self.valid {
            return None;
        }
        unsafe {
            let ptr = sqlite3_column_text(*self.statement, index as c_int);
            if ptr.is_null() {
                return None;
            }
            let len = sqlite3_column_bytes(*self.statement, index as c_int) as usize;
            Some(String::from_utf8_lossy(slice::from_raw_parts(ptr, len)).into_owned())
        }
    }

    /// Integer value of column `index`, `0` on an invalid statement. The
    /// engine coerces other storage classes per its documented rules.
    pub fn int_at(&self, index: i32) -> i64 {
        if !self.valid {
            return 0;
        }
        unsafe { sqlite3_column_int64(*self.statement, index as c_int) }
    }

    /// Floating-point value of column `index`, `0.0` on an invalid
    /// statement.
    pub fn double_at(&self, index: i32) -> f64 {
        if !self.valid {
            return 0.0;
        }
        unsafe { sqlite3_column_double(*self.statement, index as c_int) }
    }

    /// Blob value of column `index`, copied byte-exact at the reported
    /// length.
    ///
    /// Returns `None` on an invalid statement, a NULL column, or a
    /// zero-length blob. The last case is an ambiguity inherited from the
    /// engine interface: an empty blob and an absent value are not
    /// distinguished here.
    pub fn blob_at(&self, index: i32) -> Option<Vec<u8>> {
        if !self.valid {
            return None;
        }
        unsafe {
            let ptr = sqlite3_column_blob(*self.statement, index as c_int) as *const u8;
            let len = sqlite3_column_bytes(*self.statement, index as c_int);
            if ptr.is_null() || len <= 0 {
                return None;
            }
            Some(slice::from_raw_parts(ptr, len as usize).to_vec())
        }
    }

    /// Binds a text value at parameter `index` (1-based, engine
    /// convention). The bytes are copied into engine-owned storage, so the
    /// caller's string may go away immediately.
    pub fn bind_text(&mut self, index: i32, value: &str) -> Result<()> {
        if !self.valid {
            return Err(Error::StatementInvalid);
        }
        let rc = unsafe {
            sqlite3_bind_text(
                *self.statement,
                index as c_int,
                value.as_ptr() as *const c_char,
                value.len() as c_int,
                SQLITE_TRANSIENT(),
            )
        };
        self.bind_outcome(rc, index)
    }

    /// Binds an integer value at parameter `index` (1-based).
    pub fn bind_int(&mut self, index: i32, value: i64) -> Result<()> {
        if !self.valid {
            return Err(Error::StatementInvalid);
        }
        let rc = unsafe { sqlite3_bind_int64(*self.statement, index as c_int, value) };
        self.bind_outcome(rc, index)
    }

    /// Binds a floating-point value at parameter `index` (1-based).
    pub fn bind_double(&mut self, index: i32, value: f64) -> Result<()> {
        if !self.valid {
            return Err(Error::StatementInvalid);
        }
        let rc = unsafe { sqlite3_bind_double(*self.statement, index as c_int, value) };
        self.bind_outcome(rc, index)
    }

    /// Binds a blob value at parameter `index` (1-based). Copied into
    /// engine-owned storage, like [`bind_text`](Statement::bind_text).
    pub fn bind_blob(&mut self, index: i32, value: &[u8]) -> Result<()> {
        if !self.valid {
            return Err(Error::StatementInvalid);
        }
        let rc = unsafe {
            sqlite3_bind_blob(
                *self.statement,
                index as c_int,
                value.as_ptr() as *const c_void,
                value.len() as c_int,
                SQLITE_TRANSIENT(),
            )
        };
        self.bind_outcome(rc, index)
    }

    fn bind_outcome(&self, rc: c_int, index: i32) -> Result<()> {
        if rc == SQLITE_OK {
            return Ok(());
        }
        let message = unsafe { sqlite3_errmsg(**self.connection) };
        let error = Error::Bind {
            index,
            message: error_message_from_ptr(&message).to_string(),
        };
        log::error!("{}", error);
        Err(error)
    }

    fn step_error(&self) -> Error {
        let message = unsafe { sqlite3_errmsg(**self.connection) };
        let error = Error::Step {
            message: error_message_from_ptr(&message).to_string(),
        };
        log::error!("{}", error);
        error
    }
}

fn finalize_handle(p: *mut sqlite3_stmt) {
    unsafe {
        sqlite3_finalize(p);
    }
}
