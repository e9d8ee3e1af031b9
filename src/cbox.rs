use std::ops::{Deref, DerefMut};

pub(crate) trait NullCheck {
    fn is_null(&self) -> bool;
}

impl<T> NullCheck for *mut T {
    fn is_null(&self) -> bool {
        (*self as *const T).is_null()
    }
}

/// Owns an engine-allocated pointer and releases it through `dealloc` exactly
/// once, only if it was actually acquired.
#[derive(Debug)]
pub(crate) struct CBox<T: NullCheck> {
    ptr: T,
    dealloc: fn(T),
}

impl<T: NullCheck> CBox<T> {
    pub fn new(ptr: T, dealloc: fn(T)) -> Self {
        Self { ptr, dealloc }
    }
}

impl<T: NullCheck> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                (self.dealloc)(std::ptr::read(&self.ptr as *const T));
            }
        }
    }
}

impl<T: NullCheck> Deref for CBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T: NullCheck> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

#[cfg(test)]
mod tests {
    use crate::cbox::CBox;
    use std::{
        ptr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn releases_acquired_pointer_exactly_once() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        {
            let b = CBox::new(ptr::null_mut::<i32>(), |_| {
                RELEASED.fetch_add(1, Ordering::SeqCst);
            });
            assert!(b.is_null());
        }
        assert_eq!(RELEASED.load(Ordering::SeqCst), 0);
        let v = Box::into_raw(Box::new(123_i32));
        {
            let b = CBox::new(v, |p| {
                RELEASED.fetch_add(1, Ordering::SeqCst);
                unsafe { drop(Box::from_raw(p)) };
            });
            assert_eq!(unsafe { **b }, 123);
            assert_eq!(RELEASED.load(Ordering::SeqCst), 0);
        }
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
    }
}
