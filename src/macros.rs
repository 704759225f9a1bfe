#![allow(unused_macros)]

/// Pulls the listed items out of the platform backend that is compiled for the current target.
macro_rules! impmod {
    ($($osmod:ident)::+, $($orig:ident $(as $into:ident)?),* $(,)?) => {
        #[cfg(unix)]
        pub(crate) use $crate::os::unix::$($osmod)::+::{$($orig $(as $into)?,)*};
        #[cfg(windows)]
        pub(crate) use $crate::os::windows::$($osmod)::+::{$($orig $(as $into)?,)*};
    };
}

macro_rules! ok_or_errno {
    ($success:expr => $($scb:tt)+) => {
        if $success {
            Ok($($scb)+)
        } else {
            Err(::std::io::Error::last_os_error())
        }
    };
}

macro_rules! builder_must_use {
    () => {
        "builder setters take the entire structure and return the result"
    };
}

macro_rules! builder_setters {
    ($(#[doc = $($doc:tt)+])* $name:ident : $ty:ty $(, $($tt:tt)*)?) => {
        $(#[doc = $($doc)+])*
        #[must_use = builder_must_use!()]
        #[inline(always)]
        pub fn $name(mut self, $name: $ty) -> Self {
            self.$name = $name;
            self
        }
        $(builder_setters!($($tt)*);)?
    };
    () => {};
}

/// Forwards the raw socket accessor of a type to one of its fields, which must itself implement
/// `AsRawFd`/`AsRawSocket`.
macro_rules! forward_as_raw_socket {
    (@impl $ty:ty, $trt:ident, $mtd:ident, $hty:ident, $cfg:ident, $($field:tt).+) => {
        #[cfg($cfg)]
        impl ::std::os::$cfg::io::$trt for $ty {
            #[inline]
            fn $mtd(&self) -> ::std::os::$cfg::io::$hty {
                ::std::os::$cfg::io::$trt::$mtd(&self.$($field).+)
            }
        }
    };
    ($ty:ty, $($field:tt).+) => {
        forward_as_raw_socket!(@impl $ty, AsRawFd, as_raw_fd, RawFd, unix, $($field).+);
        forward_as_raw_socket!(
            @impl $ty, AsRawSocket, as_raw_socket, RawSocket, windows, $($field).+
        );
    };
}
