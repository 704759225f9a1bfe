//! Native socket backends. Exactly one of them is compiled, and everything else in the crate
//! reaches it through [`crate::sys`].

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(windows)]
pub(crate) mod windows;
