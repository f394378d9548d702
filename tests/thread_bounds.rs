//! Compile-time guards on the thread-safety of values crossing system and
//! command boundaries, and on handles staying plain copyable values.
use do_after::{DoAfterArgs, DoAfterHandle, DoAfterRegistry, DoAfterSnapshot, StartError};
use static_assertions::{assert_impl_all, assert_not_impl_any};

assert_impl_all!(DoAfterArgs: Send, Sync, Clone);
assert_impl_all!(DoAfterRegistry: Send, Sync);
assert_impl_all!(DoAfterHandle: Copy, Eq, std::hash::Hash);
assert_impl_all!(StartError: std::error::Error, Send, Sync);
assert_not_impl_any!(DoAfterSnapshot: Copy);
