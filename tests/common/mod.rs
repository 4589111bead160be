#![allow(unused_imports)]

pub use plandag_test_utils::{init_tracing, with_timeout};
