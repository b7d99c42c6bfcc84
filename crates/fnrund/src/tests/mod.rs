//! Behavioural suites and shared test doubles.

mod http_behaviour;
pub(crate) mod support;
