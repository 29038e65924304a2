//! Behavioural test suites for the decoder.

mod dispatch_behaviour;
mod policies_behaviour;
mod summary_behaviour;
mod support;
