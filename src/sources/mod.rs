//! Per-backend stream sources.
//!
//! Every backend adapter reduces its native delivery mechanism to one of two
//! production models: [`pull::EventSource`] for backends the consumer drives
//! (buffered JSON chunks, pull sequences, single-shot answers) and
//! [`push::PushSource`] for backends that emit on their own execution context
//! (reader tasks, inference threads).

pub mod pull;
pub mod push;

use crate::Error;

/// One normalized unit of backend output awaiting encoding.
#[derive(Debug)]
pub enum Fragment {
    /// A content fragment's text, extracted from the native payload.
    Content(String),
    /// A terminal condition to report in-band: one `error` event, then close.
    Fault(Error),
    /// Clean end of the backend interaction.
    End,
}
