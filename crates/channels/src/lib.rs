//! Channel-agnostic reply delivery.
//!
//! A reply produced by the conversation service is a single fragment or an
//! ordered list of fragments (text, attachments, pauses). Each channel crate
//! (Slack, Facebook) supplies a [`FragmentShaper`] that turns fragments into
//! post parameters, and a [`PostAdapter`] that performs one delivery. The
//! [`Dispatcher`] walks the fragments strictly in order and stops at the
//! first failed post.

pub mod adapter;
pub mod dispatch;
pub mod error;
pub mod fragment;
pub mod invoker;
pub mod outcome;

pub use {
    adapter::PostAdapter,
    dispatch::{Dispatcher, FragmentShaper, Step},
    error::{Error, Result},
    fragment::{Fragment, ReplyMessage, ReplyPayload},
    invoker::HostInvoker,
    outcome::{Attempt, DeliveryError, DispatchLog, PostFailure, PostOutcome, PostSuccess},
};
