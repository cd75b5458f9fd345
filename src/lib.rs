//! runcell: a sandboxed execution engine for untrusted code snippets.
//!
//! Submitted source is statically vetted against a capability policy and a
//! library whitelist, then dispatched into a pooled, resource-bounded
//! Docker container. Output, produced files and a typed completion status
//! come back; the context is scrubbed before it serves anyone else.
//!
//! The [`sandbox`] module is the core. [`cli`], [`config`] and
//! [`observability`] are the surrounding service plumbing.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod sandbox;
