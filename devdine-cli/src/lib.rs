#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![deny(unreachable_pub)]

//! devdine-cli

pub mod cli;
pub mod client;
pub mod logging;
pub mod paths;
pub mod session;
pub mod settings;
