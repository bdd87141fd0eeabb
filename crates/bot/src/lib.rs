//! Boutique chat bot library.
//!
//! A chat front end for the storefront. It mirrors the active catalog,
//! points customers at the web shop for cart and checkout, and lets
//! administrators compose broadcasts. Updates arrive on a webhook as
//! transport-neutral [`update::ChatUpdate`] values.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod routes;
pub mod session;
pub mod state;
pub mod update;
