//! Clients domain module.
//!
//! A client is a customer of an account. Invoices reference clients; clients
//! never reference invoices. Pure validation and state, no IO.

pub mod client;

pub use client::{Client, ClientDetails};
