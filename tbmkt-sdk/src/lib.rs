//! Wire-level objects for the token-bound position marketplace.
//!
//! These types define the JSON shapes exchanged with the marketplace
//! server: order creation requests and responses, cancellation
//! selectors, and the webhook event payloads delivered by the chain
//! event stream. Server and core share them so the HTTP surface and
//! the lifecycle engine never drift apart.

pub mod objects;
