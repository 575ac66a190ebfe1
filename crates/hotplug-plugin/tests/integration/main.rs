//! Integration tests driving the full plugin manager over a temporary root.

mod gating_test;
mod helpers;
mod lifecycle_test;
mod reload_test;
mod routing_test;
