//! Demonstration logic.
//!
//! Services sequence statements across connections and narrate the results.
//! They are kept separate from connection handling and from the driver in `main`.

pub mod isolation_service;
