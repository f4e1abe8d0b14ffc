//! Concrete gateway integrations. Each integration contributes a receiver + interpreter pair for one webhook source.
pub mod stripe;
