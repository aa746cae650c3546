//! HTTP surface for the recommender: `POST /recommend` and `GET /health`.

pub mod rest;

pub use rest::{AppState, RestApi};
