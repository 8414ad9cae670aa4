//! Askama views for the demo application page.

pub mod views;
