//! HTTP handlers for pages, navigation and authentication.

pub mod auth;
pub mod nav;
pub mod pages;
