//! HTTP 핸들러

pub mod admin;
pub mod health;
pub mod rest;
