//! Cookbook - A recipe-sharing REST backend
//!
//! Authors register, obtain JWT tokens and publish recipes with categories
//! and tags. Everyone can browse the published recipes.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
