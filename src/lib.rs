//! Exercise Blog - an exercise catalog with moderated comments
//!
//! This library provides the storage, services, staff admin and
//! server-rendered web layer of the exercise blog.

pub mod admin;
pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;
