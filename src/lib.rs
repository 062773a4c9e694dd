// src/lib.rs
pub mod activity;
pub mod calendar;
pub mod cloud_handler;
pub mod columns;
pub mod config;
pub mod csv_handler;
pub mod data_types;
pub mod dates;
pub mod error;
pub mod rows;
pub mod server;
pub mod sheet_source;
pub mod webhook;
