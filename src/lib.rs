//! notewell: short text notes with AI summaries and live updates.
//!
//! The client side is [`store::NoteStore`] (the collection, kept in sync with
//! push events) and [`form::NoteForm`] (create/edit lifecycle). Both talk to a
//! [`remote::RemoteDataService`]. The rest of the crate is a reference
//! backend for that service: [`db`], [`service`], [`bus`], [`summarize`] and
//! the HTTP [`api`].

pub mod api;
pub mod bus;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod mapper;
pub mod models;
pub mod remote;
pub mod service;
pub mod store;
pub mod summarize;
pub mod ui;

pub use error::AppError;
