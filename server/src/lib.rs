//! Event Desk API: buildings, events and organizer accounts.
//!
//! Organizers register, wait for an admin to approve them, and then log in
//! for a bearer token that lets them publish events. See [`directory`] for
//! that workflow; everything else is plain CRUD over [`store`].

pub mod auth;
pub mod config;
pub mod directory;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
