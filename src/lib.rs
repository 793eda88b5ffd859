//! CityTwin - a city ecosystem dashboard.
//!
//! # Overview
//!
//! CityTwin asks an analysis backend about a city and presents the answer:
//! a map of categorized report markers, panels summarizing government sensor
//! data and citizen reports, and an assistant chat that relays questions to
//! the backend.
//!
//! The backend owns aggregation and inference. This crate owns presentation:
//! how a report becomes a marker, and how a session's transcript evolves.
//!
//! # Modules
//!
//! - [`model`]: Wire types for payloads, reports and chat messages
//! - [`marker`]: Report to marker color, label and icon
//! - [`client`]: Backend client trait and its HTTP implementation
//! - [`session`]: Per-city session state and transcript
//! - [`map`]: Camera handling and the marker scene
//! - [`dashboard`]: Side panels and the dashboard snapshot
//! - [`selector`]: Landing page city selection
//! - [`api`]: HTTP handlers
//! - [`config`]: Environment configuration

pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod map;
pub mod marker;
pub mod model;
pub mod selector;
pub mod session;
