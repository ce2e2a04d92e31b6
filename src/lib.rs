//! stationmap: hierarchical station notes on an always-acyclic forest
//!
//! Layers, innermost first: `domain` (forest, cycle check, palette),
//! `application` (services, undo, session), `layout` (force simulation),
//! `infrastructure` (document store, wiring), `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod layout;
pub mod util;
