//! # Game Server Library
//!
//! The authoritative server for the multiplayer tic-tac-toe game.
//! Clients hold one persistent TCP connection each and speak the
//! line-delimited protocol from the `shared` crate: they authenticate,
//! create or join rooms, and exchange moves; the server referees turn
//! order, detects terminal boards and broadcasts state to everyone
//! watching a room.
//!
//! ## Architecture
//!
//! All mutable state — the connection table, the room registry and the
//! user store — is owned by a single event-loop task. Per-connection
//! reader and writer tasks do nothing but move bytes; every parsed
//! line funnels through one channel into the loop, which executes each
//! command to completion before touching the next. One logical
//! operation runs at a time, so no locking discipline is needed around
//! rooms or credentials, and messages from a single connection are
//! always handled in the order they arrived.
//!
//! ## Module Organization
//!
//! - [`config`] — the JSON configuration file (port, user store path)
//!   with per-failure diagnostics.
//! - [`users`] — the persisted user store; bcrypt digests, rewritten
//!   in full on every registration.
//! - [`connection`] — one record per live socket: identity, outbound
//!   queue and the authentication gate.
//! - [`rooms`] — the room registry: naming rules, the 256-room cap,
//!   seats, viewers and lifecycle.
//! - [`game`] — the per-room state machine: move validation, win and
//!   draw detection, the out-of-turn move queue.
//! - [`network`] — the TCP multiplexer and command dispatch tying the
//!   rest together.

pub mod config;
pub mod connection;
pub mod game;
pub mod network;
pub mod rooms;
pub mod users;
