//! # Game Client Library
//!
//! The interactive terminal client for the multiplayer tic-tac-toe
//! game. It keeps one persistent TCP connection to the server and runs
//! two concurrent flows: a listener task that parses server pushes
//! (acknowledgements, board broadcasts, game results) and the input
//! loop that prompts for commands and writes requests.
//!
//! The two flows share only the small [`session::Session`] record. The
//! turn flag inside it is waited on through a notify handle — the
//! input loop blocks until the listener signals a change, it never
//! polls.
//!
//! ## Module Organization
//!
//! - [`session`] — the shared session record and the turn-wait
//!   primitive.
//! - [`network`] — connection setup, the listener task and request
//!   writing.
//! - [`input`] — the interactive command loop and its prompts.
//! - [`ui`] — message display and board rendering.

pub mod input;
pub mod network;
pub mod session;
pub mod ui;
