//! Vector whiteboard engine for boards embedded in a collaborative document.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! full lifecycle of an embedded board: the z-ordered scene of shapes, the
//! pan/zoom view, pointer and keyboard interaction with undoable commands,
//! canvas rendering, in-place text editing, anchored comments, merging of
//! remote edits and throttled snapshot persistence. The host document editor
//! wires DOM events to the [`engine`] and carries out the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::Engine`] and the browser-free [`engine::EngineCore`] |
//! | [`doc`] | Board object, style and patch types |
//! | [`scene`] | Z-ordered object store with change events |
//! | [`camera`] | Geometry and the pan/zoom view transform |
//! | [`input`] | Tools, input events, selection and gesture state |
//! | [`controller`] | Input state machine producing commands |
//! | [`hit`] | Hit-testing and resize handle geometry |
//! | [`history`] | Reversible commands and the bounded undo/redo stack |
//! | [`render`] | Scene, selection and presence drawing |
//! | [`surface`] | Drawing target trait |
//! | [`text_edit`] | Text editing session and overlay trait |
//! | [`comments`] | Anchored comments |
//! | [`collab`] | Remote ops, presence and the transport trait |
//! | [`snapshot`] | Persisted board format |
//! | [`embed`] | Host embed size and save throttling |
//! | [`web`] | Browser implementations of the platform traits |
//! | [`config`] | Engine configuration |
//! | [`notify`] | Listener lists |
//! | [`error`] | Error types |
//! | [`consts`] | Shared numeric constants (zoom limits, minimum sizes, etc.) |

pub mod camera;
pub mod collab;
pub mod comments;
pub mod config;
pub mod consts;
pub mod controller;
pub mod doc;
pub mod embed;
pub mod engine;
pub mod error;
pub mod hit;
pub mod history;
pub mod input;
pub mod notify;
pub mod render;
pub mod scene;
pub mod snapshot;
pub mod surface;
pub mod text_edit;
pub mod web;
