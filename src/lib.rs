//! Infinite-canvas reference board engine.
//!
//! Cards (images, text, shapes) sit on a pannable, zoomable canvas and can be
//! grouped, connected with curved arrows, and undone or redone. The engine
//! compiles to WebAssembly and runs in the browser: the host wires DOM events
//! into [`engine::Engine`], decodes images it is asked for, and hands save
//! jobs to the [`persist`] worker. Everything except the canvas painter runs
//! natively, so the whole gesture and document model is unit-tested without
//! a browser.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Scene store: cards, groups, connections |
//! | [`camera`] | Pan/zoom camera, points, rects and coordinate conversions |
//! | [`input`] | Tools, modifiers and the gesture state machine |
//! | [`hit`] | Hit-testing and resize-handle geometry |
//! | [`selection`] | Selection set and marquee targets |
//! | [`group`] | Group and ungroup operations |
//! | [`connect`] | Anchor resolution and connection curves |
//! | [`snap`] | Alignment snapping during drags |
//! | [`history`] | Undo/redo entries and the bounded history stack |
//! | [`text`] | Word wrapping and auto-height for text cards |
//! | [`cull`] | Viewport culling and image texture lifecycle |
//! | [`minimap`] | Minimap projection and navigation |
//! | [`render`] | Draw-list construction and redraw coalescing |
//! | [`paint`] | Canvas2D painter for draw lists |
//! | [`persist`] | Board document, autosave debounce and the save worker |
//! | [`config`] | Runtime configuration from the environment |
//! | [`consts`] | Shared numeric constants (zoom limits, sizes, thresholds) |

pub mod camera;
pub mod config;
pub mod connect;
pub mod consts;
pub mod cull;
pub mod doc;
pub mod engine;
pub mod group;
pub mod history;
pub mod hit;
pub mod input;
pub mod minimap;
pub mod paint;
pub mod persist;
pub mod render;
pub mod selection;
pub mod snap;
pub mod text;
