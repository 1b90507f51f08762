// Library crate: everything that runs without a window, exposed for the binary and tests.
// The eframe app, panels and GL renderer live in the binary crate.

pub mod assets;
pub mod data;
pub mod error;
pub mod guides;
pub mod harness;
pub mod render_loop;
pub mod scene;
pub mod state;
