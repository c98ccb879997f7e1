#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod drag;
pub mod events;
pub mod layout;
pub mod ops;
pub mod position_store;
pub mod render;
pub mod session;
pub mod sim;
pub mod spec;
pub mod text_metrics;
pub mod theme;
pub mod viewport;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use drag::DragController;
pub use events::{EngineEvent, EventBus};
pub use layout::compute_layout;
pub use render::{render_svg, Renderer};
pub use spec::Spec;
pub use theme::ThemeResolver;
pub use viewport::ViewportManager;
