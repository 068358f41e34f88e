//! Interactive panel layouts: a tree of splittable, dockable, tab-stackable
//! areas, compiled to terminal cells and edited through commands or
//! pointer gestures with undo history.

pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod editor;
pub mod error;
pub mod gesture;
pub mod history;
pub mod layout;
pub mod preview;
pub mod registry;
pub mod screen;
pub mod session;
pub mod tracing_sub;

pub use config::{ConfigError, LayoutConfig};
pub use editor::{InsertSide, JoinDirection, PlaceSource, Placement, StructuralEditor};
pub use error::LayoutError;
pub use history::HistoryLedger;
pub use layout::{Area, AreaRole, LayoutTree, NodeId, Orientation, ViewportMap};
pub use registry::{AreaDescriptor, AreaRegistry, AreaType, PermissiveRegistry, TypeRegistry};
pub use screen::{LayoutCommand, ScreenId, ScreenManager};
pub use session::{CommandOutcome, LayoutSession};
