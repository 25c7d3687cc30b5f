pub mod container;
pub mod extract_grid;
pub mod filter;
pub mod notify;
pub mod panes;
pub mod search;
pub mod selection;
pub mod workbench;

pub use container::{ContainerStatus, StateContainer};
pub use extract_grid::{CellEdit, CellState, ExtractGrid, ProcessingState, is_loading};
pub use filter::{AnnotationFilters, filter_annotations};
pub use notify::{Notice, NoticeLevel};
pub use panes::{Pane, PaneInputs, PaneSet, derive_panes};
pub use search::{DEFAULT_SEARCH_DEBOUNCE, Debouncer, SearchState};
pub use selection::{ElementRefs, NoopViewport, Selection, SelectionChange, Viewport};
pub use workbench::{Workbench, WorkbenchState};
