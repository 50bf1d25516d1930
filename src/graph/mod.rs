//! Strategy graph: typed nodes, socket-disciplined connections, the node
//! catalog consulted at creation time, and undoable deletion.

pub mod catalog;
pub mod model;
pub mod types;
pub mod undo;

pub use catalog::{GateKind, NodeCatalog, NodeSpec};
pub use model::StrategyGraph;
pub use types::{Connection, FlowNode, NodeId, SocketType};
pub use undo::UndoManager;
