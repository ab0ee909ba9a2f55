pub mod behavior;
pub mod builder;
pub mod condition;
pub mod edge;
pub mod part;
pub mod port_specs;
pub mod ports;

// Re-export commonly used types
pub use behavior::{behavior_fn, Behavior, BehaviorContext, FnBehavior};
pub use builder::{LeafBuilder, StructureBuilder};
pub use condition::{ConditionView, SchedulingCondition};
pub use edge::{EdgeTriggered, RisingEdge};
pub use part::{Part, PartKind, TickContext};
pub use port_specs::{Direction, OverwritePolicy, PortSemantic, PortSpec};
pub use ports::{Port, PortSet};
