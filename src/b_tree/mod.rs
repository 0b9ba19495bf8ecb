mod b_node;
mod node_type;

pub use b_node::*;
pub use node_type::*;
