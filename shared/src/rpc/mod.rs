mod error;
mod rpc_message;
mod rpc_table;

pub use error::RpcError;
pub use rpc_message::RpcMessage;
pub use rpc_table::{RpcCallContext, RpcResult, RpcSettings, RpcTable};

pub(crate) use rpc_message::handle_rpc_message;
