mod correlation_table;
mod method_table;
mod remote_method;
mod rpc_error;
mod service_dispatcher;
mod service_proxy;
mod service_table;

pub use correlation_table::{CorrelationTable, PendingCall};
pub use method_table::{MethodHandler, MethodTable, RemoteFault};
pub use remote_method::{CallParameters, RemoteMethod, method_id, method_signature};
pub use rpc_error::RpcError;
pub use service_dispatcher::ServiceDispatcher;
pub use service_proxy::{CallInvoker, RemoteInterface, ServiceProxy};
pub use service_table::{PublishedService, RpcService, ServiceTable};
