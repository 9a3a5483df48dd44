pub mod gate;
pub mod procedure;
pub mod router;
pub mod schema;
pub mod transformer;
pub mod transport;

pub use procedure::{protected_procedure, public_procedure, Procedure, ProcedureKind};
pub use router::RpcRouter;
pub use transport::{RpcState, TransportOptions};
