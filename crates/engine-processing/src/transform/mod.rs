pub mod error;
pub mod fault;
pub mod record;

pub use error::TransformError;
pub use fault::{DeviceFaultInjection, FaultInjectionStrategy, InjectedFault, NoFaults};
pub use record::RecordTransformer;
