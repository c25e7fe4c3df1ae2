mod builder;
mod executable;
mod params;
mod pending;
mod preparer;

pub use builder::{BatchAssembler, ModificationBatch, TryAdd};
pub use executable::ExecutableBatch;
pub use params::{BoundParameter, ParameterDirection};
pub use preparer::BatchPreparer;

#[cfg(test)]
pub(crate) use params::{assign_parameter_names, ParameterNameGenerator};
