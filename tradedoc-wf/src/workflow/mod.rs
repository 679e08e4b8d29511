//! Workflow composition root
//!
//! Wires the step state store, the upload tracker and the upload channel
//! together and exposes the combined read model to the API layer.

pub mod controller;
pub mod throttle;

pub use controller::{
    LoggingPopulator, StepReadModel, TemplatePopulator, UploadReadModel, WorkflowController,
    WorkflowReadModel,
};
