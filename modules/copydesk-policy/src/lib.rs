pub mod cadence;
pub mod registry;
pub mod templates;
pub mod validator;

pub use cadence::{CadenceStore, CadenceTracker, CadenceVerdict, InMemoryCadenceStore};
pub use registry::{reference_verticals, VerticalPolicyRegistry};
pub use templates::{reference_templates, TemplateRegistry};
pub use validator::{TemplateValidator, ValidationReport, Violation};
