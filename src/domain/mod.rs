pub mod config;
pub mod coordinate;
pub mod entity;
pub mod parameter;
pub mod project;
pub mod template;

pub use config::{AutomationResource, Config, ConfigType, DocumentKind, Parameters};
pub use coordinate::{Coordinate, CoordinateError};
pub use entity::{EntityLookup, ResolvedEntity};
pub use parameter::{
    Parameter, ParameterError, ParameterReference, Properties, PropertyResolver, ResolveContext,
    ID_PARAMETER, NAME_PARAMETER, SCOPE_PARAMETER,
};
pub use project::Project;
pub use template::{RenderError, Template};
