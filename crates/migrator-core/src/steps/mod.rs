//! Migration step implementations

pub mod template_inserter;

pub use template_inserter::{
    TemplateInserterOptions, TemplateInserterStep, TEMPLATE_INSERTER_STEP_ID,
};
