//! Label text formatting and export

pub mod facts;
pub mod icml;
pub mod number_format;
pub mod template;

pub use facts::{nutrition_facts, FactsLanguage};
pub use icml::{render_label, write_icml, ExportError, ExportResult, IcmlBuilder};
pub use number_format::NumberFormat;
pub use template::{
    compose, expiry_date, label_warnings, strip_markup, substitute_weight, ComposeOptions,
    LabelText, WEIGHT_TOKEN,
};
