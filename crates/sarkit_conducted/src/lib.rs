//! `sarkit_conducted` v1:
//! Maximum LTE conducted power per band and channel type.
//!
//! Modules:
//! - `spec`      : table rows, maxima and errors
//! - `aggregate` : table reading and maximum search
//! - `render`    : terminal text and workbook sheet
pub mod aggregate;
pub mod render;
pub mod spec;

pub use aggregate::{derive_band_maxima, read_conducted_table};
pub use render::{render_band_maxima, write_band_maxima_workbook};
pub use spec::{ConductedError, EnumChannelType, SpecBandMaxima, SpecConductedRow};
