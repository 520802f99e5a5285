//! # opmqg - OPM Query Generation
//!
//! opmqg compiles high-level property and calculation operations into
//! SPARQL 1.1 query and update text for OPM-style (Ontology for Property
//! Management) RDF datasets. Properties are never overwritten: every value
//! lives in a chain of property states carrying provenance, a reliability
//! class, and a generation timestamp, and every operation here emits one
//! self-contained program whose guards sit in the same WHERE clause as its
//! data patterns.
//!
//! ## Core Concepts
//!
//! - **Feature of Interest (`?foi`)**: the subject a property describes
//! - **Property state**: one immutable value snapshot with provenance
//! - **Reliability**: `assumed` / `confirmed` / `deleted` / `derived`
//! - **Calculation**: a stored expression deriving one property from others
//!
//! ## Usage
//!
//! ```rust,ignore
//! use opmqg::{PostPropInput, QueryAssembler};
//!
//! let assembler = QueryAssembler::with_defaults()?;
//!
//! let query = assembler.post_prop(&PostPropInput {
//!     subject_uri: Some("https://example.org/foi/1".to_string()),
//!     predicate: "props:designAmbientTemperature".to_string(),
//!     value: "70 Cel".to_string(),
//!     reliability: Some("assumed".to_string()),
//!     ..PostPropInput::default()
//! })?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Building blocks
pub mod clean;
pub mod error;
pub mod extract;
pub mod graph;
pub mod input;
pub mod path;
pub mod prefix;
pub mod reliability;

// Query assembly
pub mod assembler;

// Re-export primary types at crate root for convenience
pub use assembler::{AssemblerConfig, QueryAssembler};
pub use clean::{clean_literal, clean_property_literal, clean_uri};
pub use error::{OpmError, OpmResult, ValidationError};
pub use extract::{extract_namespace_prefixes, extract_variables};
pub use graph::GraphConfig;
pub use input::{
	reserved_variables, CalcInput, GetOutdatedInput, GetPropsInput, GetSubscribersInput,
	PostPropInput, PutPropInput, QueryType, RestorePropInput, SetReliabilityInput,
};
pub use path::{clean_argument_paths, clean_path, ArgumentPaths, CANONICAL_SUBJECT};
pub use prefix::{Prefix, PrefixRegistry};
pub use reliability::Reliability;
