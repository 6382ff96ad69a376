//! Dependency resolution, coordinated row generation and INSERT rendering.

pub mod codec;
pub mod engine;
pub mod errors;
pub mod junction;
pub mod model;
pub mod render;
pub mod resolver;
pub mod synth;
pub mod value;

pub use codec::{DialectFormatter, LiteralCodec, StandardFormatter};
pub use engine::{CoordinatedGenerator, key_value};
pub use errors::GenerationError;
pub use junction::{JunctionKeys, JunctionLayout};
pub use model::{DecodedRow, Dialect, GenerateOptions, InsertStatement, Record, RecordSet};
pub use render::{render_inserts, render_teardown, to_script};
pub use resolver::{Resolution, resolve};
pub use synth::{ValueSynthesizer, coerce_literal, like_value, truncate_chars};
pub use value::GeneratedValue;
