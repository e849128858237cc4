/* Copyright (c) 2026 Olle Mårtensson. This Source Code Form is subject to the terms of the Eclipse Public License, v. 2.0. */
//! Kindcast: runtime value coercion and assignment.
//!
//! Values live in a dynamically typed model ([`Value`], [`Type`]) and are
//! reached through [`Handle`]s that carry readability, addressability and
//! settability. On top of that model the crate extracts primitives from
//! arbitrary values, assigns any value into any compatible destination,
//! checks for zero values and deep-copies value graphs.
//!
//! # Examples
//! ```
//! use kindcast::{assign, extract_int, Config, Handle, Value};
//!
//! let cfg = Config::default();
//! let dest = Handle::slot(0i32);
//! assign(&dest, &Handle::of("42"), &cfg).expect("assign");
//! assert_eq!(dest.get(), Some(Value::from(42i32)));
//!
//! let n = extract_int(&Handle::of(3.0f64), &cfg).expect("extract");
//! assert_eq!(n, 3);
//! ```

mod error;
mod fanout;
mod recover;

pub mod assign;
pub mod capability;
pub mod clone;
pub mod config;
pub mod decode;
pub mod extract;
pub mod format;
pub mod handle;
pub mod iterate;
pub mod kind;
pub mod resolve;
pub mod types;
pub mod value;
pub mod wellknown;
pub mod zero;

#[cfg(feature = "serde")]
pub mod serde_support;

pub use assign::{assign, convert};
pub use capability::{
    MethodSet, YieldsBool, YieldsComplex128, YieldsFloat64, YieldsInt64, YieldsString,
    YieldsUint64, Zeroable,
};
pub use clone::{deep_clone, deep_clone_value, init_new};
pub use config::Config;
pub use decode::{FieldDecoder, StructuralDecoder};
pub use error::{CastError, CastResult};
pub use extract::{
    extract_bool, extract_complex, extract_float, extract_int, extract_string, extract_uint,
    get_bool, get_complex, get_float, get_int, get_string, get_uint, try_extract,
};
pub use handle::Handle;
pub use iterate::Iterable;
pub use kind::Kind;
pub use recover::{catch_panic, panic_message};
pub use types::{FieldDef, FuncType, NamedType, RecordType, Type};
pub use value::{Channel, Value};
pub use wellknown::{
    extract_duration, extract_ip, extract_time, extract_url, format_duration, parse_duration,
    parse_time, TimeLayout, WellKnown,
};
pub use zero::{is_ptr_zero, is_type_zero, is_zero, is_zero_value, set_zero};

#[cfg(feature = "serde")]
pub use serde_support::{from_handle, from_value, to_value, SerdeError};
