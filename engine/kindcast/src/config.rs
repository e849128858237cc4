use std::fmt;
use std::sync::Arc;

use crate::decode::{FieldDecoder, StructuralDecoder};
use crate::wellknown::{self, TimeLayout};

pub const DEFAULT_FLOAT_PRECISION: i32 = -1;
pub const DEFAULT_FLOAT_FORMAT: char = 'g';
pub const DEFAULT_BIT_SIZE: u32 = 64;
pub const DEFAULT_COMPLEX_BIT_SIZE: u32 = 128;
pub const DEFAULT_BASE: u32 = 10;

const FLOAT_FORMATS: [char; 8] = ['b', 'e', 'E', 'f', 'g', 'G', 'x', 'X'];

static FIELD_DECODER: FieldDecoder = FieldDecoder;

/// Options for one extraction, assignment or iteration call.
///
/// Every public entry point normalizes the configuration before use, so
/// out-of-range fields silently fall back to their defaults.
#[derive(Clone)]
pub struct Config {
    /// Digits after the point for `e`, `f` and `x` formats, significant
    /// digits for `g`. `-1` selects the shortest round-tripping form.
    pub float_precision: i32,
    pub float_format: char,
    /// Integer and float parse width, 32 or 64.
    pub bit_size: u32,
    /// Complex parse width, 64 or 128.
    pub complex_bit_size: u32,
    /// Integer base for parsing and rendering, 2 through 36.
    pub base: u32,
    /// Layouts tried in order when parsing time text. Empty selects the
    /// built-in table.
    pub time_layouts: Vec<TimeLayout>,
    pub ignore_errors: bool,
    pub recover_panics: bool,
    pub block_channel: bool,
    pub concurrent: bool,
    pub decoder: Option<Arc<dyn StructuralDecoder>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("float_precision", &self.float_precision)
            .field("float_format", &self.float_format)
            .field("bit_size", &self.bit_size)
            .field("complex_bit_size", &self.complex_bit_size)
            .field("base", &self.base)
            .field("time_layouts", &self.time_layouts)
            .field("ignore_errors", &self.ignore_errors)
            .field("recover_panics", &self.recover_panics)
            .field("block_channel", &self.block_channel)
            .field("concurrent", &self.concurrent)
            .field("decoder", &self.decoder.is_some())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            float_precision: DEFAULT_FLOAT_PRECISION,
            float_format: DEFAULT_FLOAT_FORMAT,
            bit_size: DEFAULT_BIT_SIZE,
            complex_bit_size: DEFAULT_COMPLEX_BIT_SIZE,
            base: DEFAULT_BASE,
            time_layouts: Vec::new(),
            ignore_errors: false,
            recover_panics: false,
            block_channel: false,
            concurrent: false,
            decoder: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalized(mut self) -> Self {
        if self.float_precision < -1 {
            self.float_precision = DEFAULT_FLOAT_PRECISION;
        }
        if !FLOAT_FORMATS.contains(&self.float_format) {
            self.float_format = DEFAULT_FLOAT_FORMAT;
        }
        if self.bit_size != 32 && self.bit_size != 64 {
            self.bit_size = DEFAULT_BIT_SIZE;
        }
        if self.complex_bit_size != 64 && self.complex_bit_size != 128 {
            self.complex_bit_size = DEFAULT_COMPLEX_BIT_SIZE;
        }
        if !(2..=36).contains(&self.base) {
            self.base = DEFAULT_BASE;
        }
        self
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self.normalized()
    }

    /// Set the integer/float width and the complex width.
    pub fn with_bit_size(mut self, bit_size: u32, complex_bit_size: u32) -> Self {
        self.bit_size = bit_size;
        self.complex_bit_size = complex_bit_size;
        self.normalized()
    }

    pub fn with_float_format(mut self, format: char, precision: i32) -> Self {
        self.float_format = format;
        self.float_precision = precision;
        self.normalized()
    }

    pub fn with_time_layouts(mut self, layouts: impl IntoIterator<Item = TimeLayout>) -> Self {
        self.time_layouts = layouts.into_iter().collect();
        self
    }

    pub fn with_decoder(mut self, decoder: impl StructuralDecoder + 'static) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    pub fn ignore_errors(mut self, enabled: bool) -> Self {
        self.ignore_errors = enabled;
        self
    }

    pub fn recover_panics(mut self, enabled: bool) -> Self {
        self.recover_panics = enabled;
        self
    }

    pub fn block_channel(mut self, enabled: bool) -> Self {
        self.block_channel = enabled;
        self
    }

    pub fn concurrent(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    /// Overlay the fields of `other` that differ from the defaults.
    /// Flags can only be switched on by a merge.
    pub fn merge(mut self, other: Config) -> Self {
        let defaults = Config::default();
        if other.float_precision != defaults.float_precision {
            self.float_precision = other.float_precision;
        }
        if other.float_format != defaults.float_format {
            self.float_format = other.float_format;
        }
        if other.bit_size != defaults.bit_size {
            self.bit_size = other.bit_size;
        }
        if other.complex_bit_size != defaults.complex_bit_size {
            self.complex_bit_size = other.complex_bit_size;
        }
        if other.base != defaults.base {
            self.base = other.base;
        }
        if !other.time_layouts.is_empty() {
            self.time_layouts = other.time_layouts;
        }
        self.ignore_errors |= other.ignore_errors;
        self.recover_panics |= other.recover_panics;
        self.block_channel |= other.block_channel;
        self.concurrent |= other.concurrent;
        if other.decoder.is_some() {
            self.decoder = other.decoder;
        }
        self.normalized()
    }

    pub fn time_layouts(&self) -> &[TimeLayout] {
        if self.time_layouts.is_empty() {
            wellknown::default_time_layouts()
        } else {
            &self.time_layouts
        }
    }

    pub fn decoder(&self) -> &dyn StructuralDecoder {
        match &self.decoder {
            Some(decoder) => decoder.as_ref(),
            None => &FIELD_DECODER,
        }
    }
}
