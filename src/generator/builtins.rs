//! Builtin functions callable from generator programs

use crate::util::RandomSource;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Upper bound on the output of a single builtin call
pub const MAX_BUILTIN_OUTPUT: usize = 4096;

/// A builtin receives its raw argument strings and the shared random source.
///
/// Errors are plain reasons; the interpreter attaches the builtin name.
/// Implementations must be safe to call from many tasks at once.
pub type BuiltinFn = fn(&[String], &RandomSource) -> Result<Vec<u8>, String>;

/// Output length of a call with these arguments, when it never varies
pub type LengthFn = fn(&[String]) -> Option<usize>;

/// Name → builtin lookup table, read-only once built
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    table: HashMap<&'static str, BuiltinFn>,
    lengths: HashMap<&'static str, LengthFn>,
}

static STANDARD: OnceLock<Builtins> = OnceLock::new();

impl Builtins {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            lengths: HashMap::new(),
        }
    }

    /// Add a builtin, replacing any previous one with the same name.
    /// Its output length counts as unknown.
    pub fn with(mut self, name: &'static str, func: BuiltinFn) -> Self {
        self.table.insert(name, func);
        self.lengths.remove(name);
        self
    }

    /// Add a builtin whose output length can be told from its arguments
    pub fn with_length(mut self, name: &'static str, func: BuiltinFn, len: LengthFn) -> Self {
        self.table.insert(name, func);
        self.lengths.insert(name, len);
        self
    }

    /// The standard registry: `random_bytes`, `random_string`, `hex`
    pub fn standard() -> &'static Builtins {
        STANDARD.get_or_init(|| {
            Builtins::new()
                .with_length("random_bytes", random_bytes, fixed_range_len)
                .with_length("random_string", random_string, fixed_range_len)
                .with_length("hex", hex_bytes, hex_len)
        })
    }

    pub fn get(&self, name: &str) -> Option<BuiltinFn> {
        self.table.get(name).copied()
    }

    pub fn length_of(&self, name: &str) -> Option<LengthFn> {
        self.lengths.get(name).copied()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn expect_args(args: &[String], count: usize) -> Result<(), String> {
    if args.len() != count {
        return Err(format!(
            "expected {} argument(s), received {}",
            count,
            args.len()
        ));
    }
    Ok(())
}

/// Parse `(min, max)` decimal length arguments
fn length_range(args: &[String]) -> Result<(usize, usize), String> {
    expect_args(args, 2)?;
    let parse = |idx: usize| {
        args[idx]
            .parse::<usize>()
            .map_err(|_| format!("expected a length as arg {}, received '{}'", idx, args[idx]))
    };
    let (min, max) = (parse(0)?, parse(1)?);

    if min > max {
        return Err(format!("min length {} exceeds max length {}", min, max));
    }
    if max > MAX_BUILTIN_OUTPUT {
        return Err(format!(
            "max length {} exceeds limit of {}",
            max, MAX_BUILTIN_OUTPUT
        ));
    }
    Ok((min, max))
}

/// `$random_bytes(min, max)`
pub fn random_bytes(args: &[String], rng: &RandomSource) -> Result<Vec<u8>, String> {
    let (min, max) = length_range(args)?;
    Ok(rng.bytes(rng.range_inclusive(min, max)))
}

/// `$random_string(min, max)`: letters and digits only
pub fn random_string(args: &[String], rng: &RandomSource) -> Result<Vec<u8>, String> {
    let (min, max) = length_range(args)?;
    Ok(rng.alphanumeric(rng.range_inclusive(min, max)))
}

/// `min == max` pins the length of `random_bytes` and `random_string`
fn fixed_range_len(args: &[String]) -> Option<usize> {
    match length_range(args) {
        Ok((min, max)) if min == max => Some(min),
        _ => None,
    }
}

fn hex_len(args: &[String]) -> Option<usize> {
    expect_args(args, 1).ok()?;
    let digits = &args[0];
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(digits.len() / 2)
}

/// `$hex(digits)`
pub fn hex_bytes(args: &[String], _rng: &RandomSource) -> Result<Vec<u8>, String> {
    expect_args(args, 1)?;
    if args[0].len() / 2 > MAX_BUILTIN_OUTPUT {
        return Err(format!("hex literal exceeds limit of {} bytes", MAX_BUILTIN_OUTPUT));
    }
    hex::decode(&args[0]).map_err(|e| format!("malformed hex '{}': {}", args[0], e))
}
