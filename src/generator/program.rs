use crate::generator::builtins::{BuiltinFn, LengthFn};
use crate::prefix::MAX_PREFIX_LEN;
use crate::util::{CamoError, RandomSource, Result};
use bytes::{Bytes, BytesMut};

/// A builtin call resolved at parse time
#[derive(Debug, Clone)]
pub struct Call {
    pub(crate) name: String,
    pub(crate) args: Vec<String>,
    pub(crate) func: BuiltinFn,
    pub(crate) len: Option<LengthFn>,
}

impl Call {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[derive(Debug, Clone)]
pub enum Segment {
    Literal(Bytes),
    Call(Call),
}

/// A parsed generator program
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) major: u32,
    pub(crate) minor: u32,
    pub(crate) segments: Vec<Segment>,
}

impl Program {
    /// `(major, minor)` as written in the program
    pub fn version(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the program has no calls and always yields the same bytes
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|seg| matches!(seg, Segment::Literal(_)))
    }

    /// Length of every prefix this program produces, if it is the same each run.
    ///
    /// A call to a builtin without a length hint makes the length unknown.
    pub fn fixed_len(&self) -> Option<usize> {
        self.segments.iter().try_fold(0usize, |total, seg| {
            let len = match seg {
                Segment::Literal(bytes) => bytes.len(),
                Segment::Call(call) => (call.len?)(&call.args)?,
            };
            Some(total + len)
        })
    }

    /// Run the program once.
    ///
    /// Stops at the first failing call; nothing produced so far is returned.
    pub fn evaluate(&self, rng: &RandomSource) -> Result<Bytes> {
        let mut out = BytesMut::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(bytes) => out.extend_from_slice(bytes),
                Segment::Call(call) => {
                    let produced =
                        (call.func)(&call.args, rng).map_err(|reason| CamoError::Builtin {
                            name: call.name.clone(),
                            reason,
                        })?;
                    out.extend_from_slice(&produced);
                }
            }

            if out.len() > MAX_PREFIX_LEN {
                return Err(CamoError::PrefixTooLarge {
                    size: out.len(),
                    limit: MAX_PREFIX_LEN,
                });
            }
        }

        Ok(out.freeze())
    }
}
