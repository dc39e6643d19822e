//! Operation kinds, budgets and the per-iteration operation

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::allocator::ObjectAllocator;
use crate::config::ConfigError;
use crate::context::HarnessContext;
use crate::error::{HarnessError, HarnessResult};
use crate::pattern::PatternSet;
use crate::storage::Bucket;

/// What a load worker does on every iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Upload a random fixture into the worker's own bucket
    Put,
    /// Download a random fixture from a random shared bucket
    Get,
    /// Delete the next object handed out by the allocator
    Delete,
}

impl OpKind {
    /// Lowercase name, used for worker and bucket names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::Delete => "del",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "put" => Ok(Self::Put),
            "get" => Ok(Self::Get),
            "del" | "delete" => Ok(Self::Delete),
            other => Err(format!("unknown operation `{other}` (expected put, get or del)")),
        }
    }
}

/// How many operations a worker may still attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// At most this many more
    Limited(u64),
    /// Until stopped
    Unbounded,
}

impl Budget {
    /// Budget from a count where `-1` means unbounded
    pub fn from_count(count: i64) -> Result<Self, ConfigError> {
        match count {
            -1 => Ok(Self::Unbounded),
            n if n >= 0 => Ok(Self::Limited(n as u64)),
            n => Err(ConfigError::InvalidLoad(format!(
                "operation count {n} is below -1"
            ))),
        }
    }

    /// Whether another operation may be attempted
    pub fn has_remaining(&self) -> bool {
        match self {
            Self::Limited(n) => *n > 0,
            Self::Unbounded => true,
        }
    }

    /// Account for one attempted operation
    pub fn consume(&mut self) {
        if let Self::Limited(n) = self {
            *n = n.saturating_sub(1);
        }
    }

    /// Remaining count, `None` when unbounded
    pub fn remaining(&self) -> Option<u64> {
        match self {
            Self::Limited(n) => Some(*n),
            Self::Unbounded => None,
        }
    }
}

/// Result of one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An operation was attempted and verified
    Performed,
    /// Nothing to do
    Idle,
}

/// The operation a worker runs, resolved once when the worker is built
#[derive(Debug)]
pub(crate) enum Operation {
    Put {
        bucket: Bucket,
        created: bool,
        seq: u64,
    },
    Get {
        buckets: Arc<Vec<Bucket>>,
    },
    Delete {
        allocator: Arc<ObjectAllocator>,
    },
    /// GET or DELETE without anything to work on
    Idle,
}

impl Operation {
    pub(crate) fn resolve(
        kind: OpKind,
        worker: &str,
        ctx: &HarnessContext,
        buckets: Option<Arc<Vec<Bucket>>>,
        allocator: Option<Arc<ObjectAllocator>>,
    ) -> Self {
        let buckets = buckets.filter(|b| !b.is_empty());
        match kind {
            OpKind::Put => Self::Put {
                bucket: ctx.bucket(worker),
                created: false,
                seq: 0,
            },
            OpKind::Get => match buckets {
                Some(buckets) => Self::Get { buckets },
                None => Self::Idle,
            },
            OpKind::Delete => match (buckets, allocator) {
                (Some(_), Some(allocator)) if allocator.population() > 0 => {
                    Self::Delete { allocator }
                }
                _ => Self::Idle,
            },
        }
    }

    pub(crate) fn execute(&mut self, ctx: &HarnessContext, worker: &str) -> HarnessResult<Step> {
        match self {
            Self::Put {
                bucket,
                created,
                seq,
            } => {
                if !*created {
                    if !bucket.create(ctx, false)? {
                        return Err(HarnessError::BucketNotListed(bucket.full_name()));
                    }
                    *created = true;
                }
                let class = ctx.fixtures().random_class();
                let key = format!("{worker}-{seq}{}", class.file_name);
                *seq += 1;
                bucket.put(ctx, &ctx.fixtures().path(class), Some(&key))?;
                Ok(Step::Performed)
            }
            Self::Get { buckets } => {
                let Some(bucket) = buckets.choose(&mut rand::thread_rng()) else {
                    return Ok(Step::Idle);
                };
                let class = ctx.fixtures().random_class();
                let url = bucket.object_url(class.file_name);
                let dest = ctx
                    .download_dir()
                    .join(format!("{worker}-{}", class.file_name));
                ctx.check(
                    None,
                    &ctx.s3([
                        "get".to_string(),
                        url.clone(),
                        dest.display().to_string(),
                        "--force".to_string(),
                    ]),
                    &PatternSet::new().must_find(format!("download: '{url}'")),
                )?;
                Ok(Step::Performed)
            }
            Self::Delete { allocator } => {
                let Some(object) = allocator.allocate_next() else {
                    return Ok(Step::Idle);
                };
                let url = object.full_name();
                ctx.check(
                    None,
                    &ctx.s3(["del", &url]),
                    &PatternSet::new().must_find(format!("delete: '{url}'")),
                )?;
                Ok(Step::Performed)
            }
            Self::Idle => Ok(Step::Idle),
        }
    }
}
