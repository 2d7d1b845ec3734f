use std::fmt;

/// Recommended maximum copy depth if not otherwise specified.
///
/// Every non-immutable node on the current path costs a few stack frames, and
/// debug builds use considerably more stack per frame, so the debug default is
/// lower to stay inside the 2 MiB stack of test threads.
#[cfg(debug_assertions)]
pub const DEFAULT_MAX_COPY_DEPTH: usize = 250;

/// Recommended maximum copy depth if not otherwise specified.
#[cfg(not(debug_assertions))]
pub const DEFAULT_MAX_COPY_DEPTH: usize = 1000;

/// Error returned when a resource limit is exceeded during a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of copied nodes exceeded.
    Allocation { limit: usize, count: usize },
    /// Maximum nesting depth of the graph being copied exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::Recursion { limit, depth } => {
                write!(f, "maximum copy depth exceeded: {depth} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Trait for tracking resource usage during one deep copy.
///
/// A fresh tracker is created for every top-level copy, so implementations only
/// ever see the allocations of a single call.
pub trait ResourceTracker: fmt::Debug {
    /// Called before each copied node is allocated on the heap.
    ///
    /// Returns `Ok(())` if the allocation should proceed, or `Err(ResourceError)`
    /// if a limit would be exceeded.
    fn on_allocate(&mut self) -> Result<(), ResourceError>;

    /// Called before descending into the children of a node.
    ///
    /// # Arguments
    /// * `current_depth` - Number of nodes on the current path (before the new one is entered)
    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError>;

    /// Returns the total number of allocations tracked, if this tracker records them.
    fn allocation_count(&self) -> Option<usize> {
        None
    }
}

/// A resource tracker that only enforces [`DEFAULT_MAX_COPY_DEPTH`].
///
/// The depth cap stays on so an unusually deep graph reports an error instead
/// of overflowing the stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline]
    fn on_allocate(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline]
    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        if current_depth >= DEFAULT_MAX_COPY_DEPTH {
            Err(ResourceError::Recursion {
                limit: DEFAULT_MAX_COPY_DEPTH,
                depth: current_depth + 1,
            })
        } else {
            Ok(())
        }
    }
}

/// Configuration for resource limits.
///
/// All limits are optional - set to `None` to disable a specific limit.
/// Use `ResourceLimits::new()` for the default depth cap only, or build custom
/// limits with the builder pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of nodes a single copy may allocate.
    #[serde(default)]
    pub max_allocations: Option<usize>,
    /// Maximum nesting depth of non-immutable nodes.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl ResourceLimits {
    /// Creates limits with only the depth cap set, to [`DEFAULT_MAX_COPY_DEPTH`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_COPY_DEPTH),
            ..Default::default()
        }
    }

    /// Sets the maximum number of allocations.
    #[must_use]
    pub fn max_allocations(mut self, limit: usize) -> Self {
        self.max_allocations = Some(limit);
        self
    }

    /// Sets the maximum copy depth.
    ///
    /// `None` removes the cap entirely; the caller then owns the stack budget.
    #[must_use]
    pub fn max_depth(mut self, limit: Option<usize>) -> Self {
        self.max_depth = limit;
        self
    }
}

/// A resource tracker that enforces configurable limits.
#[derive(Debug)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    /// Total number of nodes allocated so far.
    allocation_count: usize,
}

impl LimitedTracker {
    /// Creates a new LimitedTracker with the given limits.
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            allocation_count: 0,
        }
    }

    /// Returns the limits this tracker enforces.
    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

impl ResourceTracker for LimitedTracker {
    fn on_allocate(&mut self) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_allocations
            && self.allocation_count >= max
        {
            return Err(ResourceError::Allocation {
                limit: max,
                count: self.allocation_count + 1,
            });
        }
        self.allocation_count += 1;
        Ok(())
    }

    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_depth {
            // current_depth is before entering, so the new depth would be current_depth + 1
            if current_depth >= max {
                return Err(ResourceError::Recursion {
                    limit: max,
                    depth: current_depth + 1,
                });
            }
        }
        Ok(())
    }

    fn allocation_count(&self) -> Option<usize> {
        Some(self.allocation_count)
    }
}
