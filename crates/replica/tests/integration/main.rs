//! Integration tests for `replica`, built as a single test binary so the
//! fixtures in `common` are shared without per-binary dead code.


mod containers;
mod deep_copy;
mod departments;
mod tracer;
