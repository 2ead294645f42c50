//! Test code detection adapters
//!
//! Test code is recognized by the source language's naming conventions;
//! only Python is analyzed, so only Python conventions are known.

mod python;

pub use python::PythonTestDetector;
