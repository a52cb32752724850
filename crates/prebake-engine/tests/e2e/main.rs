//! End-to-end tests: source in, reconstructed program out.
//!
//! Every file here runs the full `Serializer` pipeline and, where the
//! output is meant to be equivalent, evaluates the generated program again
//! and compares the resulting heaps.

mod harness;

mod additional_functions;
mod closures;
mod deep;
mod determinism;
mod heap_graph;
mod inlining;
mod lazy;
mod modules;
mod objects;
