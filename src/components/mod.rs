//! View-side components driven by the synchronised graph.

pub mod force_graph;
