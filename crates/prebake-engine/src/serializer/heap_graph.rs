//! Heap graph export.
//!
//! A read-only view of the residual set for debugging: nodes are global
//! bindings, residual objects and captured scopes; edges are the referrer
//! links the visitor recorded.

use crate::interpreter::heap::{ObjectId, ObjectKind};
use crate::interpreter::Realm;
use crate::serializer::options::HeapGraphFormat;
use crate::serializer::residual::{Referrer, ResidualSet};
use indexmap::IndexSet;
use serde::Serialize;
use std::fmt::Write;

/// A graph node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Stable node id
    pub id: String,
    /// Display label
    pub label: String,
    /// `global`, `object`, `array`, `function` or `scope`
    pub group: &'static str,
}

/// A graph edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    /// Source node id
    pub from: String,
    /// Target node id
    pub to: String,
    /// Edge label
    pub label: String,
}

/// Nodes and edges of the residual heap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeapGraph {
    /// Nodes in discovery order
    pub nodes: Vec<GraphNode>,
    /// Edges in discovery order
    pub edges: Vec<GraphEdge>,
}

fn object_node(id: ObjectId) -> String {
    format!("o{}", id.0)
}

impl HeapGraph {
    /// Build the graph of `residual`.
    pub fn build(realm: &Realm, residual: &ResidualSet) -> Self {
        let mut graph = HeapGraph::default();
        let mut globals: IndexSet<String> = IndexSet::new();

        for (id, info) in &residual.values {
            let (label, group) = match realm.heap.get(*id).map(|object| &object.kind) {
                Some(ObjectKind::Array(elements)) => {
                    (format!("Array {} ({})", id, elements.len()), "array")
                }
                Some(ObjectKind::Function(closure)) => {
                    (format!("{} {}", closure.node.display_name(), id), "function")
                }
                _ => (format!("Object {}", id), "object"),
            };
            graph.nodes.push(GraphNode { id: object_node(*id), label, group });

            for referrer in &info.referrers {
                let (from, label) = match referrer {
                    Referrer::Global(name) => {
                        globals.insert(name.clone());
                        (format!("g_{}", name), name.clone())
                    }
                    Referrer::Property { object, key } => (object_node(*object), key.clone()),
                    Referrer::Element { object, index } => {
                        (object_node(*object), format!("[{}]", index))
                    }
                    Referrer::Binding(key) => (format!("s{}", key.env.0), key.name.clone()),
                    Referrer::Effect { function, location } => {
                        (object_node(*function), format!("modifies {}", location))
                    }
                    Referrer::Return(function) => (object_node(*function), "returns".to_string()),
                };
                graph.edges.push(GraphEdge { from, to: object_node(*id), label });
            }
        }

        for name in globals {
            graph.nodes.push(GraphNode {
                id: format!("g_{}", name),
                label: name,
                group: "global",
            });
        }
        for (env, scope) in &residual.scopes {
            let id = format!("s{}", env.0);
            graph.nodes.push(GraphNode {
                id: id.clone(),
                label: format!("scope {}", env),
                group: "scope",
            });
            for function in &scope.capturing_functions {
                graph.edges.push(GraphEdge {
                    from: object_node(*function),
                    to: id.clone(),
                    label: "captures".to_string(),
                });
            }
        }
        graph
    }

    /// Render in `format`
    pub fn render(&self, format: HeapGraphFormat) -> Result<String, serde_json::Error> {
        match format {
            HeapGraphFormat::DotLanguage => Ok(self.to_dot()),
            HeapGraphFormat::VisJs => self.to_vis_js(),
        }
    }

    /// Graphviz `digraph`
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph heap {\n");
        for node in &self.nodes {
            let shape = match node.group {
                "global" => "plaintext",
                "scope" => "box",
                "function" => "ellipse",
                _ => "record",
            };
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\", shape={}];",
                node.id,
                escape(&node.label),
                shape
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                edge.from,
                edge.to,
                escape(&edge.label)
            );
        }
        out.push_str("}\n");
        out
    }

    /// vis.js `{ "nodes": [...], "edges": [...] }`
    pub fn to_vis_js(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
