//! Call graph rendering to graphviz DOT.
//!
//! Nodes are functions, edges are caller to callee relations. Both carry their
//! share of the total run time and are coloured on a blue to red ramp so that
//! hot paths stand out. Functions and edges below the thresholds are pruned.

use std::collections::HashMap;
use std::fmt::Write;
use std::time::Duration;

use super::recorder::CallStats;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotOptions {
    /// Minimum share of total time for a function to be drawn.
    pub node_threshold: f64,
    /// Minimum share of total time for an edge to be drawn.
    pub edge_threshold: f64,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self {
            node_threshold: 0.005,
            edge_threshold: 0.001,
        }
    }
}

/// Render `stats` as a DOT digraph titled with `label`.
pub fn to_dot(stats: &CallStats, label: &str, options: &DotOptions) -> String {
    let total = total_secs(stats);
    let mut ids = HashMap::new();
    let mut out = String::new();

    out.push_str("digraph {\n");
    let _ = writeln!(
        out,
        "\tgraph [fontname=Arial, nodesep=0.125, ranksep=0.25, labelloc=t, label=\"{}\"];",
        escape(label)
    );
    out.push_str("\tnode [fontcolor=white, fontname=Arial, height=0, shape=box, style=filled, width=0];\n");
    out.push_str("\tedge [fontname=Arial];\n");

    for function in &stats.functions {
        let share = fraction(function.inclusive, total);
        if share < options.node_threshold {
            continue;
        }
        let id = format!("n{}", ids.len());
        let color = temperature(share);
        let _ = writeln!(
            out,
            "\t{id} [color=\"{color}\", fontcolor=\"{}\", fontsize=\"{:.2}\", label=\"{}\\n{:.2}%\\n({:.2}%)\\n{}\u{d7}\"];",
            font_color(share),
            font_size(share),
            escape(&function.name),
            share * 100.0,
            fraction(function.own, total) * 100.0,
            function.calls,
        );
        ids.insert(function.name.as_str(), id);
    }

    for edge in &stats.edges {
        let (Some(from), Some(to)) = (ids.get(edge.caller.as_str()), ids.get(edge.callee.as_str()))
        else {
            continue;
        };
        let share = fraction(edge.inclusive, total);
        if share < options.edge_threshold {
            continue;
        }
        let width = pen_width(share);
        let _ = writeln!(
            out,
            "\t{from} -> {to} [arrowsize=\"{:.2}\", color=\"{}\", fontcolor=\"{}\", label=\"{:.2}%\\n{}\u{d7}\", labeldistance=\"{:.2}\", penwidth=\"{width:.2}\"];",
            width.sqrt(),
            temperature(share),
            temperature(share),
            share * 100.0,
            edge.calls,
            width,
        );
    }

    out.push_str("}\n");
    out
}

// The recorded wall-clock time is the reference unless a single function
// somehow exceeds it.
fn total_secs(stats: &CallStats) -> f64 {
    stats
        .functions
        .iter()
        .map(|f| f.inclusive)
        .chain(std::iter::once(stats.total_time))
        .max()
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

fn fraction(part: Duration, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (part.as_secs_f64() / total).clamp(0.0, 1.0)
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Map a share in `0.0..=1.0` to a colour, cold blue to hot red.
fn temperature(share: f64) -> String {
    let share = share.clamp(0.0, 1.0);
    let hue = (1.0 - share) * (2.0 / 3.0);
    let saturation = 0.9 + 0.1 * share;
    let lightness = 0.5 - 0.1 * share;
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn font_color(share: f64) -> &'static str {
    if share > 0.05 { "#ffffff" } else { "#000000" }
}

fn font_size(share: f64) -> f64 {
    (14.0 * share.max(0.5)).max(8.0)
}

fn pen_width(share: f64) -> f64 {
    (8.0 * share).max(0.5)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    let channel = |h: f64| -> u8 {
        let h = h.rem_euclid(1.0);
        let v = if h * 6.0 < 1.0 {
            m1 + (m2 - m1) * h * 6.0
        } else if h * 2.0 < 1.0 {
            m2
        } else if h * 3.0 < 2.0 {
            m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
        } else {
            m1
        };
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}
