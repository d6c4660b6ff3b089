//! `mercado list`

use mercado_core::Catalog;
use mercado_core::tools::Label;
use std::fmt::Write;

/// One line per tool: name, backend and labels, sorted by name.
#[must_use]
pub fn execute(catalog: &Catalog, label: Option<Label>) -> String {
    let mut tools: Vec<_> = match label {
        Some(label) => catalog.with_label(label).collect(),
        None => catalog.iter().collect(),
    };
    tools.sort_by(|a, b| a.name.cmp(&b.name));

    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for tool in tools {
        let labels: Vec<_> = tool.labels.iter().map(|l| l.as_str()).collect();
        let _ = writeln!(
            out,
            "{:<width$}  {:<9}  {}",
            tool.name,
            tool.source.backend_type(),
            labels.join(",")
        );
    }
    out
}
