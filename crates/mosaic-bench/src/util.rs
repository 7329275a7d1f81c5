use mosaic_core::{Node, NodeId, Rect, Vec2, WorkspaceDocument};
use std::fs;
use std::path::{Path, PathBuf};

/// Deterministic scatter of `count` cards with plenty of overlap: a jittered
/// grid whose pitch is smaller than the card size.
pub fn generate_overlapping_nodes(count: usize) -> Vec<Node> {
    let columns = (count as f64).sqrt().ceil().max(1.0) as usize;
    (0..count)
        .map(|i| {
            let (col, row) = (i % columns, i / columns);
            let jitter = ((i * 37) % 23) as f64;
            Node::new(
                NodeId::new(format!("node_{i}")),
                "note",
                Vec2::new(col as f64 * 180.0 + jitter, row as f64 * 140.0 - jitter),
            )
            .with_size(200.0, 150.0)
        })
        .collect()
}

/// Non-overlapping rectangles filling a square block around the origin.
pub fn generate_occupied_rects(count: usize) -> Vec<Rect> {
    let columns = (count as f64).sqrt().ceil().max(1.0) as usize;
    (0..count)
        .map(|i| {
            let (col, row) = (i % columns, i / columns);
            Rect::from_pos_size(
                Vec2::new(col as f64 * 240.0, row as f64 * 180.0),
                Vec2::new(200.0, 150.0),
            )
        })
        .collect()
}

pub fn write_workspace(root: &Path, nodes: Vec<Node>) -> anyhow::Result<PathBuf> {
    let document = WorkspaceDocument {
        nodes,
        ..WorkspaceDocument::default()
    };
    let path = root.join("workspace.json");
    fs::write(&path, document.to_json()?)?;
    Ok(path)
}
