#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Compiles authored maze layouts into immutable [`Maze`] graphs.
//!
//! Layouts are JSON documents describing the grid, the start and goal cells
//! and the walkable route, either as an ordered list of cell keys (`path`)
//! or as an explicit list of corridor segments (`edges`).

use std::{fs, io, path::{Path, PathBuf}, sync::Arc};

use maze_runner_core::{Cell, CellKeyError};
use maze_runner_world::{Maze, MazeBuilder, MazeError, Theme};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted grid side, in cells.
pub const MAX_SIDE: u32 = 20;

/// Largest accepted number of grid cells.
pub const MAX_CELLS: u32 = MAX_SIDE * MAX_SIDE;

/// Longest accepted theme label, in characters.
pub const MAX_THEME_LABEL: usize = 50;

/// Name given to layouts that do not provide one.
pub const DEFAULT_LAYOUT_NAME: &str = "compiled-layout";

/// Authored description of a maze.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Cell the players start on.
    pub start: Cell,
    /// Cell the players race to.
    pub goal: Cell,
    /// Walkable route.
    #[serde(flatten)]
    pub shape: LayoutShape,
    /// Optional human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional start and goal labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// The two accepted ways of describing the walkable route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutShape {
    /// Ordered cell keys; consecutive keys are joined by a corridor.
    Path(Vec<String>),
    /// Explicit corridor segments.
    Edges(Vec<EdgeSpec>),
}

/// Corridor segment between two cell keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Key of one endpoint.
    pub from: String,
    /// Key of the other endpoint.
    pub to: String,
}

/// Reasons a layout can be rejected.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The layout file could not be read.
    #[error("failed to read layout {}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid layout JSON.
    #[error("layout is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Width or height is zero.
    #[error("layout dimensions {width}x{height} must both be positive")]
    EmptyDimensions {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// The grid exceeds the supported size.
    #[error("layout dimensions {width}x{height} exceed the {max}x{max} limit", max = MAX_SIDE)]
    TooLarge {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// A cell key does not look like `<row>,<col>`.
    #[error("{field} contains a malformed cell key")]
    MalformedKey {
        /// Field holding the key.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: CellKeyError,
    },
    /// A referenced cell lies outside the grid.
    #[error("{field} references {cell}, outside the {width}x{height} grid")]
    OutOfBounds {
        /// Field holding the cell.
        field: &'static str,
        /// Offending cell.
        cell: Cell,
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// The route lists no cells or no edges.
    #[error("layout route is empty")]
    EmptyRoute,
    /// A theme label is empty or too long.
    #[error(
        "theme label for {role} must be 1..={max} characters, got {length}",
        max = MAX_THEME_LABEL
    )]
    ThemeLabel {
        /// Either `"start"` or `"goal"`.
        role: &'static str,
        /// Label length in characters.
        length: usize,
    },
    /// The compiled graph violates a maze invariant.
    #[error(transparent)]
    Maze(#[from] MazeError),
}

/// Deserializes a layout document without validating it.
pub fn parse_layout(json: &str) -> Result<Layout, LayoutError> {
    Ok(serde_json::from_str(json)?)
}

/// Checks the layout against the schema: dimensions, keys and labels.
pub fn validate_layout(layout: &Layout) -> Result<(), LayoutError> {
    let Layout {
        width,
        height,
        start,
        goal,
        ref shape,
        ref theme,
        ..
    } = *layout;

    if width == 0 || height == 0 {
        return Err(LayoutError::EmptyDimensions { width, height });
    }
    if width > MAX_SIDE || height > MAX_SIDE || width * height > MAX_CELLS {
        return Err(LayoutError::TooLarge { width, height });
    }

    check_bounds(layout, "start", start)?;
    check_bounds(layout, "goal", goal)?;

    match shape {
        LayoutShape::Path(keys) => {
            if keys.is_empty() {
                return Err(LayoutError::EmptyRoute);
            }
            for key in keys {
                let _ = resolve(layout, "path", key)?;
            }
        }
        LayoutShape::Edges(edges) => {
            if edges.is_empty() {
                return Err(LayoutError::EmptyRoute);
            }
            for edge in edges {
                let _ = resolve(layout, "edges.from", &edge.from)?;
                let _ = resolve(layout, "edges.to", &edge.to)?;
            }
        }
    }

    if let Some(theme) = theme {
        for (role, label) in [("start", &theme.start), ("goal", &theme.goal)] {
            if let Some(label) = label {
                let length = label.chars().count();
                if !(1..=MAX_THEME_LABEL).contains(&length) {
                    return Err(LayoutError::ThemeLabel { role, length });
                }
            }
        }
    }

    Ok(())
}

/// Validates a layout and compiles it into a shareable maze.
///
/// Path lists join consecutive keys and then join the last key to the goal
/// when the route does not already end there. Every corridor is walkable in
/// both directions.
pub fn compile_layout(layout: &Layout) -> Result<Arc<Maze>, LayoutError> {
    let name = layout.name.as_deref().unwrap_or(DEFAULT_LAYOUT_NAME);
    match build(layout) {
        Ok(maze) => {
            tracing::debug!(
                layout = name,
                width = maze.width(),
                height = maze.height(),
                cells = maze.path_cells().count(),
                "layout compiled"
            );
            Ok(Arc::new(maze))
        }
        Err(error) => {
            tracing::warn!(layout = name, %error, "layout rejected");
            Err(error)
        }
    }
}

/// Reads, validates and compiles a layout file.
pub fn load_layout(path: impl AsRef<Path>) -> Result<Arc<Maze>, LayoutError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let layout = parse_layout(&json)?;
    compile_layout(&layout)
}

fn build(layout: &Layout) -> Result<Maze, LayoutError> {
    validate_layout(layout)?;

    let mut builder = MazeBuilder::new(layout.width, layout.height, layout.start, layout.goal)
        .with_name(layout.name.as_deref().unwrap_or(DEFAULT_LAYOUT_NAME));
    if let Some(theme) = &layout.theme {
        builder = builder.with_theme(theme.clone());
    }

    match &layout.shape {
        LayoutShape::Path(keys) => {
            let cells = keys
                .iter()
                .map(|key| resolve(layout, "path", key))
                .collect::<Result<Vec<_>, _>>()?;
            for cell in &cells {
                builder.insert_cell(*cell);
            }
            for pair in cells.windows(2) {
                builder.connect(pair[0], pair[1]);
            }
            if let Some(&last) = cells.last() {
                if last != layout.goal {
                    builder.connect(last, layout.goal);
                }
            }
        }
        LayoutShape::Edges(edges) => {
            for edge in edges {
                let from = resolve(layout, "edges.from", &edge.from)?;
                let to = resolve(layout, "edges.to", &edge.to)?;
                builder.connect(from, to);
            }
        }
    }

    Ok(builder.build()?)
}

fn resolve(layout: &Layout, field: &'static str, key: &str) -> Result<Cell, LayoutError> {
    let cell = key
        .parse::<Cell>()
        .map_err(|source| LayoutError::MalformedKey { field, source })?;
    check_bounds(layout, field, cell)?;
    Ok(cell)
}

fn check_bounds(layout: &Layout, field: &'static str, cell: Cell) -> Result<(), LayoutError> {
    let inside = u32::try_from(cell.row()).is_ok_and(|row| row < layout.height)
        && u32::try_from(cell.column()).is_ok_and(|column| column < layout.width);
    if inside {
        Ok(())
    } else {
        Err(LayoutError::OutOfBounds {
            field,
            cell,
            width: layout.width,
            height: layout.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_runner_core::CellKind;

    fn path_layout(keys: &[&str]) -> Layout {
        Layout {
            width: 3,
            height: 3,
            start: Cell::new(0, 0),
            goal: Cell::new(0, 2),
            shape: LayoutShape::Path(keys.iter().map(|key| (*key).to_owned()).collect()),
            name: None,
            theme: None,
        }
    }

    #[test]
    fn parses_path_documents() {
        let layout = parse_layout(
            r#"{"width":3,"height":3,"start":{"r":0,"c":0},"goal":{"r":0,"c":2},
                "path":["0,0","0,1","0,2"],"name":"tiny"}"#,
        )
        .expect("layout parses");
        assert_eq!(layout.name.as_deref(), Some("tiny"));
        assert_eq!(
            layout.shape,
            LayoutShape::Path(vec!["0,0".into(), "0,1".into(), "0,2".into()])
        );
    }

    #[test]
    fn parses_edge_documents() {
        let layout = parse_layout(
            r#"{"width":2,"height":1,"start":{"r":0,"c":0},"goal":{"r":0,"c":1},
                "edges":[{"from":"0,0","to":"0,1"}]}"#,
        )
        .expect("layout parses");
        assert_eq!(
            layout.shape,
            LayoutShape::Edges(vec![EdgeSpec {
                from: "0,0".into(),
                to: "0,1".into(),
            }])
        );
    }

    #[test]
    fn rejects_documents_without_a_route() {
        let text = r#"{"width":2,"height":1,"start":{"r":0,"c":0},"goal":{"r":0,"c":1}}"#;
        let error = parse_layout(text).unwrap_err();
        assert!(matches!(error, LayoutError::Json(_)));
    }

    #[test]
    fn path_route_is_linked_to_the_goal() {
        let maze = compile_layout(&path_layout(&["0,0", "0,1"])).expect("layout compiles");
        assert!(maze.is_connected(Cell::new(0, 1), Cell::new(0, 2)));
        assert!(maze.is_connected(Cell::new(0, 2), Cell::new(0, 1)));
        assert_eq!(maze.name(), Some(DEFAULT_LAYOUT_NAME));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let error = validate_layout(&path_layout(&["0,0", "0;1"])).unwrap_err();
        assert!(matches!(error, LayoutError::MalformedKey { field: "path", .. }));

        let error = validate_layout(&path_layout(&["0,0", "-1,0"])).unwrap_err();
        assert!(matches!(error, LayoutError::MalformedKey { .. }));
    }

    #[test]
    fn out_of_bounds_keys_are_rejected() {
        let error = validate_layout(&path_layout(&["0,0", "0,3"])).unwrap_err();
        assert!(matches!(
            error,
            LayoutError::OutOfBounds {
                field: "path",
                cell,
                ..
            } if cell == Cell::new(0, 3)
        ));
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let mut layout = path_layout(&["0,0"]);
        layout.width = MAX_SIDE + 1;
        assert!(matches!(
            validate_layout(&layout),
            Err(LayoutError::TooLarge { .. })
        ));

        layout.width = MAX_SIDE;
        layout.height = MAX_SIDE;
        assert!(validate_layout(&layout).is_ok());
    }

    #[test]
    fn theme_labels_are_length_checked() {
        let mut layout = path_layout(&["0,0", "0,1", "0,2"]);
        layout.theme = Some(Theme {
            start: Some(String::new()),
            goal: None,
        });
        assert!(matches!(
            validate_layout(&layout),
            Err(LayoutError::ThemeLabel {
                role: "start",
                length: 0
            })
        ));

        layout.theme = Some(Theme {
            start: Some("Home".into()),
            goal: Some("x".repeat(MAX_THEME_LABEL + 1)),
        });
        assert!(matches!(
            validate_layout(&layout),
            Err(LayoutError::ThemeLabel { role: "goal", .. })
        ));
    }

    #[test]
    fn empty_routes_are_rejected() {
        assert!(matches!(
            validate_layout(&path_layout(&[])),
            Err(LayoutError::EmptyRoute)
        ));
    }

    #[test]
    fn non_adjacent_route_cells_surface_maze_errors() {
        let error = compile_layout(&path_layout(&["0,0", "1,1", "0,2"])).unwrap_err();
        assert!(matches!(
            error,
            LayoutError::Maze(MazeError::NonAdjacentEdge { .. })
        ));
    }

    #[test]
    fn cells_off_the_route_are_walls() {
        let maze = compile_layout(&path_layout(&["0,0", "0,1", "0,2"])).expect("layout compiles");
        assert_eq!(maze.cell_kind(Cell::new(1, 1)), CellKind::Wall);
        assert_eq!(maze.cell_kind(Cell::new(0, 1)), CellKind::Path);
    }
}
