//! Renders a grid document as text.

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use datagrid_lib::column::Column;
use datagrid_lib::column::ColumnKind;
use datagrid_lib::column::HeaderCell;
use datagrid_lib::column::SortOrder;
use datagrid_lib::layout::Layout;
use datagrid_lib::tree::FlatRow;
use datagrid_lib::Grid;
use datagrid_lib::GridDocument;
use datagrid_lib::GridError;
use log::info;
use serde_json::Value;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;

#[derive(Parser)]
#[command(name = "datagrid")]
#[command(about = "Resolve and print a data grid described by a JSON document")]
struct Cli {
    /// Grid document: `{ "config": .., "columns": [..], "data": [..] }`
    file: PathBuf,

    /// Sort by a column, as `prop:asc` or `prop:desc`
    #[arg(long)]
    sort: Option<String>,

    /// Filter a column, as `prop=value` (repeatable)
    #[arg(long)]
    filter: Vec<String>,

    /// Viewport width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Expand every tree row
    #[arg(long)]
    expand_all: bool,

    /// Write a debug log to this file
    #[arg(long)]
    log: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid grid document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("invalid --{flag} value `{value}`")]
    Argument { flag: &'static str, value: String },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("failed to initialize logging: {0}")]
    Log(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(path) = &cli.log {
        let log_file = File::create(path).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
            .map_err(|e| CliError::Log(e.to_string()))?;
    }

    let text = fs::read_to_string(&cli.file).map_err(|source| CliError::Io {
        path: cli.file.clone(),
        source,
    })?;
    let mut document = GridDocument::from_json(&text)?;
    if cli.expand_all {
        document.config.default_expand_all = true;
    }
    info!("Loaded {} ({} rows)", cli.file.display(), document.data.len());

    let grid = Grid::from_document(document)?;
    grid.set_viewport_width(cli.width);

    for (prop, values) in parse_filters(&cli.filter)? {
        grid.filter_change(&prop, values)?;
    }
    if let Some(sort) = &cli.sort {
        let (prop, order) = parse_sort(sort)?;
        grid.sort(&prop, Some(order))?;
    }

    let layout = grid.layout();
    let columns = grid.columns();
    print_header(&grid.header_rows(), &layout);
    print_layout(&layout);
    print_rows(&grid, &columns, &grid.visible_rows());
    Ok(())
}

// =============================================================================
// Arguments
// =============================================================================

fn parse_sort(arg: &str) -> Result<(String, SortOrder), CliError> {
    let invalid = || CliError::Argument {
        flag: "sort",
        value: arg.to_string(),
    };
    let (prop, order) = arg.rsplit_once(':').unwrap_or((arg, "asc"));
    let order = SortOrder::parse(order).ok_or_else(invalid)?;
    if prop.is_empty() {
        return Err(invalid());
    }
    Ok((prop.to_string(), order))
}

/// Groups `prop=value` pairs by prop. Values are JSON when they parse as
/// JSON, plain strings otherwise.
fn parse_filters(args: &[String]) -> Result<BTreeMap<String, Vec<Value>>, CliError> {
    let mut filters: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for arg in args {
        let Some((prop, value)) = arg.split_once('=') else {
            return Err(CliError::Argument {
                flag: "filter",
                value: arg.clone(),
            });
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        filters.entry(prop.to_string()).or_default().push(value);
    }
    Ok(filters)
}

// =============================================================================
// Output
// =============================================================================

fn print_header(rows: &[Vec<HeaderCell>], layout: &Layout) {
    println!("Header:");
    for (level, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .zip(layout.header.get(level).into_iter().flatten())
            .map(|(cell, cell_layout)| {
                let mut text = format!("{} [{}px", header_label(cell), cell_layout.width);
                if cell.col_span > 1 {
                    text.push_str(&format!(", colspan {}", cell.col_span));
                }
                if cell.row_span > 1 {
                    text.push_str(&format!(", rowspan {}", cell.row_span));
                }
                text.push(']');
                text
            })
            .collect();
        println!("  {}", cells.join(" | "));
    }
}

fn header_label(cell: &HeaderCell) -> &str {
    match cell.kind {
        ColumnKind::Selection => "[x]",
        ColumnKind::Index => "#",
        ColumnKind::Expand => "",
        ColumnKind::Default => cell.label.as_str(),
    }
}

fn print_layout(layout: &Layout) {
    println!("Layout:");
    println!(
        "  viewport {}px, body {}px, scroll x {}, scroll y {}",
        layout.viewport_width, layout.body_width, layout.scroll_x, layout.scroll_y
    );
    println!(
        "  fixed left {}px, fixed right {}px",
        layout.left_fixed_width, layout.right_fixed_width
    );
    for column in &layout.columns {
        match column.sticky {
            Some(sticky) => println!(
                "  {}: {}px, sticky {:?} at {}px",
                column.id, column.real_width, sticky.side, sticky.offset
            ),
            None => println!("  {}: {}px", column.id, column.real_width),
        }
    }
}

fn print_rows(grid: &Grid, columns: &[Column], rows: &[FlatRow]) {
    println!("Rows:");
    for (index, flat) in rows.iter().enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| cell_text(grid, column, flat, index))
            .collect();
        println!("  {}{}", " ".repeat(flat.level * 2), cells.join(" | "));
    }
}

fn cell_text(grid: &Grid, column: &Column, flat: &FlatRow, index: usize) -> String {
    match column.kind {
        ColumnKind::Selection => {
            let state = grid.check_state(&flat.row);
            let mark = if state.checked {
                "x"
            } else if state.indeterminate {
                "-"
            } else {
                " "
            };
            format!("[{}]", mark)
        }
        ColumnKind::Index => (index + 1).to_string(),
        ColumnKind::Expand => (if flat.expanded { "v" } else { ">" }).to_string(),
        ColumnKind::Default => {
            let marker = match (flat.has_children, flat.expanded) {
                (true, true) => "v ",
                (true, false) => "> ",
                _ => "",
            };
            let value = match column.cell(&flat.row) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            format!("{}{}", marker, value)
        }
    }
}
