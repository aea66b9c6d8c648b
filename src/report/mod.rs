//! Report generation.

pub mod generator;

pub use generator::{
    build_snapshot_report, frame_line, generate_json_report, generate_markdown_report,
    generate_timeline_markdown,
};
