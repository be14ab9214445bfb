use frontier_graph::cli::{main_for, Tool};
use std::process::ExitCode;

fn main() -> ExitCode {
    main_for(Tool::ConnectedComponents)
}
