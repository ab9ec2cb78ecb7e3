// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sql_flow_analyzer::error::{config_error, file_read_error, input_parse_error, output_error};

#[test]
fn test_file_read_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error = file_read_error("/path/to/input.json", io_error);
    assert!(!error.to_string().is_empty());
}

#[test]
fn test_input_parse_error() {
    let error = input_parse_error("input.yaml", "missing field `path`");
    assert!(!error.to_string().is_empty());
}

#[test]
fn test_config_error() {
    let error = config_error("Invalid configuration value");
    assert!(!error.to_string().is_empty());
}

#[test]
fn test_output_error() {
    let error = output_error("cannot serialize");
    assert!(!error.to_string().is_empty());
}
